// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # SQL Agent Repository
//!
//! `AgentRepository` over the `agents` table created by `0001_core_entities`.
//! Capabilities are stored as a JSON array.

use async_trait::async_trait;
use sqlx::any::AnyRow;
use sqlx::Row;

use super::{get_json, get_timestamp, get_uuid};
use crate::domain::agent::{Agent, AgentId, AgentStatus};
use crate::domain::migration::ColumnType;
use crate::domain::repository::{AgentRepository, RepositoryError};
use crate::infrastructure::db::{format_timestamp, Database};

pub struct SqlAgentRepository {
    db: Database,
}

impl SqlAgentRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn select_sql(&self, filter: &str) -> String {
        let d = self.db.dialect();
        format!(
            "SELECT id, tenant_id, name, role, {}, status, {}, {} FROM agents WHERE {}",
            d.read_text("capabilities"),
            d.read_text("created_at"),
            d.read_text("updated_at"),
            filter
        )
    }
}

fn row_to_agent(row: &AnyRow) -> Result<Agent, RepositoryError> {
    let capabilities: Vec<String> = serde_json::from_value(get_json(row, "capabilities")?)?;
    let status: String = row.try_get("status")?;

    Ok(Agent {
        id: AgentId(get_uuid(row, "id")?),
        tenant_id: row.try_get("tenant_id")?,
        name: row.try_get("name")?,
        role: row.try_get("role")?,
        capabilities,
        // unknown values from newer releases read as active
        status: AgentStatus::parse(&status).unwrap_or(AgentStatus::Active),
        created_at: get_timestamp(row, "created_at")?,
        updated_at: get_timestamp(row, "updated_at")?,
    })
}

#[async_trait]
impl AgentRepository for SqlAgentRepository {
    async fn save(&self, agent: &Agent) -> Result<(), RepositoryError> {
        let d = self.db.dialect();
        let capabilities = serde_json::to_string(&agent.capabilities)?;

        let sql = format!(
            r#"
            INSERT INTO agents (id, tenant_id, name, role, capabilities, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, {}, $6, {}, {})
            ON CONFLICT (id) DO UPDATE SET
                tenant_id = EXCLUDED.tenant_id,
                name = EXCLUDED.name,
                role = EXCLUDED.role,
                capabilities = EXCLUDED.capabilities,
                status = EXCLUDED.status,
                updated_at = EXCLUDED.updated_at
            "#,
            d.bind(5, &ColumnType::Json),
            d.bind(7, &ColumnType::Timestamp),
            d.bind(8, &ColumnType::Timestamp),
        );

        sqlx::query(&sql)
            .bind(agent.id.to_string())
            .bind(agent.tenant_id.as_str())
            .bind(agent.name.as_str())
            .bind(agent.role.clone())
            .bind(capabilities)
            .bind(agent.status.as_str())
            .bind(format_timestamp(&agent.created_at))
            .bind(format_timestamp(&agent.updated_at))
            .execute(self.db.pool())
            .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: AgentId) -> Result<Option<Agent>, RepositoryError> {
        let row = sqlx::query(&self.select_sql("id = $1"))
            .bind(id.to_string())
            .fetch_optional(self.db.pool())
            .await?;

        row.as_ref().map(row_to_agent).transpose()
    }

    async fn list_by_tenant(&self, tenant_id: &str) -> Result<Vec<Agent>, RepositoryError> {
        let rows = sqlx::query(&self.select_sql("tenant_id = $1 ORDER BY name"))
            .bind(tenant_id)
            .fetch_all(self.db.pool())
            .await?;

        rows.iter().map(row_to_agent).collect()
    }

    async fn delete(&self, id: AgentId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM agents WHERE id = $1")
            .bind(id.to_string())
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("agent {}", id)));
        }
        Ok(())
    }
}
