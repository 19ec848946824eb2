// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # SQL Workflow Repository
//!
//! `WorkflowRepository` over the `workflows` table. Names are unique per
//! tenant (`uq_workflows_tenant_name`).

use async_trait::async_trait;
use sqlx::any::AnyRow;
use sqlx::Row;

use super::{get_json, get_timestamp, get_uuid};
use crate::domain::migration::ColumnType;
use crate::domain::repository::{RepositoryError, WorkflowRepository};
use crate::domain::workflow::{Workflow, WorkflowId};
use crate::infrastructure::db::{format_timestamp, Database};

pub struct SqlWorkflowRepository {
    db: Database,
}

impl SqlWorkflowRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn select_sql(&self, filter: &str) -> String {
        let d = self.db.dialect();
        format!(
            "SELECT id, tenant_id, name, {}, {}, {} FROM workflows WHERE {}",
            d.read_text("definition"),
            d.read_text("created_at"),
            d.read_text("updated_at"),
            filter
        )
    }
}

fn row_to_workflow(row: &AnyRow) -> Result<Workflow, RepositoryError> {
    Ok(Workflow {
        id: WorkflowId(get_uuid(row, "id")?),
        tenant_id: row.try_get("tenant_id")?,
        name: row.try_get("name")?,
        definition: get_json(row, "definition")?,
        created_at: get_timestamp(row, "created_at")?,
        updated_at: get_timestamp(row, "updated_at")?,
    })
}

#[async_trait]
impl WorkflowRepository for SqlWorkflowRepository {
    async fn save(&self, workflow: &Workflow) -> Result<(), RepositoryError> {
        let d = self.db.dialect();
        let sql = format!(
            r#"
            INSERT INTO workflows (id, tenant_id, name, definition, created_at, updated_at)
            VALUES ($1, $2, $3, {}, {}, {})
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                definition = EXCLUDED.definition,
                updated_at = EXCLUDED.updated_at
            "#,
            d.bind(4, &ColumnType::Json),
            d.bind(5, &ColumnType::Timestamp),
            d.bind(6, &ColumnType::Timestamp),
        );

        sqlx::query(&sql)
            .bind(workflow.id.to_string())
            .bind(workflow.tenant_id.as_str())
            .bind(workflow.name.as_str())
            .bind(serde_json::to_string(&workflow.definition)?)
            .bind(format_timestamp(&workflow.created_at))
            .bind(format_timestamp(&workflow.updated_at))
            .execute(self.db.pool())
            .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: WorkflowId) -> Result<Option<Workflow>, RepositoryError> {
        let row = sqlx::query(&self.select_sql("id = $1"))
            .bind(id.to_string())
            .fetch_optional(self.db.pool())
            .await?;

        row.as_ref().map(row_to_workflow).transpose()
    }

    async fn find_by_name(&self, tenant_id: &str, name: &str) -> Result<Option<Workflow>, RepositoryError> {
        let row = sqlx::query(&self.select_sql("tenant_id = $1 AND name = $2"))
            .bind(tenant_id)
            .bind(name)
            .fetch_optional(self.db.pool())
            .await?;

        row.as_ref().map(row_to_workflow).transpose()
    }
}
