// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # SQL Coordination Strategy Repository
//!
//! One strategy per workflow, enforced by `uq_coordination_strategies_workflow`.
//! `upsert` replaces the existing row in place, keeping its id.

use async_trait::async_trait;
use sqlx::any::AnyRow;
use sqlx::Row;

use super::{get_json, get_timestamp, get_uuid};
use crate::domain::agent::AgentId;
use crate::domain::coordination::CoordinationStrategy;
use crate::domain::migration::ColumnType;
use crate::domain::repository::{CoordinationStrategyRepository, RepositoryError};
use crate::domain::workflow::WorkflowId;
use crate::infrastructure::db::{format_timestamp, Database};

pub struct SqlCoordinationStrategyRepository {
    db: Database,
}

impl SqlCoordinationStrategyRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

fn row_to_strategy(row: &AnyRow) -> Result<CoordinationStrategy, RepositoryError> {
    let order: Vec<uuid::Uuid> = serde_json::from_value(get_json(row, "agent_order")?)?;
    Ok(CoordinationStrategy {
        id: get_uuid(row, "id")?,
        workflow_id: WorkflowId(get_uuid(row, "workflow_id")?),
        agent_order: order.into_iter().map(AgentId).collect(),
        rationale: row.try_get("rationale")?,
        confidence: row.try_get("confidence")?,
        updated_at: get_timestamp(row, "updated_at")?,
    })
}

#[async_trait]
impl CoordinationStrategyRepository for SqlCoordinationStrategyRepository {
    async fn upsert(&self, strategy: &CoordinationStrategy) -> Result<(), RepositoryError> {
        let d = self.db.dialect();
        let order: Vec<uuid::Uuid> = strategy.agent_order.iter().map(|a| a.0).collect();

        let sql = format!(
            r#"
            INSERT INTO coordination_strategies (id, workflow_id, agent_order, rationale, confidence, updated_at)
            VALUES ($1, $2, {}, $4, $5, {})
            ON CONFLICT (workflow_id) DO UPDATE SET
                agent_order = EXCLUDED.agent_order,
                rationale = EXCLUDED.rationale,
                confidence = EXCLUDED.confidence,
                updated_at = EXCLUDED.updated_at
            "#,
            d.bind(3, &ColumnType::Json),
            d.bind(6, &ColumnType::Timestamp),
        );

        sqlx::query(&sql)
            .bind(strategy.id.to_string())
            .bind(strategy.workflow_id.to_string())
            .bind(serde_json::to_string(&order)?)
            .bind(strategy.rationale.clone())
            .bind(strategy.confidence)
            .bind(format_timestamp(&strategy.updated_at))
            .execute(self.db.pool())
            .await?;

        Ok(())
    }

    async fn find_by_workflow(&self, workflow_id: WorkflowId) -> Result<Option<CoordinationStrategy>, RepositoryError> {
        let d = self.db.dialect();
        let sql = format!(
            "SELECT id, workflow_id, {}, rationale, confidence, {} \
             FROM coordination_strategies WHERE workflow_id = $1",
            d.read_text("agent_order"),
            d.read_text("updated_at")
        );

        let row = sqlx::query(&sql)
            .bind(workflow_id.to_string())
            .fetch_optional(self.db.pool())
            .await?;

        row.as_ref().map(row_to_strategy).transpose()
    }
}
