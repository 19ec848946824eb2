// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # SQL Agent Performance Repository
//!
//! Append-only samples in `agent_performance`. Rows are removed with their
//! agent (`ON DELETE CASCADE`); a deleted workflow only clears `workflow_id`.

use async_trait::async_trait;
use sqlx::any::AnyRow;
use sqlx::Row;

use super::{get_opt_uuid, get_timestamp, get_uuid};
use crate::domain::agent::AgentId;
use crate::domain::migration::ColumnType;
use crate::domain::performance::AgentPerformance;
use crate::domain::repository::{PerformanceRepository, RepositoryError};
use crate::domain::workflow::WorkflowId;
use crate::infrastructure::db::{format_timestamp, Database};

pub struct SqlPerformanceRepository {
    db: Database,
}

impl SqlPerformanceRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

fn row_to_sample(row: &AnyRow) -> Result<AgentPerformance, RepositoryError> {
    Ok(AgentPerformance {
        id: get_uuid(row, "id")?,
        agent_id: AgentId(get_uuid(row, "agent_id")?),
        workflow_id: get_opt_uuid(row, "workflow_id")?.map(WorkflowId),
        executions: row.try_get("executions")?,
        successes: row.try_get("successes")?,
        avg_latency_ms: row.try_get("avg_latency_ms")?,
        reputation_score: row.try_get("reputation_score")?,
        recorded_at: get_timestamp(row, "recorded_at")?,
    })
}

#[async_trait]
impl PerformanceRepository for SqlPerformanceRepository {
    async fn record(&self, sample: &AgentPerformance) -> Result<(), RepositoryError> {
        let sql = format!(
            "INSERT INTO agent_performance \
             (id, agent_id, workflow_id, executions, successes, avg_latency_ms, reputation_score, recorded_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, {})",
            self.db.dialect().bind(8, &ColumnType::Timestamp)
        );

        sqlx::query(&sql)
            .bind(sample.id.to_string())
            .bind(sample.agent_id.to_string())
            .bind(sample.workflow_id.map(|w| w.to_string()))
            .bind(sample.executions)
            .bind(sample.successes)
            .bind(sample.avg_latency_ms)
            .bind(sample.reputation_score)
            .bind(format_timestamp(&sample.recorded_at))
            .execute(self.db.pool())
            .await?;

        Ok(())
    }

    async fn recent_for_agent(&self, agent_id: AgentId, limit: usize) -> Result<Vec<AgentPerformance>, RepositoryError> {
        let sql = format!(
            "SELECT id, agent_id, workflow_id, executions, successes, avg_latency_ms, reputation_score, {} \
             FROM agent_performance WHERE agent_id = $1 ORDER BY recorded_at DESC LIMIT $2",
            self.db.dialect().read_text("recorded_at")
        );

        let rows = sqlx::query(&sql)
            .bind(agent_id.to_string())
            .bind(limit as i64)
            .fetch_all(self.db.pool())
            .await?;

        rows.iter().map(row_to_sample).collect()
    }
}
