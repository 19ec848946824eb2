// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # SQL Audit Event Repository
//!
//! Storage behind the table-backed audit sink (`audit_events`).

use async_trait::async_trait;
use sqlx::any::AnyRow;
use sqlx::Row;

use super::{get_json, get_timestamp, get_uuid};
use crate::domain::audit::AuditEvent;
use crate::domain::migration::ColumnType;
use crate::domain::repository::{AuditEventRepository, RepositoryError};
use crate::infrastructure::db::{format_timestamp, Database};

pub struct SqlAuditEventRepository {
    db: Database,
}

impl SqlAuditEventRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

fn row_to_event(row: &AnyRow) -> Result<AuditEvent, RepositoryError> {
    Ok(AuditEvent {
        id: get_uuid(row, "id")?,
        event_type: row.try_get("event_type")?,
        payload: get_json(row, "payload")?,
        occurred_at: get_timestamp(row, "occurred_at")?,
    })
}

#[async_trait]
impl AuditEventRepository for SqlAuditEventRepository {
    async fn save(&self, event: &AuditEvent) -> Result<(), RepositoryError> {
        let d = self.db.dialect();
        let sql = format!(
            "INSERT INTO audit_events (id, event_type, payload, occurred_at) VALUES ($1, $2, {}, {})",
            d.bind(3, &ColumnType::Json),
            d.bind(4, &ColumnType::Timestamp)
        );

        sqlx::query(&sql)
            .bind(event.id.to_string())
            .bind(event.event_type.as_str())
            .bind(serde_json::to_string(&event.payload)?)
            .bind(format_timestamp(&event.occurred_at))
            .execute(self.db.pool())
            .await?;

        Ok(())
    }

    async fn find_by_type(&self, event_type: &str, limit: usize) -> Result<Vec<AuditEvent>, RepositoryError> {
        let d = self.db.dialect();
        let sql = format!(
            "SELECT id, event_type, {}, {} FROM audit_events \
             WHERE event_type = $1 ORDER BY occurred_at DESC LIMIT $2",
            d.read_text("payload"),
            d.read_text("occurred_at")
        );

        let rows = sqlx::query(&sql)
            .bind(event_type)
            .bind(limit as i64)
            .fetch_all(self.db.pool())
            .await?;

        rows.iter().map(row_to_event).collect()
    }
}
