// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # SQL API Audit Log Repository
//!
//! Rows written here are native to the current schema, so they are inserted
//! with `auth_method_migrated = TRUE` and are never touched by the
//! `0006_audit_auth_method` backfill.

use async_trait::async_trait;
use sqlx::any::AnyRow;
use sqlx::Row;

use super::{get_opt_json, get_timestamp, get_uuid};
use crate::domain::audit::ApiAuditLogEntry;
use crate::domain::migration::ColumnType;
use crate::domain::repository::{ApiAuditLogRepository, RepositoryError};
use crate::infrastructure::db::{format_timestamp, Database};

pub struct SqlApiAuditLogRepository {
    db: Database,
}

impl SqlApiAuditLogRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

fn row_to_entry(row: &AnyRow) -> Result<ApiAuditLogEntry, RepositoryError> {
    Ok(ApiAuditLogEntry {
        id: get_uuid(row, "id")?,
        tenant_id: row.try_get("tenant_id")?,
        actor_type: row.try_get("actor_type")?,
        actor_id: row.try_get("actor_id")?,
        auth_method: row.try_get("auth_method")?,
        method: row.try_get("method")?,
        path: row.try_get("path")?,
        status_code: row.try_get("status_code")?,
        metadata: get_opt_json(row, "metadata")?,
        created_at: get_timestamp(row, "created_at")?,
    })
}

#[async_trait]
impl ApiAuditLogRepository for SqlApiAuditLogRepository {
    async fn append(&self, entry: &ApiAuditLogEntry) -> Result<(), RepositoryError> {
        let d = self.db.dialect();
        let sql = format!(
            "INSERT INTO api_audit_log \
             (id, tenant_id, actor_type, actor_id, auth_method, auth_method_migrated, method, path, status_code, metadata, created_at) \
             VALUES ($1, $2, $3, $4, $5, TRUE, $6, $7, $8, {}, {})",
            d.bind(9, &ColumnType::Json),
            d.bind(10, &ColumnType::Timestamp)
        );

        let metadata = entry.metadata.as_ref().map(serde_json::to_string).transpose()?;

        sqlx::query(&sql)
            .bind(entry.id.to_string())
            .bind(entry.tenant_id.clone())
            .bind(entry.actor_type.as_str())
            .bind(entry.actor_id.clone())
            .bind(entry.auth_method.as_str())
            .bind(entry.method.as_str())
            .bind(entry.path.as_str())
            .bind(entry.status_code)
            .bind(metadata)
            .bind(format_timestamp(&entry.created_at))
            .execute(self.db.pool())
            .await?;

        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ApiAuditLogEntry>, RepositoryError> {
        let d = self.db.dialect();
        let sql = format!(
            "SELECT id, tenant_id, actor_type, actor_id, auth_method, method, path, status_code, {}, {} \
             FROM api_audit_log ORDER BY created_at DESC LIMIT $1",
            d.read_text("metadata"),
            d.read_text("created_at")
        );

        let rows = sqlx::query(&sql)
            .bind(limit as i64)
            .fetch_all(self.db.pool())
            .await?;

        rows.iter().map(row_to_entry).collect()
    }
}
