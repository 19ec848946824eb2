// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # SQL Schema Version Ledger
//!
//! The `schema_version` table: one column, exactly one row. The free
//! functions operate on any connection (usually the migration run's
//! transaction); [`SqlLedger`] is the pool-backed [`VersionLedger`] used by
//! stamp and repair.

use async_trait::async_trait;
use sqlx::AnyConnection;
use sqlx::Row;
use tracing::info;

use crate::domain::ledger::{LedgerError, VersionLedger};
use crate::domain::migration::{ColumnDef, ColumnType, TableDef, VersionId};
use crate::infrastructure::db::Database;
use crate::infrastructure::dialect::Dialect;
use crate::infrastructure::history::{self, HistoryAction};
use crate::infrastructure::introspect::table_exists;

pub const LEDGER_TABLE: &str = "schema_version";

fn ledger_table() -> TableDef {
    TableDef::new(LEDGER_TABLE, vec![ColumnDef::new("version_num", ColumnType::Varchar(128))])
}

/// Creates the ledger table and its single `NULL` row when missing.
pub async fn ensure_ledger(conn: &mut AnyConnection, dialect: Dialect) -> Result<(), LedgerError> {
    sqlx::query(&dialect.create_table(&ledger_table()))
        .execute(&mut *conn)
        .await?;

    let rows = count_rows(conn).await?;
    match rows {
        0 => {
            sqlx::query("INSERT INTO schema_version (version_num) VALUES (NULL)")
                .execute(&mut *conn)
                .await?;
            Ok(())
        }
        1 => Ok(()),
        n => Err(LedgerError::RowCount(n)),
    }
}

async fn count_rows(conn: &mut AnyConnection) -> Result<i64, LedgerError> {
    let row = sqlx::query("SELECT COUNT(*) AS n FROM schema_version")
        .fetch_one(&mut *conn)
        .await?;
    Ok(row.try_get::<i64, _>("n")?)
}

pub async fn read_version(conn: &mut AnyConnection) -> Result<Option<VersionId>, LedgerError> {
    let rows = sqlx::query("SELECT version_num FROM schema_version")
        .fetch_all(&mut *conn)
        .await?;
    if rows.len() != 1 {
        return Err(LedgerError::RowCount(rows.len() as i64));
    }
    let version: Option<String> = rows[0].try_get("version_num")?;
    Ok(version.map(VersionId::new))
}

/// Like [`read_version`], but a database that never ran a migration reads as `None`.
pub async fn read_version_if_present(
    conn: &mut AnyConnection,
    dialect: Dialect,
) -> Result<Option<VersionId>, LedgerError> {
    if !table_exists(conn, dialect, LEDGER_TABLE).await? {
        return Ok(None);
    }
    read_version(conn).await
}

pub async fn write_version(conn: &mut AnyConnection, version: Option<&VersionId>) -> Result<(), LedgerError> {
    let result = sqlx::query("UPDATE schema_version SET version_num = $1")
        .bind(version.map(|v| v.as_str().to_string()))
        .execute(&mut *conn)
        .await?;
    match result.rows_affected() {
        1 => Ok(()),
        n => Err(LedgerError::RowCount(n as i64)),
    }
}

/// Pool-backed ledger. Each write runs in its own transaction together with
/// a history row tagged with `action`.
#[derive(Clone)]
pub struct SqlLedger {
    db: Database,
    action: HistoryAction,
}

impl SqlLedger {
    pub fn new(db: Database, action: HistoryAction) -> Self {
        Self { db, action }
    }
}

#[async_trait]
impl VersionLedger for SqlLedger {
    async fn current_version(&self) -> Result<Option<VersionId>, LedgerError> {
        let mut conn = self.db.pool().acquire().await?;
        read_version_if_present(&mut conn, self.db.dialect()).await
    }

    async fn set_current_version(&self, version: Option<&VersionId>) -> Result<(), LedgerError> {
        let dialect = self.db.dialect();
        let mut tx = self.db.pool().begin().await?;

        ensure_ledger(&mut tx, dialect).await?;
        history::ensure_history(&mut tx, dialect).await?;
        write_version(&mut tx, version).await?;
        history::append(&mut tx, dialect, version, None, self.action).await?;

        tx.commit().await?;
        info!(
            version = version.map(|v| v.as_str()).unwrap_or("<base>"),
            action = self.action.as_str(),
            "Schema version ledger updated"
        );
        Ok(())
    }
}
