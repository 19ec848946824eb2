// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Migration History Log
//!
//! Append-only `schema_migration_history` table. Every ledger change (unit
//! applied, unit reverted, stamp, repair) adds one row in the same
//! transaction as the change, carrying the unit checksum when one applies.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::AnyConnection;
use sqlx::Row;
use std::fmt;

use crate::domain::ledger::LedgerError;
use crate::domain::migration::{ColumnDef, ColumnType, TableDef, VersionId};
use crate::infrastructure::db::{format_timestamp, parse_timestamp};
use crate::infrastructure::dialect::Dialect;

pub const HISTORY_TABLE: &str = "schema_migration_history";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryAction {
    Upgrade,
    Downgrade,
    Stamp,
    Repair,
}

impl HistoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryAction::Upgrade => "upgrade",
            HistoryAction::Downgrade => "downgrade",
            HistoryAction::Stamp => "stamp",
            HistoryAction::Repair => "repair",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "upgrade" => Some(HistoryAction::Upgrade),
            "downgrade" => Some(HistoryAction::Downgrade),
            "stamp" => Some(HistoryAction::Stamp),
            "repair" => Some(HistoryAction::Repair),
            _ => None,
        }
    }
}

impl fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub sequence: i64,
    /// Unit applied or reverted; for stamp and repair, the ledger value written
    pub version: Option<VersionId>,
    pub checksum: Option<String>,
    pub action: HistoryAction,
    pub applied_at: DateTime<Utc>,
    pub applied_by: String,
}

fn history_table() -> TableDef {
    TableDef::new(
        HISTORY_TABLE,
        vec![
            ColumnDef::new("sequence", ColumnType::BigInt).primary_key(),
            ColumnDef::new("version_num", ColumnType::Varchar(128)),
            ColumnDef::new("checksum", ColumnType::Varchar(64)),
            ColumnDef::new("action", ColumnType::Varchar(16)).not_null(),
            ColumnDef::new("applied_at", ColumnType::Timestamp).not_null(),
            ColumnDef::new("applied_by", ColumnType::Varchar(255)).not_null(),
        ],
    )
}

pub async fn ensure_history(conn: &mut AnyConnection, dialect: Dialect) -> Result<(), LedgerError> {
    sqlx::query(&dialect.create_table(&history_table()))
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Identity recorded on history and lock rows: `host/pid`.
pub fn operator_identity() -> String {
    let host = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown-host".to_string());
    format!("{}/{}", host, std::process::id())
}

pub async fn append(
    conn: &mut AnyConnection,
    dialect: Dialect,
    version: Option<&VersionId>,
    checksum: Option<&str>,
    action: HistoryAction,
) -> Result<i64, LedgerError> {
    let row = sqlx::query("SELECT COALESCE(MAX(sequence), 0) AS n FROM schema_migration_history")
        .fetch_one(&mut *conn)
        .await?;
    let sequence = row.try_get::<i64, _>("n")? + 1;

    let sql = format!(
        "INSERT INTO schema_migration_history (sequence, version_num, checksum, action, applied_at, applied_by) \
         VALUES ($1, $2, $3, $4, {}, $6)",
        dialect.bind(5, &ColumnType::Timestamp)
    );
    sqlx::query(&sql)
        .bind(sequence)
        .bind(version.map(|v| v.as_str().to_string()))
        .bind(checksum.map(str::to_string))
        .bind(action.as_str())
        .bind(format_timestamp(&Utc::now()))
        .bind(operator_identity())
        .execute(&mut *conn)
        .await?;

    Ok(sequence)
}

/// Full log, oldest first. Empty when the table does not exist yet.
pub async fn list(conn: &mut AnyConnection, dialect: Dialect) -> Result<Vec<HistoryEntry>, LedgerError> {
    if !crate::infrastructure::introspect::table_exists(conn, dialect, HISTORY_TABLE).await? {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT sequence, version_num, checksum, action, {}, applied_by \
         FROM schema_migration_history ORDER BY sequence",
        dialect.read_text("applied_at")
    );
    let rows = sqlx::query(&sql).fetch_all(&mut *conn).await?;

    rows.iter()
        .map(|row| -> Result<HistoryEntry, LedgerError> {
            let action: String = row.try_get("action")?;
            let applied_at: String = row.try_get("applied_at")?;
            Ok(HistoryEntry {
                sequence: row.try_get("sequence")?,
                version: row.try_get::<Option<String>, _>("version_num")?.map(VersionId::new),
                checksum: row.try_get("checksum")?,
                action: HistoryAction::parse(&action)
                    .ok_or_else(|| LedgerError::Database(format!("Unknown history action '{}'", action)))?,
                applied_at: parse_timestamp(&applied_at)
                    .map_err(|e| LedgerError::Database(format!("Bad history timestamp '{}': {}", applied_at, e)))?,
                applied_by: row.try_get("applied_by")?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_round_trip() {
        for action in [
            HistoryAction::Upgrade,
            HistoryAction::Downgrade,
            HistoryAction::Stamp,
            HistoryAction::Repair,
        ] {
            assert_eq!(HistoryAction::parse(action.as_str()), Some(action));
        }
        assert_eq!(HistoryAction::parse("merge"), None);
    }

    #[test]
    fn test_operator_identity_has_pid() {
        let identity = operator_identity();
        assert!(identity.ends_with(&format!("/{}", std::process::id())));
    }
}
