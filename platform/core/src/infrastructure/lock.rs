// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Migration Lock
//!
//! Mutual exclusion for migration, stamp and repair runs against one
//! database. The lock is the single row of `schema_migration_lock`; the
//! primary key makes a second insert fail while the row exists, on every
//! supported store.
//!
//! A crashed run leaves its row behind. `switchyard migrate unlock` removes
//! it after the operator has confirmed no run is in flight.

use chrono::{DateTime, Utc};
use sqlx::Row;
use tracing::{info, warn};

use crate::domain::migration::{ColumnDef, ColumnType, TableDef};
use crate::infrastructure::db::{format_timestamp, parse_timestamp, Database};
use crate::infrastructure::history::operator_identity;

pub const LOCK_TABLE: &str = "schema_migration_lock";
const LOCK_ID: i64 = 1;

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("Migration lock is held by {holder} since {since}")]
    Held { holder: String, since: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

fn lock_table() -> TableDef {
    TableDef::new(
        LOCK_TABLE,
        vec![
            ColumnDef::new("lock_id", ColumnType::BigInt).primary_key(),
            ColumnDef::new("holder", ColumnType::Varchar(255)).not_null(),
            ColumnDef::new("acquired_at", ColumnType::Timestamp).not_null(),
        ],
    )
}

/// Held lock. Release explicitly; dropping the guard leaves the row in place.
#[derive(Debug)]
pub struct MigrationLock {
    db: Database,
    holder: String,
    acquired_at: DateTime<Utc>,
}

impl MigrationLock {
    pub async fn acquire(db: &Database) -> Result<Self, LockError> {
        let dialect = db.dialect();
        sqlx::query(&dialect.create_table(&lock_table()))
            .execute(db.pool())
            .await?;

        let holder = operator_identity();
        let acquired_at = Utc::now();
        let sql = format!(
            "INSERT INTO schema_migration_lock (lock_id, holder, acquired_at) VALUES ($1, $2, {})",
            dialect.bind(3, &ColumnType::Timestamp)
        );
        let inserted = sqlx::query(&sql)
            .bind(LOCK_ID)
            .bind(holder.as_str())
            .bind(format_timestamp(&acquired_at))
            .execute(db.pool())
            .await;

        match inserted {
            Ok(_) => {
                info!(%holder, "Migration lock acquired");
                Ok(Self {
                    db: db.clone(),
                    holder,
                    acquired_at,
                })
            }
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                let (holder, since) = Self::current_holder(db)
                    .await?
                    .unwrap_or_else(|| ("<released>".to_string(), "<unknown>".to_string()));
                warn!(%holder, %since, "Migration lock already held");
                Err(LockError::Held { holder, since })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// `(holder, acquired_at)` of the current row, if any.
    pub async fn current_holder(db: &Database) -> Result<Option<(String, String)>, LockError> {
        let sql = format!(
            "SELECT holder, {} FROM schema_migration_lock WHERE lock_id = $1",
            db.dialect().read_text("acquired_at")
        );
        let row = match sqlx::query(&sql).bind(LOCK_ID).fetch_optional(db.pool()).await {
            Ok(row) => row,
            // table not created yet
            Err(sqlx::Error::Database(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match row {
            Some(row) => {
                let holder: String = row.try_get("holder")?;
                let since: String = row.try_get("acquired_at")?;
                let since = parse_timestamp(&since).map(|ts| ts.to_rfc3339()).unwrap_or(since);
                Ok(Some((holder, since)))
            }
            None => Ok(None),
        }
    }

    pub fn holder(&self) -> &str {
        &self.holder
    }

    pub fn acquired_at(&self) -> DateTime<Utc> {
        self.acquired_at
    }

    pub async fn release(self) -> Result<(), LockError> {
        sqlx::query("DELETE FROM schema_migration_lock WHERE lock_id = $1 AND holder = $2")
            .bind(LOCK_ID)
            .bind(self.holder.as_str())
            .execute(self.db.pool())
            .await?;
        info!(holder = %self.holder, "Migration lock released");
        Ok(())
    }

    /// Removes the lock row regardless of holder. Returns whether a row existed.
    pub async fn force_release(db: &Database) -> Result<bool, LockError> {
        let dialect = db.dialect();
        sqlx::query(&dialect.create_table(&lock_table()))
            .execute(db.pool())
            .await?;
        let result = sqlx::query("DELETE FROM schema_migration_lock WHERE lock_id = $1")
            .bind(LOCK_ID)
            .execute(db.pool())
            .await?;
        let removed = result.rows_affected() > 0;
        if removed {
            warn!("Migration lock forcibly released");
        }
        Ok(removed)
    }
}
