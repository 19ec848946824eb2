// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Schema Version Ledger
//!
//! The ledger is a single row holding the id of the last applied migration
//! unit, or `NULL` before the first run. Migration runs write it inside their
//! own transaction (see `infrastructure::ledger`); this trait is the
//! standalone view used by operator tools such as repair and stamp.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::migration::VersionId;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Ledger table holds {0} rows; exactly one is required")]
    RowCount(i64),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        LedgerError::Database(err.to_string())
    }
}

#[async_trait]
pub trait VersionLedger: Send + Sync {
    /// Current applied version, `None` before first initialization
    async fn current_version(&self) -> Result<Option<VersionId>, LedgerError>;

    /// Overwrite the single ledger row
    async fn set_current_version(&self, version: Option<&VersionId>) -> Result<(), LedgerError>;
}

/// Ledger kept in process memory, for tests and dry runs.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    version: RwLock<Option<VersionId>>,
}

impl InMemoryLedger {
    pub fn new(version: Option<VersionId>) -> Self {
        Self {
            version: RwLock::new(version),
        }
    }
}

#[async_trait]
impl VersionLedger for InMemoryLedger {
    async fn current_version(&self) -> Result<Option<VersionId>, LedgerError> {
        Ok(self.version.read().await.clone())
    }

    async fn set_current_version(&self, version: Option<&VersionId>) -> Result<(), LedgerError> {
        *self.version.write().await = version.cloned();
        Ok(())
    }
}
