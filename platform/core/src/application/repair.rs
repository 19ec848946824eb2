// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Ledger Repair Application Service
//!
//! Operator recovery for a ledger pointing at a migration id that was removed
//! from history. Never part of an automatic migration run.
//!
//! A ledger value outside the removed set is left alone and reported as
//! [`RepairOutcome::NoActionNeeded`]; that includes an empty ledger and ids
//! that are simply unknown, which need a human decision rather than a relink.

use std::collections::BTreeSet;
use tracing::{info, warn};

use crate::domain::ledger::{LedgerError, VersionLedger};
use crate::domain::migration::{MigrationChain, VersionId};
use crate::domain::repair::{RepairError, RepairOutcome, SupersedesManifest};
use crate::infrastructure::db::Database;
use crate::infrastructure::history::HistoryAction;
use crate::infrastructure::introspect::table_exists;
use crate::infrastructure::ledger::{SqlLedger, LEDGER_TABLE};
use crate::infrastructure::lock::MigrationLock;

/// Relinks the ledger to `fallback` when it holds one of `known_removed`.
pub async fn repair(
    ledger: &dyn VersionLedger,
    known_removed: &BTreeSet<VersionId>,
    fallback: &VersionId,
) -> Result<RepairOutcome, RepairError> {
    relink(ledger, |current| known_removed.contains(current).then(|| fallback.clone())).await
}

/// Like [`repair`], with per-id replacements taken from the manifest.
pub async fn repair_with_manifest(
    ledger: &dyn VersionLedger,
    manifest: &SupersedesManifest,
) -> Result<RepairOutcome, RepairError> {
    let removed = manifest.known_removed();
    relink(ledger, |current| {
        removed
            .contains(current)
            .then(|| manifest.fallback_for(current).clone())
    })
    .await
}

async fn relink<F>(ledger: &dyn VersionLedger, replacement: F) -> Result<RepairOutcome, RepairError>
where
    F: Fn(&VersionId) -> Option<VersionId>,
{
    let current = ledger.current_version().await?;
    let Some(from) = current else {
        info!("Ledger is empty; nothing to repair");
        return Ok(RepairOutcome::NoActionNeeded { current: None });
    };

    match replacement(&from) {
        Some(to) => {
            ledger.set_current_version(Some(&to)).await?;
            info!(%from, %to, "Ledger relinked from removed migration");
            Ok(RepairOutcome::Fixed { from, to })
        }
        None => {
            info!(current = %from, "Ledger does not reference a removed migration");
            Ok(RepairOutcome::NoActionNeeded { current: Some(from) })
        }
    }
}

/// Connects, locks and repairs one database using the supersedes manifest.
pub struct RepairService {
    manifest: SupersedesManifest,
}

impl RepairService {
    /// Fails when the manifest disagrees with the compiled chain.
    pub fn new(chain: &MigrationChain, manifest: SupersedesManifest) -> Result<Self, RepairError> {
        manifest.validate_against(chain)?;
        Ok(Self { manifest })
    }

    pub fn manifest(&self) -> &SupersedesManifest {
        &self.manifest
    }

    pub async fn run(&self, database_url: &str) -> Result<RepairOutcome, RepairError> {
        let db = Database::connect_url(database_url)
            .await
            .map_err(|e| RepairError::Connection(format!("{:#}", e)))?;

        let outcome = self.run_on(&db).await;
        db.close().await;
        outcome
    }

    pub async fn run_on(&self, db: &Database) -> Result<RepairOutcome, RepairError> {
        // never-migrated databases are left without bookkeeping tables
        if !self.has_ledger(db).await? {
            info!("No schema ledger present; nothing to repair");
            return Ok(RepairOutcome::NoActionNeeded { current: None });
        }

        let lock = MigrationLock::acquire(db)
            .await
            .map_err(|e| RepairError::Lock(e.to_string()))?;

        let ledger = SqlLedger::new(db.clone(), HistoryAction::Repair);
        let outcome = repair_with_manifest(&ledger, &self.manifest).await;

        if let Err(e) = lock.release().await {
            warn!(error = %e, "Failed to release migration lock after repair");
        }
        outcome
    }

    async fn has_ledger(&self, db: &Database) -> Result<bool, RepairError> {
        let mut conn = db.pool().acquire().await.map_err(LedgerError::from)?;
        let present = table_exists(&mut conn, db.dialect(), LEDGER_TABLE)
            .await
            .map_err(LedgerError::from)?;
        Ok(present)
    }
}
