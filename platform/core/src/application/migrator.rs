// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Migrator Application Service
//!
//! Drives a [`MigrationChain`] forward or backward against one database.
//!
//! Every run:
//! 1. takes the migration lock row,
//! 2. opens a single transaction,
//! 3. reads the ledger and plans the units between it and the target,
//! 4. applies each unit's guarded operations, moving the ledger and
//!    appending a history row after every unit,
//! 5. commits, then releases the lock.
//!
//! Any failure drops the transaction, so the schema, the ledger and the
//! history log all stay at their pre-run values.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::ledger::LedgerError;
use crate::domain::migration::{ChainError, Direction, MigrationChain, MigrationPlan, Target, VersionId};
use crate::infrastructure::db::Database;
use crate::infrastructure::executor::{OpOutcome, SchemaExecutor};
use crate::infrastructure::history::{self, HistoryAction, HistoryEntry};
use crate::infrastructure::introspect::SchemaSnapshot;
use crate::infrastructure::ledger;
use crate::infrastructure::lock::{LockError, MigrationLock};

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error("Ledger points at '{0}', which is not part of the migration chain (run `switchyard repair`)")]
    OrphanedLedger(VersionId),

    #[error("Target {target} is behind the current version {current}; use downgrade")]
    TargetBehind { current: String, target: String },

    #[error("Target {target} is ahead of the current version {current}; use upgrade")]
    TargetAhead { current: String, target: String },

    #[error("Migration '{unit}' failed at '{operation}': {source}")]
    Operation {
        unit: VersionId,
        operation: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

// ============================================================================
// Reports
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct OperationReport {
    pub summary: String,
    pub outcome: OpOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnitReport {
    pub id: VersionId,
    pub operations: Vec<OperationReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub direction: Direction,
    pub from: Option<VersionId>,
    pub to: Option<VersionId>,
    pub units: Vec<UnitReport>,
}

impl MigrationReport {
    pub fn is_noop(&self) -> bool {
        self.units.is_empty()
    }
}

/// A unit as it would run, with the SQL each operation renders to.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedUnit {
    pub id: VersionId,
    pub description: String,
    pub statements: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DryRun {
    pub plan: MigrationPlan,
    pub units: Vec<PlannedUnit>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecksumDrift {
    pub version: VersionId,
    pub recorded: String,
    pub expected: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MigrationStatus {
    pub current: Option<VersionId>,
    pub head: Option<VersionId>,
    /// Units between `current` and head; empty when the ledger is orphaned
    pub pending: Vec<VersionId>,
    pub orphaned: bool,
    pub drift: Vec<ChecksumDrift>,
    pub lock_holder: Option<String>,
}

impl MigrationStatus {
    pub fn is_up_to_date(&self) -> bool {
        !self.orphaned && self.pending.is_empty()
    }
}

fn label(version: Option<&VersionId>) -> String {
    version.map(|v| v.to_string()).unwrap_or_else(|| "base".to_string())
}

// ============================================================================
// Service
// ============================================================================

pub struct Migrator {
    db: Database,
    chain: MigrationChain,
    executor: SchemaExecutor,
}

impl Migrator {
    pub fn new(db: Database, chain: MigrationChain) -> Self {
        let executor = SchemaExecutor::new(db.dialect());
        Self { db, chain, executor }
    }

    pub fn chain(&self) -> &MigrationChain {
        &self.chain
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub async fn current_version(&self) -> Result<Option<VersionId>, MigrationError> {
        let mut conn = self.db.pool().acquire().await?;
        Ok(ledger::read_version_if_present(&mut conn, self.db.dialect()).await?)
    }

    fn plan_from(&self, current: Option<&VersionId>, target: &Target) -> Result<MigrationPlan, MigrationError> {
        self.chain.plan(current, target).map_err(|e| match e {
            ChainError::UnknownVersion(v) if Some(&v) == current => MigrationError::OrphanedLedger(v),
            other => other.into(),
        })
    }

    pub async fn plan(&self, target: &Target) -> Result<MigrationPlan, MigrationError> {
        let current = self.current_version().await?;
        self.plan_from(current.as_ref(), target)
    }

    /// Plans and renders the run without touching the database.
    pub async fn dry_run(&self, target: &Target) -> Result<DryRun, MigrationError> {
        let plan = self.plan(target).await?;
        let units = plan
            .steps
            .iter()
            .filter_map(|id| self.chain.get(id))
            .map(|unit| PlannedUnit {
                id: unit.id.clone(),
                description: unit.description.clone(),
                statements: unit
                    .operations(plan.direction)
                    .iter()
                    .map(|op| self.executor.render(op))
                    .collect(),
            })
            .collect();
        Ok(DryRun { plan, units })
    }

    pub async fn upgrade(&self, target: &Target) -> Result<MigrationReport, MigrationError> {
        self.run_exclusive(target, Direction::Upgrade).await
    }

    pub async fn downgrade(&self, target: &Target) -> Result<MigrationReport, MigrationError> {
        self.run_exclusive(target, Direction::Downgrade).await
    }

    async fn run_exclusive(&self, target: &Target, direction: Direction) -> Result<MigrationReport, MigrationError> {
        let lock = MigrationLock::acquire(&self.db).await?;
        let result = self.run(target, direction).await;
        if let Err(e) = lock.release().await {
            warn!(error = %e, "Failed to release migration lock");
        }
        result
    }

    async fn run(&self, target: &Target, direction: Direction) -> Result<MigrationReport, MigrationError> {
        let dialect = self.db.dialect();
        let mut tx = self.db.pool().begin().await?;

        ledger::ensure_ledger(&mut tx, dialect).await?;
        history::ensure_history(&mut tx, dialect).await?;
        let current = ledger::read_version(&mut tx).await?;
        let plan = self.plan_from(current.as_ref(), target)?;

        if !plan.is_empty() && plan.direction != direction {
            let current = label(current.as_ref());
            let target = label(plan.to.as_ref());
            return Err(match direction {
                Direction::Upgrade => MigrationError::TargetBehind { current, target },
                Direction::Downgrade => MigrationError::TargetAhead { current, target },
            });
        }

        if plan.is_empty() {
            info!(current = %label(current.as_ref()), requested = %target, "Schema already at target");
        }

        let action = match direction {
            Direction::Upgrade => HistoryAction::Upgrade,
            Direction::Downgrade => HistoryAction::Downgrade,
        };

        let mut units = Vec::with_capacity(plan.steps.len());
        for step in &plan.steps {
            let unit = self
                .chain
                .get(step)
                .ok_or_else(|| ChainError::UnknownVersion(step.clone()))?;
            info!(unit = %unit.id, %direction, "Running migration unit");

            let mut operations = Vec::new();
            for op in unit.operations(direction) {
                let outcome = self
                    .executor
                    .apply(&mut tx, op)
                    .await
                    .map_err(|source| MigrationError::Operation {
                        unit: unit.id.clone(),
                        operation: op.summary(),
                        source,
                    })?;
                if let OpOutcome::RowsAffected(rows) = outcome {
                    info!(unit = %unit.id, rows, op = %op.summary(), "Backfill applied");
                }
                operations.push(OperationReport {
                    summary: op.summary(),
                    outcome,
                });
            }

            let ledger_value = match direction {
                Direction::Upgrade => Some(&unit.id),
                Direction::Downgrade => unit.parent.as_ref(),
            };
            ledger::write_version(&mut tx, ledger_value).await?;
            history::append(&mut tx, dialect, Some(&unit.id), self.chain.checksum_of(&unit.id), action).await?;

            units.push(UnitReport {
                id: unit.id.clone(),
                operations,
            });
        }

        tx.commit().await?;

        let count = units.len() as u64;
        match direction {
            Direction::Upgrade => metrics::counter!("switchyard_migrations_applied_total").increment(count),
            Direction::Downgrade => metrics::counter!("switchyard_migrations_reverted_total").increment(count),
        }
        if count > 0 {
            info!(
                from = %label(current.as_ref()),
                to = %label(plan.to.as_ref()),
                units = count,
                %direction,
                "Migration run committed"
            );
        }

        Ok(MigrationReport {
            direction,
            from: current,
            to: plan.to,
            units,
        })
    }

    /// Sets the ledger to `target` without running any unit.
    pub async fn stamp(&self, target: &Target) -> Result<Option<VersionId>, MigrationError> {
        let version = self.chain.resolve(target)?;
        let lock = MigrationLock::acquire(&self.db).await?;

        let result = async {
            let dialect = self.db.dialect();
            let mut tx = self.db.pool().begin().await?;
            ledger::ensure_ledger(&mut tx, dialect).await?;
            history::ensure_history(&mut tx, dialect).await?;
            let previous = ledger::read_version(&mut tx).await?;
            ledger::write_version(&mut tx, version.as_ref()).await?;
            let checksum = version.as_ref().and_then(|v| self.chain.checksum_of(v));
            history::append(&mut tx, dialect, version.as_ref(), checksum, HistoryAction::Stamp).await?;
            tx.commit().await?;
            info!(from = %label(previous.as_ref()), to = %label(version.as_ref()), "Ledger stamped");
            Ok::<_, MigrationError>(version)
        }
        .await;

        if let Err(e) = lock.release().await {
            warn!(error = %e, "Failed to release migration lock");
        }
        result
    }

    pub async fn status(&self) -> Result<MigrationStatus, MigrationError> {
        let current = self.current_version().await?;
        let orphaned = current.as_ref().map(|v| !self.chain.contains(v)).unwrap_or(false);

        let pending = if orphaned {
            Vec::new()
        } else {
            self.chain.plan(current.as_ref(), &Target::Head)?.steps
        };

        let drift = self.checksum_drift().await?;
        let lock_holder = MigrationLock::current_holder(&self.db)
            .await?
            .map(|(holder, since)| format!("{} (since {})", holder, since));

        Ok(MigrationStatus {
            current,
            head: self.chain.head().cloned(),
            pending,
            orphaned,
            drift,
            lock_holder,
        })
    }

    /// Units whose most recent upgrade was recorded with a different
    /// checksum than the compiled unit has now.
    pub async fn checksum_drift(&self) -> Result<Vec<ChecksumDrift>, MigrationError> {
        let entries = self.history().await?;
        let mut latest: std::collections::BTreeMap<VersionId, String> = std::collections::BTreeMap::new();
        for entry in entries.into_iter().filter(|e| e.action == HistoryAction::Upgrade) {
            if let (Some(version), Some(checksum)) = (entry.version, entry.checksum) {
                latest.insert(version, checksum);
            }
        }

        let drift: Vec<ChecksumDrift> = latest
            .into_iter()
            .filter_map(|(version, recorded)| {
                let expected = self.chain.checksum_of(&version)?;
                (expected != recorded).then(|| ChecksumDrift {
                    expected: expected.to_string(),
                    version,
                    recorded,
                })
            })
            .collect();

        for d in &drift {
            warn!(version = %d.version, "Applied migration unit no longer matches its recorded checksum");
        }
        Ok(drift)
    }

    pub async fn history(&self) -> Result<Vec<HistoryEntry>, MigrationError> {
        let mut conn = self.db.pool().acquire().await?;
        Ok(history::list(&mut conn, self.db.dialect()).await?)
    }

    pub async fn snapshot(&self) -> Result<SchemaSnapshot, MigrationError> {
        let mut conn = self.db.pool().acquire().await?;
        Ok(SchemaSnapshot::capture(&mut conn, self.db.dialect()).await?)
    }

    /// Force-releases a lock left behind by a crashed run.
    pub async fn unlock(&self) -> Result<bool, MigrationError> {
        let removed = MigrationLock::force_release(&self.db).await?;
        debug!(removed, "Unlock requested");
        Ok(removed)
    }
}
