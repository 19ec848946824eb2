// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Schema Migration Commands
//!
//! This module implements `switchyard migrate`, the operator entry point to
//! the migration engine.
//!
//! # Architecture
//!
//! - **Layer:** CLI/Presentation
//! - **Purpose:** Database schema lifecycle management
//! - **Integration:** CLI → Migrator → PostgreSQL / SQLite
//!
//! # Usage
//!
//! ```bash
//! # Apply all pending units
//! switchyard migrate upgrade
//!
//! # Preview the SQL without applying it
//! switchyard migrate upgrade --dry-run
//!
//! # Revert to an earlier unit, or to an empty schema
//! switchyard migrate downgrade --to 0004_beta_applications
//! switchyard migrate downgrade --to base
//!
//! # Inspect
//! switchyard migrate status --schema
//! switchyard migrate history
//! ```
//!
//! # Environment
//!
//! Reads the database URL from `database.url` or `DATABASE_URL`.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use serde_json::json;
use std::path::PathBuf;

use switchyard_core::application::dispatch::AuditEmitter;
use switchyard_core::application::migrator::{MigrationReport, MigrationStatus};
use switchyard_core::application::Migrator;
use switchyard_core::domain::config::{EnvSnapshot, PlatformConfig};
use switchyard_core::domain::migration::{Target, VersionId};
use switchyard_core::infrastructure::executor::OpOutcome;
use switchyard_core::infrastructure::introspect::SchemaSnapshot;
use switchyard_core::migrations::builtin_chain;

use super::{audit_sink, connect, load_config};

#[derive(Subcommand)]
pub enum MigrateCommand {
    /// Apply pending migration units
    Upgrade {
        /// Unit id to stop at (default: head)
        #[arg(long, value_name = "ID", default_value = "head")]
        to: String,

        /// Print the plan and SQL without applying anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Revert applied migration units
    Downgrade {
        /// Unit id to return to, or `base` for an empty schema
        #[arg(long, value_name = "ID")]
        to: String,

        /// Print the plan and SQL without applying anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the ledger, pending units, checksum drift and lock holder
    Status {
        /// Also print the introspected physical schema
        #[arg(long)]
        schema: bool,
    },

    /// Show the migration history log
    History,

    /// Set the ledger to a unit id without running any unit
    Stamp {
        /// Unit id, `head` or `base`
        #[arg(value_name = "ID")]
        version: String,
    },

    /// Force-release a lock left behind by a crashed run
    Unlock,
}

pub async fn handle_command(
    command: MigrateCommand,
    config_override: Option<PathBuf>,
    env: &EnvSnapshot,
) -> Result<()> {
    let config = load_config(config_override, env)?;
    let chain = builtin_chain().context("Built-in migration chain is invalid")?;
    let db = connect(&config).await?;
    let migrator = Migrator::new(db.clone(), chain);

    let result = match command {
        MigrateCommand::Upgrade { to, dry_run: true } | MigrateCommand::Downgrade { to, dry_run: true } => {
            dry_run(&migrator, &Target::parse(&to)).await
        }
        MigrateCommand::Upgrade { to, .. } => upgrade(&migrator, &config, &Target::parse(&to)).await,
        MigrateCommand::Downgrade { to, .. } => downgrade(&migrator, &config, &Target::parse(&to)).await,
        MigrateCommand::Status { schema } => status(&migrator, schema).await,
        MigrateCommand::History => history(&migrator).await,
        MigrateCommand::Stamp { version } => stamp(&migrator, &Target::parse(&version)).await,
        MigrateCommand::Unlock => unlock(&migrator).await,
    };

    db.close().await;
    result
}

fn label(version: Option<&VersionId>) -> String {
    version.map(|v| v.to_string()).unwrap_or_else(|| "<base>".to_string())
}

async fn dry_run(migrator: &Migrator, target: &Target) -> Result<()> {
    let dry = migrator.dry_run(target).await.context("Failed to plan migration")?;

    if dry.plan.is_empty() {
        println!("{}", format!("✓ Already at {}", label(dry.plan.from.as_ref())).green());
        return Ok(());
    }

    println!(
        "{} {} → {} ({}, {} unit(s))",
        "Plan:".bold(),
        label(dry.plan.from.as_ref()),
        label(dry.plan.to.as_ref()),
        dry.plan.direction,
        dry.units.len()
    );
    for unit in &dry.units {
        println!();
        println!("{} {}", unit.id.to_string().bold(), unit.description.dimmed());
        for statement in &unit.statements {
            println!("  {};", statement);
        }
    }
    println!();
    println!("Skipping application due to --dry-run");
    Ok(())
}

async fn upgrade(migrator: &Migrator, config: &PlatformConfig, target: &Target) -> Result<()> {
    println!("{}", "Switchyard Migrate".bold().green());
    let report = migrator.upgrade(target).await.context("Upgrade failed")?;
    print_report(&report);
    record_run(migrator, config, "schema.upgraded", &report).await;
    Ok(())
}

async fn downgrade(migrator: &Migrator, config: &PlatformConfig, target: &Target) -> Result<()> {
    println!("{}", "Switchyard Migrate".bold().yellow());
    let report = migrator.downgrade(target).await.context("Downgrade failed")?;
    print_report(&report);
    record_run(migrator, config, "schema.downgraded", &report).await;
    Ok(())
}

fn print_report(report: &MigrationReport) {
    if report.is_noop() {
        println!("{}", format!("✓ Database is already at {}.", label(report.from.as_ref())).green());
        return;
    }

    for unit in &report.units {
        println!("  {} {}", "•".cyan(), unit.id.to_string().bold());
        for op in &unit.operations {
            let outcome = match op.outcome {
                OpOutcome::Applied => "applied".green(),
                OpOutcome::Skipped => "skipped".dimmed(),
                OpOutcome::RowsAffected(rows) => format!("{} row(s)", rows).cyan(),
            };
            println!("      {} [{}]", op.summary, outcome);
        }
    }
    println!(
        "{}",
        format!(
            "✓ {} {} → {}",
            report.direction,
            label(report.from.as_ref()),
            label(report.to.as_ref())
        )
        .green()
    );
}

/// Emits one audit event for a committed run and waits for it to be flushed.
async fn record_run(migrator: &Migrator, config: &PlatformConfig, event_type: &str, report: &MigrationReport) {
    if report.is_noop() {
        return;
    }

    let sink = audit_sink(config, migrator.database());
    let (emitter, worker) = AuditEmitter::spawn(sink, config.audit.queue_capacity);
    emitter.emit(
        event_type,
        json!({
            "from": report.from,
            "to": report.to,
            "units": report.units.iter().map(|u| u.id.as_str()).collect::<Vec<_>>(),
        }),
    );
    drop(emitter);
    if let Err(e) = worker.await {
        tracing::warn!(error = %e, "Audit worker terminated abnormally");
    }
}

async fn status(migrator: &Migrator, show_schema: bool) -> Result<()> {
    let status = migrator.status().await.context("Failed to read migration status")?;
    print_status(&status);

    if show_schema {
        let snapshot = migrator.snapshot().await.context("Failed to introspect schema")?;
        println!();
        print_schema(&snapshot);
    }
    Ok(())
}

fn print_status(status: &MigrationStatus) {
    println!("{}", "Migration status:".bold());
    println!("  Current: {}", label(status.current.as_ref()));
    println!("  Head:    {}", label(status.head.as_ref()));

    if status.orphaned {
        println!(
            "  {}",
            "Ledger references a unit that is not in the chain. Run `switchyard repair`.".red()
        );
    } else if status.pending.is_empty() {
        println!("  {}", "✓ Up to date".green());
    } else {
        println!("  Pending ({}):", status.pending.len());
        for id in &status.pending {
            println!("    - {}", id);
        }
    }

    if !status.drift.is_empty() {
        println!("  {}", "Checksum drift:".yellow());
        for drift in &status.drift {
            println!(
                "    - {} (recorded {}, compiled {})",
                drift.version,
                &drift.recorded[..drift.recorded.len().min(12)],
                &drift.expected[..drift.expected.len().min(12)]
            );
        }
    }

    match &status.lock_holder {
        Some(holder) => println!("  Lock:    {}", holder.yellow()),
        None => println!("  Lock:    {}", "free".dimmed()),
    }
}

fn print_schema(snapshot: &SchemaSnapshot) {
    println!("{}", "Physical schema:".bold());
    if snapshot.tables.is_empty() {
        println!("  {}", "(no tables)".dimmed());
    }
    for (name, table) in &snapshot.tables {
        println!("  {}", name.bold());
        for column in &table.columns {
            let nullable = if column.nullable { "" } else { " NOT NULL" };
            println!("    {} {}{}", column.name, column.data_type.to_lowercase().dimmed(), nullable);
        }
        for index in &table.indexes {
            println!("    {} {}", "index".cyan(), index);
        }
    }
}

async fn history(migrator: &Migrator) -> Result<()> {
    let entries = migrator.history().await.context("Failed to read migration history")?;

    if entries.is_empty() {
        println!("{}", "No migration history recorded.".dimmed());
        return Ok(());
    }

    println!("{}", "Migration history:".bold());
    for entry in entries {
        println!(
            "  {:>4}  {}  {:<9}  {:<32}  {}",
            entry.sequence,
            entry.applied_at.format("%Y-%m-%d %H:%M:%S"),
            entry.action.to_string(),
            label(entry.version.as_ref()),
            entry.applied_by.dimmed()
        );
    }
    Ok(())
}

async fn stamp(migrator: &Migrator, target: &Target) -> Result<()> {
    let version = migrator.stamp(target).await.context("Stamp failed")?;
    println!("{}", format!("✓ Ledger stamped at {}", label(version.as_ref())).green());
    Ok(())
}

async fn unlock(migrator: &Migrator) -> Result<()> {
    if migrator.unlock().await.context("Failed to release migration lock")? {
        println!("{}", "✓ Migration lock released".green());
    } else {
        println!("{}", "No migration lock was held.".dimmed());
    }
    Ok(())
}
