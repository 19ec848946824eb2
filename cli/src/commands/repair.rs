// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `switchyard repair`
//!
//! Takes no flags. Reads `DATABASE_URL`, relinks a ledger that references a
//! removed migration and prints the resulting version. Any failure, including
//! an unset or unreachable database, surfaces as an error and exit code 1.

use anyhow::{Context, Result};
use colored::Colorize;

use switchyard_core::application::RepairService;
use switchyard_core::domain::config::EnvSnapshot;
use switchyard_core::domain::repair::RepairOutcome;
use switchyard_core::migrations::{builtin_chain, builtin_supersedes};

pub async fn execute(env: &EnvSnapshot) -> Result<()> {
    match run(env).await? {
        RepairOutcome::Fixed { from, to } => {
            println!("{}", format!("✓ Ledger relinked: {} → {}", from, to).green());
        }
        RepairOutcome::NoActionNeeded { current: Some(current) } => {
            println!("No repair needed. Current version: {}", current.to_string().bold());
        }
        RepairOutcome::NoActionNeeded { current: None } => {
            println!("No repair needed. The schema ledger is empty.");
        }
    }
    Ok(())
}

pub async fn run(env: &EnvSnapshot) -> Result<RepairOutcome> {
    let url = env
        .get("DATABASE_URL")
        .filter(|url| !url.is_empty())
        .context("DATABASE_URL is not set")?;

    let chain = builtin_chain().context("Built-in migration chain is invalid")?;
    let manifest = builtin_supersedes().context("Failed to load supersedes manifest")?;
    let service = RepairService::new(&chain, manifest).context("Supersedes manifest does not match the migration chain")?;

    service.run(url).await.context("Repair failed")
}
