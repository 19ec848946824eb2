// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Switchyard Operator CLI
//!
//! The `switchyard` binary drives schema lifecycle and operator recovery for
//! a Switchyard deployment.
//!
//! ## Commands
//!
//! - `switchyard migrate upgrade|downgrade|status|history|stamp|unlock` - Schema lifecycle
//! - `switchyard repair` - Relink a ledger that references a removed migration
//! - `switchyard config show|validate` - Configuration management
//! - `switchyard notify test-email <to>` - Send a test message through the email provider
//!
//! `.env` is loaded first; the process environment is then captured once and
//! handed to every command as a snapshot.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use switchyard::commands::{self, ConfigCommand, MigrateCommand, NotifyCommand};
use switchyard_core::domain::config::{capture_env, EnvSnapshot, LoggingSettings};

/// Switchyard - schema lifecycle and operator tooling
#[derive(Parser)]
#[command(name = "switchyard")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "SWITCHYARD_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error) [default: logging.level, then info]
    #[arg(long, global = true, env = "SWITCHYARD_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log output format (compact, json) [default: logging.format, then compact]
    #[arg(long, global = true, env = "SWITCHYARD_LOG_FORMAT")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Schema migrations
    #[command(name = "migrate")]
    Migrate {
        #[command(subcommand)]
        command: MigrateCommand,
    },

    /// Relink a schema ledger that points at a removed migration
    #[command(name = "repair")]
    Repair,

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Transactional email
    #[command(name = "notify")]
    Notify {
        #[command(subcommand)]
        command: NotifyCommand,
    },
}

#[tokio::main]
async fn main() {
    // a missing .env is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let env = capture_env();

    let logging = commands::resolve_logging(cli.config.clone(), &env, cli.log_level.clone(), cli.log_format.clone());
    if let Err(e) = init_logging(&logging) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }

    if let Err(e) = run(cli, env).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, env: EnvSnapshot) -> Result<()> {
    match cli.command {
        Some(Commands::Migrate { command }) => commands::migrate::handle_command(command, cli.config, &env).await,
        Some(Commands::Repair) => commands::repair::execute(&env).await,
        Some(Commands::Config { command }) => commands::config::handle_command(command, cli.config, &env).await,
        Some(Commands::Notify { command }) => commands::notify::handle_command(command, cli.config, &env).await,
        None => {
            // No command provided - show help
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(logging: &LoggingSettings) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&logging.level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match logging.format.as_str() {
        "json" => builder.json().with_target(true).init(),
        "compact" => builder.with_target(false).compact().init(),
        other => anyhow::bail!("Unknown log format '{}' (expected compact or json)", other),
    }

    Ok(())
}
