// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the Switchyard CLI

pub mod config;
pub mod migrate;
pub mod notify;
pub mod repair;

pub use self::config::ConfigCommand;
pub use self::migrate::MigrateCommand;
pub use self::notify::NotifyCommand;

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

use switchyard_core::domain::config::{AuditSinkKind, EnvSnapshot, LoggingSettings, PlatformConfig};
use switchyard_core::domain::notification::AuditSink;
use switchyard_core::infrastructure::audit::{LogAuditSink, TableAuditSink};
use switchyard_core::infrastructure::repositories::SqlAuditEventRepository;
use switchyard_core::infrastructure::Database;

pub(crate) fn load_config(config_override: Option<PathBuf>, env: &EnvSnapshot) -> Result<PlatformConfig> {
    PlatformConfig::load_or_default(config_override, env).context("Failed to load configuration")
}

/// Logging settings for startup: `--log-level`/`--log-format` (or their env
/// vars) win over the config file's `logging` section. An unreadable config
/// falls back to defaults here and is reported by the command itself.
pub fn resolve_logging(
    config_override: Option<PathBuf>,
    env: &EnvSnapshot,
    level: Option<String>,
    format: Option<String>,
) -> LoggingSettings {
    let mut logging = PlatformConfig::load_or_default(config_override, env)
        .map(|config| config.logging)
        .unwrap_or_default();
    if let Some(level) = level {
        logging.level = level;
    }
    if let Some(format) = format {
        logging.format = format;
    }
    logging
}

pub(crate) async fn connect(config: &PlatformConfig) -> Result<Database> {
    config.database_url().context("Cannot reach the database")?;
    Database::connect(&config.database).await
}

/// Sink selected by `audit.sink`.
pub(crate) fn audit_sink(config: &PlatformConfig, db: &Database) -> Arc<dyn AuditSink> {
    match config.audit.sink {
        AuditSinkKind::Log => Arc::new(LogAuditSink),
        AuditSinkKind::Table => Arc::new(TableAuditSink::new(Arc::new(SqlAuditEventRepository::new(db.clone())))),
    }
}
