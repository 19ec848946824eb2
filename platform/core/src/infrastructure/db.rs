// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Relational Connection Pool
//!
//! Wraps `sqlx::AnyPool` together with the [`Dialect`] detected from the
//! connection URL, so every repository and the migration engine can render
//! SQL for whichever store they were handed.
//!
//! Values cross the `Any` driver as primitives only: UUIDs, timestamps and
//! JSON are bound as text (with a dialect cast where needed) and read back
//! through `CAST(... AS TEXT)`.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;
use std::time::Duration;
use tracing::{debug, info};

use crate::domain::config::DatabaseSettings;
use crate::infrastructure::dialect::Dialect;

#[derive(Clone, Debug)]
pub struct Database {
    pool: AnyPool,
    dialect: Dialect,
}

impl Database {
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self> {
        let url = settings
            .url
            .as_deref()
            .context("No database URL configured (set DATABASE_URL)")?;
        Self::connect_with(url, settings.max_connections, settings.connect_timeout_secs).await
    }

    pub async fn connect_url(url: &str) -> Result<Self> {
        let defaults = DatabaseSettings::default();
        Self::connect_with(url, defaults.max_connections, defaults.connect_timeout_secs).await
    }

    async fn connect_with(url: &str, max_connections: u32, connect_timeout_secs: u64) -> Result<Self> {
        sqlx::any::install_default_drivers();
        let dialect = Dialect::from_url(url)?;

        let mut options = AnyPoolOptions::new().acquire_timeout(Duration::from_secs(connect_timeout_secs));
        if is_in_memory_sqlite(url) {
            // each connection would open its own private database
            debug!("In-memory SQLite: pinning the pool to one long-lived connection");
            options = options.max_connections(1).idle_timeout(None).max_lifetime(None);
        } else {
            debug!(?dialect, max_connections, "Opening database pool");
            options = options.max_connections(max_connections);
        }

        let pool = options
            .connect(url)
            .await
            .with_context(|| format!("Failed to connect to {} database", dialect_label(dialect)))?;

        info!(?dialect, "Database connection established");
        Ok(Self { pool, dialect })
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn dialect_label(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::Postgres => "PostgreSQL",
        Dialect::Sqlite => "SQLite",
    }
}

pub fn is_in_memory_sqlite(url: &str) -> bool {
    url.starts_with("sqlite:") && (url.contains(":memory:") || url.contains("mode=memory"))
}

/// Canonical text form written into timestamp columns.
pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parses a timestamp read back as text. Accepts RFC 3339, PostgreSQL's
/// `timestamptz::text` rendering and SQLite's naive `CURRENT_TIMESTAMP`.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f").map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_timestamp_forms() {
        let expected = Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(parse_timestamp("2026-03-04T05:06:07Z").unwrap(), expected);
        assert_eq!(parse_timestamp("2026-03-04 05:06:07+00").unwrap(), expected);
        assert_eq!(parse_timestamp("2026-03-04 07:06:07+02").unwrap(), expected);
        assert_eq!(parse_timestamp("2026-03-04 05:06:07").unwrap(), expected);
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_in_memory_urls_are_detected() {
        assert!(is_in_memory_sqlite("sqlite::memory:"));
        assert!(is_in_memory_sqlite("sqlite://:memory:"));
        assert!(is_in_memory_sqlite("sqlite://shared.db?mode=memory&cache=shared"));
        assert!(!is_in_memory_sqlite("sqlite://switchyard.db?mode=rwc"));
        assert!(!is_in_memory_sqlite("postgres://u:p@h/memory"));
    }

    #[test]
    fn test_format_round_trips() {
        let now = Utc::now();
        let parsed = parse_timestamp(&format_timestamp(&now)).unwrap();
        assert_eq!(parsed.timestamp_micros(), now.timestamp_micros());
    }
}
