// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! SQL implementations of the repository traits defined in the domain layer,
//! one per entity table. All of them run over [`Database`] and therefore
//! work against PostgreSQL and SQLite alike.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Persist and retrieve domain entities
//! - **Pattern:** Repository (DDD), Adapter (Hexagonal Architecture)
//!
//! # Available Implementations
//!
//! - **SqlAgentRepository** - `agents`
//! - **SqlWorkflowRepository** - `workflows`
//! - **SqlPerformanceRepository** - `agent_performance`
//! - **SqlCoordinationStrategyRepository** - `coordination_strategies`
//! - **SqlBetaApplicationRepository** - `beta_applications`
//! - **SqlApiAuditLogRepository** - `api_audit_log`
//! - **SqlAuditEventRepository** - `audit_events`
//!
//! # Value Mapping
//!
//! UUIDs, timestamps and JSON documents travel as text. Inserts wrap the
//! placeholder with [`Dialect::bind`](crate::infrastructure::dialect::Dialect::bind)
//! and selects read the column back through `CAST(... AS TEXT)`.

pub mod sql_agent;
pub mod sql_audit_event;
pub mod sql_audit_log;
pub mod sql_beta;
pub mod sql_coordination;
pub mod sql_performance;
pub mod sql_workflow;

pub use sql_agent::SqlAgentRepository;
pub use sql_audit_event::SqlAuditEventRepository;
pub use sql_audit_log::SqlApiAuditLogRepository;
pub use sql_beta::SqlBetaApplicationRepository;
pub use sql_coordination::SqlCoordinationStrategyRepository;
pub use sql_performance::SqlPerformanceRepository;
pub use sql_workflow::SqlWorkflowRepository;

use chrono::{DateTime, Utc};
use sqlx::any::AnyRow;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::repository::RepositoryError;
use crate::infrastructure::db::parse_timestamp;

pub(crate) fn get_uuid(row: &AnyRow, column: &str) -> Result<Uuid, RepositoryError> {
    let raw: String = row.try_get(column)?;
    Ok(Uuid::parse_str(&raw)?)
}

pub(crate) fn get_opt_uuid(row: &AnyRow, column: &str) -> Result<Option<Uuid>, RepositoryError> {
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|s| Uuid::parse_str(&s)).transpose().map_err(Into::into)
}

pub(crate) fn get_timestamp(row: &AnyRow, column: &str) -> Result<DateTime<Utc>, RepositoryError> {
    let raw: String = row.try_get(column)?;
    parse_timestamp(&raw).map_err(|e| RepositoryError::Serialization(format!("{}: {}", column, e)))
}

pub(crate) fn get_opt_timestamp(row: &AnyRow, column: &str) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|s| parse_timestamp(&s))
        .transpose()
        .map_err(|e| RepositoryError::Serialization(format!("{}: {}", column, e)))
}

pub(crate) fn get_json(row: &AnyRow, column: &str) -> Result<serde_json::Value, RepositoryError> {
    let raw: String = row.try_get(column)?;
    Ok(serde_json::from_str(&raw)?)
}

pub(crate) fn get_opt_json(row: &AnyRow, column: &str) -> Result<Option<serde_json::Value>, RepositoryError> {
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|s| serde_json::from_str(&s)).transpose().map_err(Into::into)
}
