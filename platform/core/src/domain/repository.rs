// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Persistence contracts for each entity, following the Repository pattern:
//! one repository per aggregate, interface defined in the domain layer,
//! implemented in `crate::infrastructure::repositories`.
//!
//! | Trait | Entity | Table |
//! |-------|--------|-------|
//! | `AgentRepository` | `Agent` | `agents` |
//! | `WorkflowRepository` | `Workflow` | `workflows` |
//! | `PerformanceRepository` | `AgentPerformance` | `agent_performance` |
//! | `CoordinationStrategyRepository` | `CoordinationStrategy` | `coordination_strategies` |
//! | `BetaApplicationRepository` | `BetaApplication` | `beta_applications` |
//! | `ApiAuditLogRepository` | `ApiAuditLogEntry` | `api_audit_log` |
//! | `AuditEventRepository` | `AuditEvent` | `audit_events` |
//!
//! Table shapes are owned by the migration chain; a repository only works
//! against a database whose ledger is at head.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::agent::{Agent, AgentId};
use crate::domain::audit::{ApiAuditLogEntry, AuditEvent};
use crate::domain::beta::{BetaApplication, BetaStatus, NewBetaApplication};
use crate::domain::coordination::CoordinationStrategy;
use crate::domain::performance::AgentPerformance;
use crate::domain::workflow::{Workflow, WorkflowId};

#[async_trait]
pub trait AgentRepository: Send + Sync {
    /// Save agent (create or update)
    async fn save(&self, agent: &Agent) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: AgentId) -> Result<Option<Agent>, RepositoryError>;

    async fn list_by_tenant(&self, tenant_id: &str) -> Result<Vec<Agent>, RepositoryError>;

    async fn delete(&self, id: AgentId) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait WorkflowRepository: Send + Sync {
    /// Save workflow (create or update)
    async fn save(&self, workflow: &Workflow) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: WorkflowId) -> Result<Option<Workflow>, RepositoryError>;

    async fn find_by_name(&self, tenant_id: &str, name: &str) -> Result<Option<Workflow>, RepositoryError>;
}

#[async_trait]
pub trait PerformanceRepository: Send + Sync {
    async fn record(&self, sample: &AgentPerformance) -> Result<(), RepositoryError>;

    /// Most recent samples first
    async fn recent_for_agent(&self, agent_id: AgentId, limit: usize) -> Result<Vec<AgentPerformance>, RepositoryError>;
}

#[async_trait]
pub trait CoordinationStrategyRepository: Send + Sync {
    /// Insert or replace the strategy for `strategy.workflow_id`
    async fn upsert(&self, strategy: &CoordinationStrategy) -> Result<(), RepositoryError>;

    async fn find_by_workflow(&self, workflow_id: WorkflowId) -> Result<Option<CoordinationStrategy>, RepositoryError>;
}

#[async_trait]
pub trait BetaApplicationRepository: Send + Sync {
    /// Fails with `Conflict` when the email is already registered
    async fn create(&self, application: &NewBetaApplication) -> Result<BetaApplication, RepositoryError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<BetaApplication>, RepositoryError>;

    /// Fails with `Conflict` when `api_key` is already issued to another application
    async fn update_status(
        &self,
        id: Uuid,
        status: BetaStatus,
        api_key: Option<&str>,
    ) -> Result<BetaApplication, RepositoryError>;

    async fn list_by_status(&self, status: BetaStatus) -> Result<Vec<BetaApplication>, RepositoryError>;
}

#[async_trait]
pub trait ApiAuditLogRepository: Send + Sync {
    async fn append(&self, entry: &ApiAuditLogEntry) -> Result<(), RepositoryError>;

    /// Newest entries first
    async fn recent(&self, limit: usize) -> Result<Vec<ApiAuditLogEntry>, RepositoryError>;
}

#[async_trait]
pub trait AuditEventRepository: Send + Sync {
    async fn save(&self, event: &AuditEvent) -> Result<(), RepositoryError>;

    async fn find_by_type(&self, event_type: &str, limit: usize) -> Result<Vec<AuditEvent>, RepositoryError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Uniqueness violation: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("Row not found".to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => RepositoryError::Conflict(db.message().to_string()),
            other => RepositoryError::Database(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}

impl From<uuid::Error> for RepositoryError {
    fn from(err: uuid::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}
