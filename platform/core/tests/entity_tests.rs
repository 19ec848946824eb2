// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Repository integration tests over a fully migrated SQLite database

mod common;

use chrono::{Duration, Utc};
use serde_json::json;
use std::sync::Arc;
use switchyard_core::application::AuditEmitter;
use switchyard_core::domain::agent::{Agent, AgentStatus};
use switchyard_core::domain::audit::{ApiAuditLogEntry, AuditEvent};
use switchyard_core::domain::beta::{BetaStatus, NewBetaApplication};
use switchyard_core::domain::coordination::CoordinationStrategy;
use switchyard_core::domain::performance::AgentPerformance;
use switchyard_core::domain::repository::*;
use switchyard_core::domain::workflow::Workflow;
use switchyard_core::infrastructure::audit::TableAuditSink;
use switchyard_core::infrastructure::repositories::*;

use common::migrated_db;

fn application(email: &str) -> NewBetaApplication {
    NewBetaApplication {
        email: email.to_string(),
        full_name: "Ada Lovelace".to_string(),
        company: Some("Analytical Engines".to_string()),
        use_case: None,
    }
}

#[tokio::test]
async fn test_beta_application_lifecycle() {
    let test_db = migrated_db().await;
    let repo = SqlBetaApplicationRepository::new(test_db.db.clone());

    let created = repo.create(&application("  Ada@Example.COM ")).await.unwrap();
    assert_eq!(created.email, "ada@example.com");
    assert_eq!(created.status, BetaStatus::Pending);
    assert!(created.api_key.is_none());
    assert!(created.reviewed_at.is_none());

    let found = repo.find_by_email("ADA@example.com").await.unwrap().unwrap();
    assert_eq!(found.id, created.id);
    assert!(repo.find_by_email("nobody@example.com").await.unwrap().is_none());

    let approved = repo
        .update_status(created.id, BetaStatus::Approved, Some("sk_live_1"))
        .await
        .unwrap();
    assert_eq!(approved.status, BetaStatus::Approved);
    assert_eq!(approved.api_key.as_deref(), Some("sk_live_1"));
    assert!(approved.reviewed_at.is_some());

    assert!(repo.list_by_status(BetaStatus::Pending).await.unwrap().is_empty());
    assert_eq!(repo.list_by_status(BetaStatus::Approved).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_beta_uniqueness_is_enforced() {
    let test_db = migrated_db().await;
    let repo = SqlBetaApplicationRepository::new(test_db.db.clone());

    let first = repo.create(&application("grace@example.com")).await.unwrap();
    let err = repo.create(&application("Grace@Example.com")).await.unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict(_)), "got {err:?}");

    let second = repo.create(&application("linus@example.com")).await.unwrap();
    repo.update_status(first.id, BetaStatus::Approved, Some("sk_dup"))
        .await
        .unwrap();
    let err = repo
        .update_status(second.id, BetaStatus::Approved, Some("sk_dup"))
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict(_)), "got {err:?}");

    // rejected applications carry no key; several may coexist
    repo.update_status(second.id, BetaStatus::Rejected, None).await.unwrap();
    let third = repo.create(&application("ken@example.com")).await.unwrap();
    repo.update_status(third.id, BetaStatus::Rejected, None).await.unwrap();
    assert_eq!(repo.list_by_status(BetaStatus::Rejected).await.unwrap().len(), 2);

    let err = repo
        .update_status(uuid::Uuid::new_v4(), BetaStatus::Approved, None)
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound(_)));
}

#[tokio::test]
async fn test_agents_are_tenant_scoped() {
    let test_db = migrated_db().await;
    let repo = SqlAgentRepository::new(test_db.db.clone());

    let mut planner = Agent::new("tenant-a", "planner");
    planner.capabilities = vec!["plan".to_string(), "review".to_string()];
    let coder = Agent::new("tenant-a", "coder");
    let other = Agent::new("tenant-b", "planner");
    for agent in [&planner, &coder, &other] {
        repo.save(agent).await.unwrap();
    }

    let names: Vec<String> = repo
        .list_by_tenant("tenant-a")
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.name)
        .collect();
    assert_eq!(names, vec!["coder", "planner"]);

    planner.status = AgentStatus::Paused;
    planner.role = Some("lead".to_string());
    repo.save(&planner).await.unwrap();
    let reloaded = repo.find_by_id(planner.id).await.unwrap().unwrap();
    assert_eq!(reloaded.status, AgentStatus::Paused);
    assert_eq!(reloaded.role.as_deref(), Some("lead"));
    assert_eq!(reloaded.capabilities, planner.capabilities);

    repo.delete(coder.id).await.unwrap();
    assert!(repo.find_by_id(coder.id).await.unwrap().is_none());
    assert!(matches!(repo.delete(coder.id).await, Err(RepositoryError::NotFound(_))));
}

#[tokio::test]
async fn test_workflow_names_are_unique_per_tenant() {
    let test_db = migrated_db().await;
    let repo = SqlWorkflowRepository::new(test_db.db.clone());

    let workflow = Workflow::new("tenant-a", "triage", json!({"steps": ["classify", "route"]}));
    repo.save(&workflow).await.unwrap();
    repo.save(&Workflow::new("tenant-b", "triage", json!({}))).await.unwrap();

    let found = repo.find_by_name("tenant-a", "triage").await.unwrap().unwrap();
    assert_eq!(found.id, workflow.id);
    assert_eq!(found.definition["steps"][1], "route");

    let err = repo
        .save(&Workflow::new("tenant-a", "triage", json!({})))
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict(_)));
}

#[tokio::test]
async fn test_performance_and_coordination_follow_their_parents() {
    let test_db = migrated_db().await;
    let db = test_db.db.clone();
    let agents = SqlAgentRepository::new(db.clone());
    let workflows = SqlWorkflowRepository::new(db.clone());
    let performance = SqlPerformanceRepository::new(db.clone());
    let strategies = SqlCoordinationStrategyRepository::new(db.clone());

    let agent = Agent::new("tenant-a", "reviewer");
    let helper = Agent::new("tenant-a", "helper");
    agents.save(&agent).await.unwrap();
    agents.save(&helper).await.unwrap();
    let workflow = Workflow::new("tenant-a", "review", json!({}));
    workflows.save(&workflow).await.unwrap();

    let base = Utc::now();
    for (offset, executions) in [(3, 10), (1, 20), (2, 30)] {
        let mut sample = AgentPerformance::new(agent.id, executions, executions / 2, 120.5);
        sample.workflow_id = Some(workflow.id);
        sample.recorded_at = base - Duration::minutes(offset);
        performance.record(&sample).await.unwrap();
    }

    let recent = performance.recent_for_agent(agent.id, 2).await.unwrap();
    let executions: Vec<i64> = recent.iter().map(|s| s.executions).collect();
    assert_eq!(executions, vec![20, 30]);
    assert_eq!(recent[0].workflow_id, Some(workflow.id));
    assert_eq!(recent[0].success_rate(), Some(0.5));

    let mut strategy = CoordinationStrategy::new(workflow.id, vec![agent.id, helper.id], 0.6);
    strategies.upsert(&strategy).await.unwrap();
    strategy.agent_order = vec![helper.id, agent.id];
    strategy.rationale = Some("helper warms the cache".to_string());
    strategy.confidence = 0.9;
    strategies.upsert(&CoordinationStrategy { id: uuid::Uuid::new_v4(), ..strategy.clone() })
        .await
        .unwrap();

    let stored = strategies.find_by_workflow(workflow.id).await.unwrap().unwrap();
    assert_eq!(stored.id, strategy.id);
    assert_eq!(stored.agent_order, vec![helper.id, agent.id]);
    assert_eq!(stored.confidence, 0.9);

    // deleting the agent removes its samples
    agents.delete(agent.id).await.unwrap();
    assert!(performance.recent_for_agent(agent.id, 10).await.unwrap().is_empty());

    // samples for unknown agents are rejected
    let orphan = AgentPerformance::new(agent.id, 1, 1, 1.0);
    assert!(performance.record(&orphan).await.is_err());
}

#[tokio::test]
async fn test_api_audit_log_is_newest_first() {
    let test_db = migrated_db().await;
    let repo = SqlApiAuditLogRepository::new(test_db.db.clone());

    let mut older = ApiAuditLogEntry::new("user", "jwt", "GET", "/v1/agents", 200);
    older.created_at = Utc::now() - Duration::seconds(30);
    let mut newer = ApiAuditLogEntry::new("service", "api_key", "POST", "/v1/workflows", 201);
    newer.tenant_id = Some("tenant-a".to_string());
    newer.metadata = Some(json!({"request_id": "r-1"}));
    repo.append(&older).await.unwrap();
    repo.append(&newer).await.unwrap();

    let entries = repo.recent(10).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].id, newer.id);
    assert_eq!(entries[0].auth_method, "api_key");
    assert_eq!(entries[0].metadata, Some(json!({"request_id": "r-1"})));
    assert_eq!(entries[1].auth_method, "jwt");
    assert_eq!(entries[1].metadata, None);
}

#[tokio::test]
async fn test_audit_events_through_emitter_and_table_sink() {
    let test_db = migrated_db().await;
    let repo = Arc::new(SqlAuditEventRepository::new(test_db.db.clone()));
    let (emitter, worker) = AuditEmitter::spawn(Arc::new(TableAuditSink::new(repo.clone())), 8);

    assert!(emitter.emit("beta.applied", json!({"email": "ada@example.com"})));
    assert!(emitter.emit("beta.applied", json!({"email": "grace@example.com"})));
    assert!(emitter.emit_event(AuditEvent::new("beta.approved", json!({}))));

    drop(emitter);
    worker.await.unwrap();

    let applied = repo.find_by_type("beta.applied", 10).await.unwrap();
    assert_eq!(applied.len(), 2);
    assert!(applied.iter().all(|e| e.payload["email"].is_string()));
    assert_eq!(repo.find_by_type("beta.approved", 10).await.unwrap().len(), 1);
    assert!(repo.find_by_type("beta.rejected", 10).await.unwrap().is_empty());
}
