// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::agent::AgentId;
use crate::domain::workflow::WorkflowId;

/// Recommended agent ordering for a workflow. At most one per workflow;
/// saving a new strategy for the same workflow replaces the old one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinationStrategy {
    pub id: Uuid,
    pub workflow_id: WorkflowId,
    pub agent_order: Vec<AgentId>,
    pub rationale: Option<String>,
    pub confidence: f64,
    pub updated_at: DateTime<Utc>,
}

impl CoordinationStrategy {
    pub fn new(workflow_id: WorkflowId, agent_order: Vec<AgentId>, confidence: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            workflow_id,
            agent_order,
            rationale: None,
            confidence,
            updated_at: Utc::now(),
        }
    }
}
