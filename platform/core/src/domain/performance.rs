// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Agent performance samples.
//!
//! One row per measurement window. `reputation_score` stays empty until the
//! reputation job (external to this crate) fills it in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::agent::AgentId;
use crate::domain::workflow::WorkflowId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentPerformance {
    pub id: Uuid,
    pub agent_id: AgentId,
    pub workflow_id: Option<WorkflowId>,
    pub executions: i64,
    pub successes: i64,
    pub avg_latency_ms: f64,
    pub reputation_score: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}

impl AgentPerformance {
    pub fn new(agent_id: AgentId, executions: i64, successes: i64, avg_latency_ms: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            agent_id,
            workflow_id: None,
            executions,
            successes,
            avg_latency_ms,
            reputation_score: None,
            recorded_at: Utc::now(),
        }
    }

    /// Fraction of successful executions, `None` with no executions
    pub fn success_rate(&self) -> Option<f64> {
        if self.executions <= 0 {
            return None;
        }
        Some(self.successes as f64 / self.executions as f64)
    }
}
