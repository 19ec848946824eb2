// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Beta program applications.
//!
//! Email addresses are unique across applications. An API key is issued on
//! approval and is unique when present.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetaStatus {
    Pending,
    Approved,
    Rejected,
}

impl BetaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BetaStatus::Pending => "pending",
            BetaStatus::Approved => "approved",
            BetaStatus::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(BetaStatus::Pending),
            "approved" => Some(BetaStatus::Approved),
            "rejected" => Some(BetaStatus::Rejected),
            _ => None,
        }
    }
}

/// Submission payload; status and timestamps are assigned on insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBetaApplication {
    pub email: String,
    pub full_name: String,
    pub company: Option<String>,
    pub use_case: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetaApplication {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub company: Option<String>,
    pub use_case: Option<String>,
    pub status: BetaStatus,
    pub api_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl NewBetaApplication {
    /// Lower-cased, trimmed email; uniqueness is checked on this form.
    pub fn normalized_email(&self) -> String {
        self.email.trim().to_lowercase()
    }
}
