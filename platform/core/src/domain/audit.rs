// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Audit Records
//!
//! Two kinds of audit data live here:
//!
//! - [`ApiAuditLogEntry`]: one row per authenticated API call, including the
//!   method the caller authenticated with.
//! - [`AuditEvent`]: free-form `(event_type, payload)` records emitted by
//!   business logic through the audit emitter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Value `auth_method` takes for rows that predate the column.
pub const DEFAULT_AUTH_METHOD: &str = "api_key";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiAuditLogEntry {
    pub id: Uuid,
    pub tenant_id: Option<String>,
    pub actor_type: String,
    pub actor_id: Option<String>,
    pub auth_method: String,
    pub method: String,
    pub path: String,
    pub status_code: i64,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl ApiAuditLogEntry {
    pub fn new(actor_type: &str, auth_method: &str, method: &str, path: &str, status_code: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: None,
            actor_type: actor_type.to_string(),
            actor_id: None,
            auth_method: auth_method.to_string(),
            method: method.to_string(),
            path: path.to_string(),
            status_code,
            metadata: None,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(event_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type: event_type.into(),
            payload,
            occurred_at: Utc::now(),
        }
    }

    /// Single-line rendering: `<utc timestamp> <event_type> <payload json>`
    pub fn to_log_line(&self) -> String {
        format!(
            "{} {} {}",
            self.occurred_at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            self.event_type,
            self.payload
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_log_line_format() {
        let mut event = AuditEvent::new("beta.approved", json!({"email": "a@example.com"}));
        event.occurred_at = DateTime::parse_from_rfc3339("2026-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(
            event.to_log_line(),
            r#"2026-03-01T10:00:00.000Z beta.approved {"email":"a@example.com"}"#
        );
    }
}
