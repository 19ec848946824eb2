// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Side-Effect Ports
//!
//! Outbound contracts for transactional email and audit sinks. Both are
//! infallible from the caller's point of view: email reports delivery as a
//! boolean, and audit sinks are only ever driven by the background worker in
//! `application::dispatch`, which swallows their errors.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::audit::AuditEvent;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub recipient: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
    #[serde(default)]
    pub categories: Vec<String>,
}

impl EmailMessage {
    pub fn new(recipient: &str, subject: &str, html_body: &str, text_body: &str) -> Self {
        Self {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            html_body: html_body.to_string(),
            text_body: text_body.to_string(),
            categories: Vec::new(),
        }
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.categories.push(category.to_string());
        self
    }
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Deliver one message. `true` only on a 2xx provider response; never panics.
    async fn send(&self, message: &EmailMessage) -> bool;
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: &AuditEvent) -> anyhow::Result<()>;
}
