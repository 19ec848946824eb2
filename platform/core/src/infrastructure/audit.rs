// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Audit Sinks
//!
//! Two interchangeable [`AuditSink`] implementations: a formatted line on the
//! `audit` tracing target (default), and rows in `audit_events`.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::audit::AuditEvent;
use crate::domain::notification::AuditSink;
use crate::domain::repository::AuditEventRepository;

#[derive(Debug, Default, Clone, Copy)]
pub struct LogAuditSink;

#[async_trait]
impl AuditSink for LogAuditSink {
    async fn record(&self, event: &AuditEvent) -> anyhow::Result<()> {
        tracing::info!(
            target: "audit",
            event_id = %event.id,
            event_type = %event.event_type,
            "{}",
            event.to_log_line()
        );
        Ok(())
    }
}

pub struct TableAuditSink {
    repository: Arc<dyn AuditEventRepository>,
}

impl TableAuditSink {
    pub fn new(repository: Arc<dyn AuditEventRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl AuditSink for TableAuditSink {
    async fn record(&self, event: &AuditEvent) -> anyhow::Result<()> {
        self.repository.save(event).await?;
        Ok(())
    }
}
