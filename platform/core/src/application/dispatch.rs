// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Side-Effect Dispatch Application Service
//!
//! Fire-and-forget front ends for audit events and transactional email.
//! Callers enqueue onto a bounded channel and return immediately; a
//! background task drains the channel into the configured sink or sender.
//!
//! Delivery is at-most-once and best-effort:
//! - a full queue drops the item (logged, counted in
//!   `switchyard_audit_events_dropped_total` for audit events)
//! - sink and provider failures are logged by the worker and never reach
//!   the caller
//!
//! The workers stop once every handle to their emitter has been dropped.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::audit::AuditEvent;
use crate::domain::notification::{AuditSink, EmailMessage, EmailSender};

// ============================================================================
// Audit
// ============================================================================

#[derive(Clone)]
pub struct AuditEmitter {
    sender: mpsc::Sender<AuditEvent>,
}

impl AuditEmitter {
    /// Starts the background worker. The handle completes after the last
    /// emitter clone is dropped and the queue has drained.
    pub fn spawn(sink: Arc<dyn AuditSink>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::channel::<AuditEvent>(capacity.max(1));

        let handle = tokio::spawn(async move {
            let mut recorded = 0u64;
            let mut failed = 0u64;
            while let Some(event) = receiver.recv().await {
                match sink.record(&event).await {
                    Ok(()) => recorded += 1,
                    Err(e) => {
                        failed += 1;
                        warn!(event_type = %event.event_type, error = %e, "Audit sink failed to record event");
                    }
                }
            }
            info!(recorded, failed, "Audit worker stopped");
        });

        (Self { sender }, handle)
    }

    /// Enqueues an event. Returns `false` when it had to be dropped.
    pub fn emit(&self, event_type: &str, payload: serde_json::Value) -> bool {
        self.emit_event(AuditEvent::new(event_type, payload))
    }

    pub fn emit_event(&self, event: AuditEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!(event_type = %event.event_type, "Audit queue full; event dropped");
                metrics::counter!("switchyard_audit_events_dropped_total", "reason" => "queue_full").increment(1);
                false
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                warn!(event_type = %event.event_type, "Audit worker stopped; event dropped");
                metrics::counter!("switchyard_audit_events_dropped_total", "reason" => "closed").increment(1);
                false
            }
        }
    }
}

// ============================================================================
// Email
// ============================================================================

#[derive(Clone)]
pub struct EmailDispatcher {
    sender: mpsc::Sender<EmailMessage>,
}

impl EmailDispatcher {
    pub fn spawn(email: Arc<dyn EmailSender>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::channel::<EmailMessage>(capacity.max(1));

        let handle = tokio::spawn(async move {
            while let Some(message) = receiver.recv().await {
                if email.send(&message).await {
                    debug!(recipient = %message.recipient, "Queued email delivered");
                } else {
                    warn!(recipient = %message.recipient, subject = %message.subject, "Queued email not delivered");
                }
            }
            info!("Email worker stopped");
        });

        (Self { sender }, handle)
    }

    /// Enqueues a message. Returns `false` when it had to be dropped.
    pub fn dispatch(&self, message: EmailMessage) -> bool {
        match self.sender.try_send(message) {
            Ok(()) => true,
            Err(e) => {
                let message = match e {
                    mpsc::error::TrySendError::Full(m) | mpsc::error::TrySendError::Closed(m) => m,
                };
                warn!(recipient = %message.recipient, "Email queue unavailable; message dropped");
                metrics::counter!("switchyard_emails_failed_total", "reason" => "queue").increment(1);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use tokio::sync::Semaphore;

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AuditSink for RecordingSink {
        async fn record(&self, event: &AuditEvent) -> anyhow::Result<()> {
            if event.event_type == "explode" {
                anyhow::bail!("sink unavailable");
            }
            self.events.lock().unwrap().push(event.event_type.clone());
            Ok(())
        }
    }

    struct GatedSink {
        gate: Semaphore,
    }

    #[async_trait]
    impl AuditSink for GatedSink {
        async fn record(&self, _event: &AuditEvent) -> anyhow::Result<()> {
            let _permit = self.gate.acquire().await?;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_events_reach_sink_and_failures_are_swallowed() {
        let sink = Arc::new(RecordingSink::default());
        let (emitter, handle) = AuditEmitter::spawn(sink.clone(), 16);

        assert!(emitter.emit("beta.applied", json!({"email": "a@example.com"})));
        assert!(emitter.emit("explode", json!({})));
        assert!(emitter.emit("beta.approved", json!({})));

        drop(emitter);
        handle.await.unwrap();

        assert_eq!(*sink.events.lock().unwrap(), vec!["beta.applied", "beta.approved"]);
    }

    #[tokio::test]
    async fn test_full_queue_drops_without_blocking() {
        let sink = Arc::new(GatedSink { gate: Semaphore::new(0) });
        let (emitter, _handle) = AuditEmitter::spawn(sink.clone(), 1);

        // first event is picked up by the worker and parks on the gate
        assert!(emitter.emit("one", json!({})));
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(emitter.emit("two", json!({})));
        assert!(!emitter.emit("three", json!({})));

        sink.gate.add_permits(8);
    }

    struct CountingSender {
        sent: Mutex<Vec<String>>,
        succeed: bool,
    }

    #[async_trait]
    impl EmailSender for CountingSender {
        async fn send(&self, message: &EmailMessage) -> bool {
            self.sent.lock().unwrap().push(message.recipient.clone());
            self.succeed
        }
    }

    #[tokio::test]
    async fn test_email_dispatch_is_fire_and_forget() {
        let sender = Arc::new(CountingSender {
            sent: Mutex::new(Vec::new()),
            succeed: false,
        });
        let (dispatcher, handle) = EmailDispatcher::spawn(sender.clone(), 4);

        assert!(dispatcher.dispatch(EmailMessage::new("a@example.com", "s", "<p>h</p>", "t")));
        assert!(dispatcher.dispatch(EmailMessage::new("b@example.com", "s", "<p>h</p>", "t")));

        drop(dispatcher);
        handle.await.unwrap();

        assert_eq!(*sender.sent.lock().unwrap(), vec!["a@example.com", "b@example.com"]);
    }
}
