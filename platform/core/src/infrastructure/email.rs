// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
// SendGrid Email Adapter
//
// Anti-Corruption Layer for the SendGrid v3 mail/send API.
// Never returns an error: every failure is logged and reported as `false`.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::config::EmailSettings;
use crate::domain::notification::{EmailMessage, EmailSender};

pub struct SendGridEmailSender {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    from_address: String,
    from_name: String,
    categories: Vec<String>,
    click_tracking: bool,
    open_tracking: bool,
}

#[derive(Serialize)]
struct MailSendRequest<'a> {
    personalizations: Vec<Personalization<'a>>,
    from: Address<'a>,
    subject: &'a str,
    content: Vec<Content<'a>>,
    tracking_settings: TrackingSettings,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    categories: Vec<&'a str>,
}

#[derive(Serialize)]
struct Personalization<'a> {
    to: Vec<Address<'a>>,
}

#[derive(Serialize)]
struct Address<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    content_type: &'static str,
    value: &'a str,
}

#[derive(Serialize)]
struct TrackingSettings {
    click_tracking: Toggle,
    open_tracking: Toggle,
}

#[derive(Serialize)]
struct Toggle {
    enable: bool,
}

impl SendGridEmailSender {
    pub fn new(settings: &EmailSettings) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            api_key: settings.api_key.clone().filter(|k| !k.trim().is_empty()),
            from_address: settings.from_address.clone(),
            from_name: settings.from_name.clone(),
            categories: settings.categories.clone(),
            click_tracking: settings.click_tracking,
            open_tracking: settings.open_tracking,
        })
    }

    /// Sends one message. `true` only on a 2xx response.
    pub async fn send_email(&self, recipient: &str, subject: &str, html_body: &str, text_body: &str) -> bool {
        self.send(&EmailMessage::new(recipient, subject, html_body, text_body))
            .await
    }

    fn build_request<'a>(&'a self, message: &'a EmailMessage) -> MailSendRequest<'a> {
        let categories = self
            .categories
            .iter()
            .chain(message.categories.iter())
            .map(String::as_str)
            .collect();

        MailSendRequest {
            personalizations: vec![Personalization {
                to: vec![Address {
                    email: &message.recipient,
                    name: None,
                }],
            }],
            from: Address {
                email: &self.from_address,
                name: Some(&self.from_name),
            },
            subject: &message.subject,
            // plain text must precede html
            content: vec![
                Content {
                    content_type: "text/plain",
                    value: &message.text_body,
                },
                Content {
                    content_type: "text/html",
                    value: &message.html_body,
                },
            ],
            tracking_settings: TrackingSettings {
                click_tracking: Toggle {
                    enable: self.click_tracking,
                },
                open_tracking: Toggle {
                    enable: self.open_tracking,
                },
            },
            categories,
        }
    }
}

#[async_trait]
impl EmailSender for SendGridEmailSender {
    async fn send(&self, message: &EmailMessage) -> bool {
        let Some(api_key) = self.api_key.as_deref() else {
            warn!(recipient = %message.recipient, "Email not sent: no provider API key configured");
            metrics::counter!("switchyard_emails_failed_total", "reason" => "missing_credentials").increment(1);
            return false;
        };

        let request = self.build_request(message);
        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&request)
            .send()
            .await;

        match response {
            Ok(response) if response.status().is_success() => {
                debug!(recipient = %message.recipient, status = %response.status(), "Email accepted by provider");
                metrics::counter!("switchyard_emails_sent_total").increment(1);
                true
            }
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                warn!(recipient = %message.recipient, %status, %body, "Email rejected by provider");
                metrics::counter!("switchyard_emails_failed_total", "reason" => "provider_status").increment(1);
                false
            }
            Err(e) => {
                warn!(recipient = %message.recipient, error = %e, "Email transport failure");
                metrics::counter!("switchyard_emails_failed_total", "reason" => "transport").increment(1);
                false
            }
        }
    }
}
