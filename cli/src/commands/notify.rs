// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Notification commands
//!
//! Commands: test-email

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use switchyard_core::domain::config::EnvSnapshot;
use switchyard_core::domain::notification::{EmailMessage, EmailSender};
use switchyard_core::infrastructure::email::SendGridEmailSender;

use super::load_config;

#[derive(Subcommand)]
pub enum NotifyCommand {
    /// Send a test message through the configured provider
    TestEmail {
        /// Recipient address
        #[arg(value_name = "TO")]
        to: String,

        #[arg(long, default_value = "Switchyard test message")]
        subject: String,
    },
}

pub async fn handle_command(
    command: NotifyCommand,
    config_override: Option<PathBuf>,
    env: &EnvSnapshot,
) -> Result<()> {
    match command {
        NotifyCommand::TestEmail { to, subject } => test_email(config_override, env, &to, &subject).await,
    }
}

async fn test_email(config_override: Option<PathBuf>, env: &EnvSnapshot, to: &str, subject: &str) -> Result<()> {
    let config = load_config(config_override, env)?;
    if config.email.api_key.is_none() {
        anyhow::bail!("No email API key configured (set SENDGRID_API_KEY or email.api_key)");
    }

    let sender = SendGridEmailSender::new(&config.email).context("Failed to build email client")?;
    let message = EmailMessage::new(
        to,
        subject,
        "<p>This is a test message from <strong>Switchyard</strong>.</p>",
        "This is a test message from Switchyard.",
    )
    .with_category("test");

    println!("Sending test email to {} via {}...", to, config.email.endpoint);
    if !sender.send(&message).await {
        anyhow::bail!("Email provider did not accept the message; see logs for details");
    }

    println!("{}", "✓ Test email accepted by provider".green());
    Ok(())
}
