// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Platform Configuration
//
// One explicit configuration object, built once at process start and passed
// by reference to every component that needs it:
// - Database connection settings
// - Transactional email provider
// - Audit sink selection
// - Logging and feature flags
//
// Environment variables are read exactly once, as a snapshot, and applied as
// overrides on top of the YAML file. Nothing below the CLI reads the process
// environment.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Snapshot of the process environment taken at startup.
pub type EnvSnapshot = HashMap<String, String>;

pub fn capture_env() -> EnvSnapshot {
    std::env::vars().collect()
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file {path:?}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("DATABASE_URL is not set and no database.url is configured")]
    MissingDatabaseUrl,

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatformConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub email: EmailSettings,

    #[serde(default)]
    pub audit: AuditSettings,

    #[serde(default)]
    pub logging: LoggingSettings,

    /// Named feature flags (`SWITCHYARD_FEATURE_<NAME>` overrides)
    #[serde(default)]
    pub features: BTreeMap<String, bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// `postgres://…` or `sqlite://…`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailSettings {
    #[serde(default = "default_email_endpoint")]
    pub endpoint: String,

    /// Bearer token; supports `env:VAR_NAME`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_from_address")]
    pub from_address: String,

    #[serde(default = "default_from_name")]
    pub from_name: String,

    #[serde(default = "default_email_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_categories")]
    pub categories: Vec<String>,

    #[serde(default)]
    pub click_tracking: bool,

    #[serde(default)]
    pub open_tracking: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditSinkKind {
    /// Structured log line on the `audit` tracing target
    Log,
    /// Rows in the `audit_events` table
    Table,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSettings {
    #[serde(default = "default_audit_sink")]
    pub sink: AuditSinkKind,

    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `compact` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            endpoint: default_email_endpoint(),
            api_key: None,
            from_address: default_from_address(),
            from_name: default_from_name(),
            timeout_secs: default_email_timeout(),
            categories: default_categories(),
            click_tracking: false,
            open_tracking: false,
        }
    }
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            sink: default_audit_sink(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl PlatformConfig {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Discover configuration file using precedence order
    /// 1. SWITCHYARD_CONFIG_PATH
    /// 2. ./switchyard.yaml
    /// 3. ~/.switchyard/config.yaml
    /// 4. /etc/switchyard/config.yaml
    pub fn discover_config(env: &EnvSnapshot) -> Option<PathBuf> {
        if let Some(path) = env.get("SWITCHYARD_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./switchyard.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".switchyard").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        let system_config = PathBuf::from("/etc/switchyard/config.yaml");
        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>, env: &EnvSnapshot) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            Self::from_yaml_file(&path)?
        } else if let Some(path) = Self::discover_config(env) {
            tracing::info!("Loading configuration from discovered path: {:?}", path);
            Self::from_yaml_file(&path)?
        } else {
            tracing::debug!("No configuration file found in standard locations. Using defaults.");
            Self::default()
        };
        config.apply_env_overrides(env);
        Ok(config)
    }

    /// Apply environment overrides from the startup snapshot
    pub fn apply_env_overrides(&mut self, env: &EnvSnapshot) {
        if let Some(url) = env.get("DATABASE_URL").filter(|v| !v.is_empty()) {
            self.database.url = Some(url.clone());
        }
        if let Some(key) = env.get("SENDGRID_API_KEY").filter(|v| !v.is_empty()) {
            self.email.api_key = Some(key.clone());
        }
        if let Some(from) = env.get("EMAIL_FROM").filter(|v| !v.is_empty()) {
            self.email.from_address = from.clone();
        }
        if let Some(name) = env.get("EMAIL_FROM_NAME").filter(|v| !v.is_empty()) {
            self.email.from_name = name.clone();
        }
        if let Some(level) = env.get("SWITCHYARD_LOG_LEVEL").filter(|v| !v.is_empty()) {
            self.logging.level = level.clone();
        }
        if let Some(format) = env.get("SWITCHYARD_LOG_FORMAT").filter(|v| !v.is_empty()) {
            self.logging.format = format.clone();
        }

        // api_key: env:VAR_NAME indirection
        let indirect = self
            .email
            .api_key
            .as_deref()
            .and_then(|k| k.strip_prefix("env:"))
            .map(str::to_string);
        if let Some(var) = indirect {
            self.email.api_key = env.get(&var).cloned();
        }

        for (key, value) in env {
            let Some(name) = key.strip_prefix("SWITCHYARD_FEATURE_") else {
                continue;
            };
            match value.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => {
                    self.features.insert(name.to_lowercase(), true);
                }
                "false" | "0" | "no" | "off" => {
                    self.features.insert(name.to_lowercase(), false);
                }
                _ => {
                    tracing::warn!(
                        "Invalid value for {}: '{}'. Expected true/false. Ignoring.",
                        key,
                        value
                    );
                }
            }
        }
    }

    pub fn database_url(&self) -> Result<&str, ConfigError> {
        self.database.url.as_deref().ok_or(ConfigError::MissingDatabaseUrl)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.database.url {
            let supported = ["postgres://", "postgresql://", "sqlite:"];
            if !supported.iter().any(|prefix| url.starts_with(prefix)) {
                return Err(ConfigError::Invalid(format!(
                    "database.url must start with one of {:?}",
                    supported
                )));
            }
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid("database.max_connections must be positive".to_string()));
        }
        if self.email.timeout_secs == 0 {
            return Err(ConfigError::Invalid("email.timeout_secs must be positive".to_string()));
        }
        if !self.email.from_address.contains('@') {
            return Err(ConfigError::Invalid(format!(
                "email.from_address '{}' is not an email address",
                self.email.from_address
            )));
        }
        if !self.email.endpoint.starts_with("http://") && !self.email.endpoint.starts_with("https://") {
            return Err(ConfigError::Invalid("email.endpoint must be an http(s) URL".to_string()));
        }
        if self.audit.queue_capacity == 0 {
            return Err(ConfigError::Invalid("audit.queue_capacity must be positive".to_string()));
        }
        if !matches!(self.logging.format.as_str(), "compact" | "json") {
            return Err(ConfigError::Invalid(format!(
                "logging.format '{}' must be 'compact' or 'json'",
                self.logging.format
            )));
        }
        Ok(())
    }
}

fn default_max_connections() -> u32 {
    5
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_email_endpoint() -> String {
    "https://api.sendgrid.com/v3/mail/send".to_string()
}

fn default_from_address() -> String {
    "noreply@switchyard.dev".to_string()
}

fn default_from_name() -> String {
    "Switchyard".to_string()
}

fn default_email_timeout() -> u64 {
    15
}

fn default_categories() -> Vec<String> {
    vec!["transactional".to_string()]
}

fn default_audit_sink() -> AuditSinkKind {
    AuditSinkKind::Log
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "compact".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> EnvSnapshot {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_defaults() {
        let config = PlatformConfig::default();
        assert_eq!(config.email.timeout_secs, 15);
        assert_eq!(config.audit.sink, AuditSinkKind::Log);
        assert!(config.database.url.is_none());
        assert!(config.validate().is_ok());
        assert!(matches!(config.database_url(), Err(ConfigError::MissingDatabaseUrl)));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = PlatformConfig::from_yaml_str(
            r#"
database:
  url: postgres://localhost/dev
email:
  api_key: env:MAIL_TOKEN
features:
  beta_signup: false
"#,
        )
        .unwrap();

        config.apply_env_overrides(&env(&[
            ("DATABASE_URL", "postgres://db.internal/prod"),
            ("MAIL_TOKEN", "sg-secret"),
            ("SWITCHYARD_FEATURE_BETA_SIGNUP", "on"),
            ("SWITCHYARD_FEATURE_BROKEN", "maybe"),
        ]));

        assert_eq!(config.database_url().unwrap(), "postgres://db.internal/prod");
        assert_eq!(config.email.api_key.as_deref(), Some("sg-secret"));
        assert_eq!(config.features.get("beta_signup"), Some(&true));
        assert!(!config.features.contains_key("broken"));
    }

    #[test]
    fn test_empty_database_url_is_ignored() {
        let mut config = PlatformConfig::default();
        config.apply_env_overrides(&env(&[("DATABASE_URL", "")]));
        assert!(config.database.url.is_none());
    }

    #[test]
    fn test_validation() {
        let mut config = PlatformConfig::default();

        config.database.url = Some("mysql://nope".to_string());
        assert!(config.validate().is_err());
        config.database.url = Some("sqlite://switchyard.db".to_string());
        assert!(config.validate().is_ok());

        config.email.timeout_secs = 0;
        assert!(config.validate().is_err());
        config.email.timeout_secs = 15;

        config.email.from_address = "not-an-address".to_string();
        assert!(config.validate().is_err());
        config.email.from_address = "ops@example.com".to_string();

        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());
    }
}
