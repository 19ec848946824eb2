// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Startup logging resolution: flags, environment and the config file

use std::path::PathBuf;
use switchyard::commands::resolve_logging;
use switchyard_core::domain::config::EnvSnapshot;

fn write_config(dir: &tempfile::TempDir, yaml: &str) -> PathBuf {
    let path = dir.path().join("switchyard.yaml");
    std::fs::write(&path, yaml).unwrap();
    path
}

#[test]
fn test_config_file_logging_section_is_used() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "logging:\n  level: debug\n  format: json\n");

    let logging = resolve_logging(Some(path), &EnvSnapshot::new(), None, None);
    assert_eq!(logging.format, "json");
    assert_eq!(logging.level, "debug");
}

#[test]
fn test_explicit_flags_override_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "logging:\n  level: debug\n  format: json\n");

    let logging = resolve_logging(
        Some(path),
        &EnvSnapshot::new(),
        Some("warn".to_string()),
        Some("compact".to_string()),
    );
    assert_eq!(logging.format, "compact");
    assert_eq!(logging.level, "warn");
}

#[test]
fn test_environment_overrides_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "logging:\n  format: compact\n");
    let env: EnvSnapshot = [("SWITCHYARD_LOG_FORMAT".to_string(), "json".to_string())].into_iter().collect();

    let logging = resolve_logging(Some(path), &env, None, None);
    assert_eq!(logging.format, "json");
}

#[test]
fn test_unreadable_config_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.yaml");

    let logging = resolve_logging(Some(path), &EnvSnapshot::new(), None, None);
    assert_eq!(logging.format, "compact");
    assert_eq!(logging.level, "info");
}
