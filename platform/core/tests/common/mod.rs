// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Shared fixtures: a throwaway SQLite database per test.

#![allow(dead_code)]

use switchyard_core::application::Migrator;
use switchyard_core::domain::migration::Target;
use switchyard_core::infrastructure::Database;
use switchyard_core::migrations::builtin_chain;
use tempfile::TempDir;

pub struct TestDb {
    // keeps the directory alive for the duration of the test
    _dir: TempDir,
    pub url: String,
    pub db: Database,
}

pub async fn temp_db() -> TestDb {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("switchyard.db").display());
    let db = Database::connect_url(&url).await.expect("connect sqlite");
    TestDb { _dir: dir, url, db }
}

pub fn migrator(db: &Database) -> Migrator {
    Migrator::new(db.clone(), builtin_chain().expect("builtin chain"))
}

/// Database upgraded to the head of the built-in chain.
pub async fn migrated_db() -> TestDb {
    let test_db = temp_db().await;
    migrator(&test_db.db)
        .upgrade(&Target::Head)
        .await
        .expect("upgrade to head");
    test_db
}
