// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `switchyard repair` against throwaway SQLite databases

use switchyard::commands::repair;
use switchyard_core::application::Migrator;
use switchyard_core::domain::config::EnvSnapshot;
use switchyard_core::domain::ledger::VersionLedger;
use switchyard_core::domain::migration::{Target, VersionId};
use switchyard_core::domain::repair::RepairOutcome;
use switchyard_core::infrastructure::history::HistoryAction;
use switchyard_core::infrastructure::ledger::SqlLedger;
use switchyard_core::infrastructure::Database;
use switchyard_core::migrations::builtin_chain;

fn env_with(url: Option<&str>) -> EnvSnapshot {
    let mut env = EnvSnapshot::new();
    if let Some(url) = url {
        env.insert("DATABASE_URL".to_string(), url.to_string());
    }
    env
}

#[tokio::test]
async fn test_missing_database_url_is_an_error() {
    let err = repair::run(&env_with(None)).await.unwrap_err();
    assert!(format!("{:#}", err).contains("DATABASE_URL is not set"));

    let err = repair::run(&env_with(Some(""))).await.unwrap_err();
    assert!(format!("{:#}", err).contains("DATABASE_URL is not set"));
}

#[tokio::test]
async fn test_unreachable_database_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}/absent/switchyard.db", dir.path().display());

    let err = repair::run(&env_with(Some(&url))).await.unwrap_err();
    assert!(format!("{:#}", err).contains("Repair failed"));
}

#[tokio::test]
async fn test_repair_relinks_removed_version() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("switchyard.db").display());
    let db = Database::connect_url(&url).await.unwrap();

    Migrator::new(db.clone(), builtin_chain().unwrap())
        .upgrade(&Target::Head)
        .await
        .unwrap();
    SqlLedger::new(db.clone(), HistoryAction::Stamp)
        .set_current_version(Some(&VersionId::from("c81e0d5a6b92")))
        .await
        .unwrap();

    let outcome = repair::run(&env_with(Some(&url))).await.unwrap();
    assert_eq!(
        outcome,
        RepairOutcome::Fixed {
            from: VersionId::from("c81e0d5a6b92"),
            to: VersionId::from("0004_beta_applications"),
        }
    );

    repair::execute(&env_with(Some(&url))).await.unwrap();
    let ledger = SqlLedger::new(db.clone(), HistoryAction::Repair);
    assert_eq!(
        ledger.current_version().await.unwrap(),
        Some(VersionId::from("0004_beta_applications"))
    );
    db.close().await;
}
