// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Ledger repair against real databases
//!
//! Covers the operator flow behind `switchyard repair`: a ledger that points
//! at a migration removed from history is relinked once, everything else is
//! left alone, and an unreachable database is reported as such.

mod common;

use common::{migrated_db, migrator, temp_db};
use switchyard_core::application::RepairService;
use switchyard_core::domain::ledger::VersionLedger;
use switchyard_core::domain::migration::{Target, VersionId};
use switchyard_core::domain::repair::{RepairError, RepairOutcome};
use switchyard_core::infrastructure::history::HistoryAction;
use switchyard_core::infrastructure::introspect::table_exists;
use switchyard_core::infrastructure::ledger::SqlLedger;
use switchyard_core::infrastructure::lock::MigrationLock;
use switchyard_core::migrations::{builtin_chain, builtin_supersedes};

fn service() -> RepairService {
    RepairService::new(&builtin_chain().unwrap(), builtin_supersedes().unwrap()).unwrap()
}

#[tokio::test]
async fn test_removed_version_is_relinked_to_its_replacement() {
    let test_db = migrated_db().await;
    SqlLedger::new(test_db.db.clone(), HistoryAction::Stamp)
        .set_current_version(Some(&VersionId::from("3f2a9c1b7d4e")))
        .await
        .unwrap();

    let outcome = service().run(&test_db.url).await.unwrap();
    assert_eq!(
        outcome,
        RepairOutcome::Fixed {
            from: VersionId::from("3f2a9c1b7d4e"),
            to: VersionId::from("0006_audit_auth_method"),
        }
    );

    let migrator = migrator(&test_db.db);
    assert_eq!(
        migrator.current_version().await.unwrap(),
        Some(VersionId::from("0006_audit_auth_method"))
    );
    let last = migrator.history().await.unwrap().pop().unwrap();
    assert_eq!(last.action, HistoryAction::Repair);
    assert_eq!(last.version, Some(VersionId::from("0006_audit_auth_method")));

    // second run finds nothing to do
    let again = service().run(&test_db.url).await.unwrap();
    assert_eq!(
        again,
        RepairOutcome::NoActionNeeded {
            current: Some(VersionId::from("0006_audit_auth_method"))
        }
    );

    // the chain picks up again; 0007's objects already exist and are skipped
    let report = migrator.upgrade(&Target::Head).await.unwrap();
    assert_eq!(report.units.len(), 1);
    assert!(migrator.status().await.unwrap().is_up_to_date());
}

#[tokio::test]
async fn test_removed_version_without_replacement_uses_fallback() {
    let test_db = migrated_db().await;
    SqlLedger::new(test_db.db.clone(), HistoryAction::Stamp)
        .set_current_version(Some(&VersionId::from("9d0c4e7f1a23")))
        .await
        .unwrap();

    let outcome = service().run_on(&test_db.db).await.unwrap();
    assert!(matches!(outcome, RepairOutcome::Fixed { ref to, .. } if to.as_str() == "0005_api_audit_log"));
}

#[tokio::test]
async fn test_live_version_is_untouched() {
    let test_db = migrated_db().await;
    let before = migrator(&test_db.db).history().await.unwrap().len();

    let outcome = service().run(&test_db.url).await.unwrap();
    assert_eq!(
        outcome,
        RepairOutcome::NoActionNeeded {
            current: Some(VersionId::from("0007_audit_events"))
        }
    );
    assert_eq!(migrator(&test_db.db).history().await.unwrap().len(), before);
}

#[tokio::test]
async fn test_empty_database_needs_no_action() {
    let test_db = temp_db().await;
    let outcome = service().run_on(&test_db.db).await.unwrap();
    assert_eq!(outcome, RepairOutcome::NoActionNeeded { current: None });

    // no lock, ledger or history tables are left behind
    let mut conn = test_db.db.pool().acquire().await.unwrap();
    for table in ["schema_migration_lock", "schema_version", "schema_migration_history"] {
        assert!(
            !table_exists(&mut conn, test_db.db.dialect(), table).await.unwrap(),
            "{} was created",
            table
        );
    }
}

#[tokio::test]
async fn test_repair_respects_migration_lock() {
    let test_db = migrated_db().await;
    let _held = MigrationLock::acquire(&test_db.db).await.unwrap();

    let err = service().run_on(&test_db.db).await.unwrap_err();
    assert!(matches!(err, RepairError::Lock(_)));
}

#[tokio::test]
async fn test_unreachable_database_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}/missing/dir/switchyard.db", dir.path().display());

    let err = service().run(&url).await.unwrap_err();
    assert!(matches!(err, RepairError::Connection(_)));
}
