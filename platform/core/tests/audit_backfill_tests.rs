// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Data migration tests for `0006_audit_auth_method`
//!
//! Rows written before the column existed take their auth method from
//! `actor_type`; rows whose auth method was set explicitly keep it; nothing
//! changes when the backfill runs a second time.

mod common;

use common::{migrator, temp_db};
use sqlx::Row;
use switchyard_core::domain::migration::{SchemaOp, Target, VersionId};
use switchyard_core::infrastructure::executor::{OpOutcome, SchemaExecutor};
use switchyard_core::infrastructure::Database;
use switchyard_core::migrations::{m0005_api_audit_log, m0006_audit_auth_method};

async fn insert_legacy_row(db: &Database, id: &str, actor_type: &str) {
    sqlx::query(
        "INSERT INTO api_audit_log (id, actor_type, actor_id, method, path, status_code) \
         VALUES ($1, $2, $3, 'GET', '/v1/agents', 200)",
    )
    .bind(id.to_string())
    .bind(actor_type.to_string())
    .bind(format!("{}-actor", actor_type))
    .execute(db.pool())
    .await
    .unwrap();
}

async fn auth_methods(db: &Database) -> Vec<(String, String)> {
    sqlx::query("SELECT id, auth_method FROM api_audit_log ORDER BY id")
        .fetch_all(db.pool())
        .await
        .unwrap()
        .iter()
        .map(|row| (row.get::<String, _>("id"), row.get::<String, _>("auth_method")))
        .collect()
}

async fn unmigrated_rows(db: &Database) -> i64 {
    sqlx::query("SELECT COUNT(*) AS n FROM api_audit_log WHERE auth_method_migrated = FALSE")
        .fetch_one(db.pool())
        .await
        .unwrap()
        .get::<i64, _>("n")
}

#[tokio::test]
async fn test_backfill_derives_auth_method_and_preserves_explicit_values() {
    let test_db = temp_db().await;
    let db = &test_db.db;
    let migrator = migrator(db);

    migrator
        .upgrade(&Target::Version(VersionId::from(m0005_api_audit_log::ID)))
        .await
        .unwrap();

    insert_legacy_row(db, "a", "service").await;
    insert_legacy_row(db, "b", "user").await;
    insert_legacy_row(db, "c", "service").await;

    // columns land ahead of the migration run, e.g. via a hotfix; one row is
    // then written by code that already knows its auth method
    let unit = m0006_audit_auth_method::unit();
    let executor = SchemaExecutor::new(db.dialect());
    {
        let mut conn = db.pool().acquire().await.unwrap();
        for op in unit.upgrade.iter().filter(|op| matches!(op, SchemaOp::AddColumn { .. })) {
            assert_eq!(executor.apply(&mut conn, op).await.unwrap(), OpOutcome::Applied);
        }
    }
    sqlx::query("UPDATE api_audit_log SET auth_method = 'jwt' WHERE id = 'c'")
        .execute(db.pool())
        .await
        .unwrap();
    assert_eq!(unmigrated_rows(db).await, 3);

    let report = migrator.upgrade(&Target::Head).await.unwrap();
    let backfill_unit = report
        .units
        .iter()
        .find(|u| u.id.as_str() == m0006_audit_auth_method::ID)
        .unwrap();
    let outcomes: Vec<&OpOutcome> = backfill_unit.operations.iter().map(|o| &o.outcome).collect();
    assert_eq!(
        outcomes,
        vec![
            &OpOutcome::Skipped,
            &OpOutcome::Skipped,
            &OpOutcome::RowsAffected(2),
            &OpOutcome::RowsAffected(1),
        ]
    );

    assert_eq!(
        auth_methods(db).await,
        vec![
            ("a".to_string(), "service".to_string()),
            ("b".to_string(), "user".to_string()),
            ("c".to_string(), "jwt".to_string()),
        ]
    );
    assert_eq!(unmigrated_rows(db).await, 0);

    // a second pass over the backfills touches nothing
    let mut conn = db.pool().acquire().await.unwrap();
    for op in unit.upgrade.iter().filter(|op| matches!(op, SchemaOp::Backfill(_))) {
        assert_eq!(executor.apply(&mut conn, op).await.unwrap(), OpOutcome::RowsAffected(0));
    }
    drop(conn);
    assert_eq!(auth_methods(db).await[0].1, "service");
}

#[tokio::test]
async fn test_rows_written_after_upgrade_keep_their_auth_method() {
    let test_db = temp_db().await;
    let db = &test_db.db;
    let migrator = migrator(db);
    migrator
        .upgrade(&Target::Version(VersionId::from(m0005_api_audit_log::ID)))
        .await
        .unwrap();
    insert_legacy_row(db, "legacy", "user").await;

    migrator.upgrade(&Target::Head).await.unwrap();

    // new rows get the column default and are not revisited by a re-run
    sqlx::query(
        "INSERT INTO api_audit_log (id, actor_type, method, path, status_code, auth_method_migrated) \
         VALUES ('fresh', 'user', 'POST', '/v1/workflows', 201, TRUE)",
    )
    .execute(db.pool())
    .await
    .unwrap();

    let executor = SchemaExecutor::new(db.dialect());
    let mut conn = db.pool().acquire().await.unwrap();
    for op in m0006_audit_auth_method::unit()
        .upgrade
        .iter()
        .filter(|op| matches!(op, SchemaOp::Backfill(_)))
    {
        assert_eq!(executor.apply(&mut conn, op).await.unwrap(), OpOutcome::RowsAffected(0));
    }
    drop(conn);

    assert_eq!(
        auth_methods(db).await,
        vec![
            ("fresh".to_string(), "api_key".to_string()),
            ("legacy".to_string(), "user".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_downgrade_drops_auth_method_columns() {
    let test_db = temp_db().await;
    let db = &test_db.db;
    let migrator = migrator(db);
    migrator.upgrade(&Target::Head).await.unwrap();
    insert_legacy_row(db, "kept", "service").await;

    migrator
        .downgrade(&Target::Version(VersionId::from(m0005_api_audit_log::ID)))
        .await
        .unwrap();

    let snapshot = migrator.snapshot().await.unwrap();
    assert!(!snapshot.has_column("api_audit_log", "auth_method"));
    assert!(!snapshot.has_column("api_audit_log", "auth_method_migrated"));
    assert!(!snapshot.has_table("audit_events"));

    let count: i64 = sqlx::query("SELECT COUNT(*) AS n FROM api_audit_log")
        .fetch_one(db.pool())
        .await
        .unwrap()
        .get("n");
    assert_eq!(count, 1);
}
