// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Migration 0006: `api_audit_log.auth_method`.
//!
//! Pre-existing rows receive the column default `api_key`. The backfill then
//! copies `actor_type` into `auth_method` for exactly those rows that have
//! not been migrated yet and still hold the default. Every row it visits is
//! flagged through `auth_method_migrated`, so a second run touches nothing.
//! Rows whose `auth_method` was set to anything else before the backfill ran
//! are only flagged, never rewritten.
//!
//! Downgrade drops both columns. The recorded auth methods are lost.

use crate::domain::audit::DEFAULT_AUTH_METHOD;
use crate::domain::migration::{Backfill, ColumnDef, ColumnType, DefaultValue, MigrationUnit, SchemaOp};

pub const ID: &str = "0006_audit_auth_method";

pub fn unit() -> MigrationUnit {
    let auth_method = ColumnDef::new("auth_method", ColumnType::Varchar(32))
        .not_null()
        .default(DefaultValue::Text(DEFAULT_AUTH_METHOD.to_string()));
    let marker = ColumnDef::new("auth_method_migrated", ColumnType::Boolean)
        .not_null()
        .default(DefaultValue::Boolean(false));

    let copy_actor_type = Backfill::new(
        "api_audit_log",
        &format!("auth_method_migrated = FALSE AND auth_method = '{}'", DEFAULT_AUTH_METHOD),
        "derive auth_method from actor_type for unmigrated rows still holding the default",
    )
    .set("auth_method", "actor_type")
    .set("auth_method_migrated", "TRUE");

    let flag_explicit = Backfill::new(
        "api_audit_log",
        "auth_method_migrated = FALSE",
        "mark rows with an explicit auth_method as migrated without rewriting them",
    )
    .set("auth_method_migrated", "TRUE");

    MigrationUnit::new(ID, Some(super::m0005_api_audit_log::ID), "Record the authentication method per request")
        .upgrade(SchemaOp::add_column("api_audit_log", auth_method))
        .upgrade(SchemaOp::add_column("api_audit_log", marker))
        .upgrade(SchemaOp::Backfill(copy_actor_type))
        .upgrade(SchemaOp::Backfill(flag_explicit))
        .downgrade(SchemaOp::drop_column("api_audit_log", "auth_method_migrated"))
        .downgrade(SchemaOp::drop_column("api_audit_log", "auth_method"))
}
