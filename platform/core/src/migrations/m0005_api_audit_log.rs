// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Migration 0005: `api_audit_log`, one row per authenticated API request.

use crate::domain::migration::{ColumnDef, ColumnType, DefaultValue, IndexDef, MigrationUnit, SchemaOp, TableDef};

pub const ID: &str = "0005_api_audit_log";

pub fn unit() -> MigrationUnit {
    let table = TableDef::new(
        "api_audit_log",
        vec![
            ColumnDef::new("id", ColumnType::Uuid).primary_key(),
            ColumnDef::new("tenant_id", ColumnType::Varchar(64)),
            ColumnDef::new("actor_type", ColumnType::Varchar(32)).not_null(),
            ColumnDef::new("actor_id", ColumnType::Varchar(255)),
            ColumnDef::new("method", ColumnType::Varchar(16)).not_null(),
            ColumnDef::new("path", ColumnType::Text).not_null(),
            ColumnDef::new("status_code", ColumnType::BigInt).not_null(),
            ColumnDef::new("metadata", ColumnType::Json),
            ColumnDef::new("created_at", ColumnType::Timestamp)
                .not_null()
                .default(DefaultValue::CurrentTimestamp),
        ],
    );

    MigrationUnit::new(ID, Some(super::m0004_beta_applications::ID), "API request audit log")
        .upgrade(SchemaOp::CreateTable(table))
        .upgrade(SchemaOp::CreateIndex(IndexDef::new(
            "idx_api_audit_log_created",
            "api_audit_log",
            &["created_at"],
        )))
        .upgrade(SchemaOp::CreateIndex(IndexDef::new(
            "idx_api_audit_log_actor",
            "api_audit_log",
            &["actor_type", "actor_id"],
        )))
        .downgrade(SchemaOp::drop_index("idx_api_audit_log_actor"))
        .downgrade(SchemaOp::drop_index("idx_api_audit_log_created"))
        .downgrade(SchemaOp::drop_table("api_audit_log"))
}
