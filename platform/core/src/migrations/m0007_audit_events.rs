// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Migration 0007: `audit_events`, storage for the table-backed audit sink.

use crate::domain::migration::{ColumnDef, ColumnType, IndexDef, MigrationUnit, SchemaOp, TableDef};

pub const ID: &str = "0007_audit_events";

pub fn unit() -> MigrationUnit {
    let table = TableDef::new(
        "audit_events",
        vec![
            ColumnDef::new("id", ColumnType::Uuid).primary_key(),
            ColumnDef::new("event_type", ColumnType::Varchar(128)).not_null(),
            ColumnDef::new("payload", ColumnType::Json).not_null(),
            ColumnDef::new("occurred_at", ColumnType::Timestamp).not_null(),
        ],
    );

    MigrationUnit::new(ID, Some(super::m0006_audit_auth_method::ID), "Durable audit event sink")
        .upgrade(SchemaOp::CreateTable(table))
        .upgrade(SchemaOp::CreateIndex(IndexDef::new(
            "idx_audit_events_type_time",
            "audit_events",
            &["event_type", "occurred_at"],
        )))
        .downgrade(SchemaOp::drop_index("idx_audit_events_type_time"))
        .downgrade(SchemaOp::drop_table("audit_events"))
}
