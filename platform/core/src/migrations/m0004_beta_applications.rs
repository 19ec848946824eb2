// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Migration 0004: `beta_applications`.
//!
//! Email is unique. API keys are unique when issued; NULLs do not collide.

use crate::domain::migration::{ColumnDef, ColumnType, DefaultValue, IndexDef, MigrationUnit, SchemaOp, TableDef};

pub const ID: &str = "0004_beta_applications";

pub fn unit() -> MigrationUnit {
    let table = TableDef::new(
        "beta_applications",
        vec![
            ColumnDef::new("id", ColumnType::Uuid).primary_key(),
            ColumnDef::new("email", ColumnType::Varchar(320)).not_null(),
            ColumnDef::new("full_name", ColumnType::Varchar(255)).not_null(),
            ColumnDef::new("company", ColumnType::Varchar(255)),
            ColumnDef::new("use_case", ColumnType::Text),
            ColumnDef::new("status", ColumnType::Varchar(32))
                .not_null()
                .default(DefaultValue::Text("pending".to_string())),
            ColumnDef::new("api_key", ColumnType::Varchar(128)),
            ColumnDef::new("created_at", ColumnType::Timestamp)
                .not_null()
                .default(DefaultValue::CurrentTimestamp),
            ColumnDef::new("reviewed_at", ColumnType::Timestamp),
        ],
    );

    MigrationUnit::new(
        ID,
        Some(super::m0003_coordination_strategies::ID),
        "Beta program applications",
    )
    .upgrade(SchemaOp::CreateTable(table))
    .upgrade(SchemaOp::CreateIndex(
        IndexDef::new("uq_beta_applications_email", "beta_applications", &["email"]).unique(),
    ))
    .upgrade(SchemaOp::CreateIndex(
        IndexDef::new("uq_beta_applications_api_key", "beta_applications", &["api_key"]).unique(),
    ))
    .upgrade(SchemaOp::CreateIndex(IndexDef::new(
        "idx_beta_applications_status",
        "beta_applications",
        &["status"],
    )))
    .downgrade(SchemaOp::drop_index("idx_beta_applications_status"))
    .downgrade(SchemaOp::drop_index("uq_beta_applications_api_key"))
    .downgrade(SchemaOp::drop_index("uq_beta_applications_email"))
    .downgrade(SchemaOp::drop_table("beta_applications"))
}
