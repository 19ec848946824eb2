// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Migration 0001: tenant-scoped `agents` and `workflows`.

use crate::domain::migration::{ColumnDef, ColumnType, DefaultValue, IndexDef, MigrationUnit, SchemaOp, TableDef};

pub const ID: &str = "0001_core_entities";

pub fn unit() -> MigrationUnit {
    let agents = TableDef::new(
        "agents",
        vec![
            ColumnDef::new("id", ColumnType::Uuid).primary_key(),
            ColumnDef::new("tenant_id", ColumnType::Varchar(64)).not_null(),
            ColumnDef::new("name", ColumnType::Varchar(255)).not_null(),
            ColumnDef::new("role", ColumnType::Varchar(128)),
            ColumnDef::new("capabilities", ColumnType::Json).not_null(),
            ColumnDef::new("status", ColumnType::Varchar(32))
                .not_null()
                .default(DefaultValue::Text("active".to_string())),
            ColumnDef::new("created_at", ColumnType::Timestamp)
                .not_null()
                .default(DefaultValue::CurrentTimestamp),
            ColumnDef::new("updated_at", ColumnType::Timestamp)
                .not_null()
                .default(DefaultValue::CurrentTimestamp),
        ],
    );

    let workflows = TableDef::new(
        "workflows",
        vec![
            ColumnDef::new("id", ColumnType::Uuid).primary_key(),
            ColumnDef::new("tenant_id", ColumnType::Varchar(64)).not_null(),
            ColumnDef::new("name", ColumnType::Varchar(255)).not_null(),
            ColumnDef::new("definition", ColumnType::Json).not_null(),
            ColumnDef::new("created_at", ColumnType::Timestamp)
                .not_null()
                .default(DefaultValue::CurrentTimestamp),
            ColumnDef::new("updated_at", ColumnType::Timestamp)
                .not_null()
                .default(DefaultValue::CurrentTimestamp),
        ],
    );

    MigrationUnit::new(ID, None, "Tenant-scoped agents and workflows")
        .upgrade(SchemaOp::CreateTable(agents))
        .upgrade(SchemaOp::CreateIndex(IndexDef::new("idx_agents_tenant", "agents", &["tenant_id"])))
        .upgrade(SchemaOp::CreateTable(workflows))
        .upgrade(SchemaOp::CreateIndex(
            IndexDef::new("uq_workflows_tenant_name", "workflows", &["tenant_id", "name"]).unique(),
        ))
        .downgrade(SchemaOp::drop_index("uq_workflows_tenant_name"))
        .downgrade(SchemaOp::drop_table("workflows"))
        .downgrade(SchemaOp::drop_index("idx_agents_tenant"))
        .downgrade(SchemaOp::drop_table("agents"))
}
