// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Migration 0003: `coordination_strategies`, at most one per workflow.

use crate::domain::migration::{
    ColumnDef, ColumnType, DefaultValue, IndexDef, MigrationUnit, OnDelete, SchemaOp, TableDef,
};

pub const ID: &str = "0003_coordination_strategies";

pub fn unit() -> MigrationUnit {
    let table = TableDef::new(
        "coordination_strategies",
        vec![
            ColumnDef::new("id", ColumnType::Uuid).primary_key(),
            ColumnDef::new("workflow_id", ColumnType::Uuid)
                .not_null()
                .references("workflows", "id", OnDelete::Cascade),
            ColumnDef::new("agent_order", ColumnType::Json).not_null(),
            ColumnDef::new("rationale", ColumnType::Text),
            ColumnDef::new("confidence", ColumnType::Double)
                .not_null()
                .default(DefaultValue::Integer(0)),
            ColumnDef::new("updated_at", ColumnType::Timestamp)
                .not_null()
                .default(DefaultValue::CurrentTimestamp),
        ],
    );

    MigrationUnit::new(
        ID,
        Some(super::m0002_agent_performance::ID),
        "Recommended agent ordering per workflow",
    )
    .upgrade(SchemaOp::CreateTable(table))
    .upgrade(SchemaOp::CreateIndex(
        IndexDef::new("uq_coordination_strategies_workflow", "coordination_strategies", &["workflow_id"]).unique(),
    ))
    .downgrade(SchemaOp::drop_index("uq_coordination_strategies_workflow"))
    .downgrade(SchemaOp::drop_table("coordination_strategies"))
}
