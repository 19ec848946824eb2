// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Migration 0002: `agent_performance` samples.
//!
//! Canonical shape: UUID primary key, one row per sample, agent reference
//! cascades, workflow reference is cleared when the workflow goes away.

use crate::domain::migration::{
    ColumnDef, ColumnType, DefaultValue, IndexDef, MigrationUnit, OnDelete, SchemaOp, TableDef,
};

pub const ID: &str = "0002_agent_performance";

pub fn unit() -> MigrationUnit {
    let table = TableDef::new(
        "agent_performance",
        vec![
            ColumnDef::new("id", ColumnType::Uuid).primary_key(),
            ColumnDef::new("agent_id", ColumnType::Uuid)
                .not_null()
                .references("agents", "id", OnDelete::Cascade),
            ColumnDef::new("workflow_id", ColumnType::Uuid).references("workflows", "id", OnDelete::SetNull),
            ColumnDef::new("executions", ColumnType::BigInt)
                .not_null()
                .default(DefaultValue::Integer(0)),
            ColumnDef::new("successes", ColumnType::BigInt)
                .not_null()
                .default(DefaultValue::Integer(0)),
            ColumnDef::new("avg_latency_ms", ColumnType::Double)
                .not_null()
                .default(DefaultValue::Integer(0)),
            ColumnDef::new("reputation_score", ColumnType::Double),
            ColumnDef::new("recorded_at", ColumnType::Timestamp)
                .not_null()
                .default(DefaultValue::CurrentTimestamp),
        ],
    );

    MigrationUnit::new(ID, Some(super::m0001_core_entities::ID), "Per-agent execution metrics")
        .upgrade(SchemaOp::CreateTable(table))
        .upgrade(SchemaOp::CreateIndex(IndexDef::new(
            "idx_agent_performance_agent",
            "agent_performance",
            &["agent_id", "recorded_at"],
        )))
        .downgrade(SchemaOp::drop_index("idx_agent_performance_agent"))
        .downgrade(SchemaOp::drop_table("agent_performance"))
}
