// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Guarded Schema Executor
//!
//! Applies one [`SchemaOp`] at a time against a live connection. Every
//! structural operation probes the catalog first and is skipped when the
//! target state already holds, so re-running a unit against a partially
//! migrated database converges instead of failing.
//!
//! Backfills are not guarded; their row predicate is the whole contract.

use serde::Serialize;
use sqlx::AnyConnection;
use tracing::debug;

use crate::domain::migration::SchemaOp;
use crate::infrastructure::dialect::Dialect;
use crate::infrastructure::introspect::{column_exists, index_exists, table_exists};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "rows", rename_all = "snake_case")]
pub enum OpOutcome {
    Applied,
    /// Target state already held
    Skipped,
    RowsAffected(u64),
}

#[derive(Debug, Clone, Copy)]
pub struct SchemaExecutor {
    dialect: Dialect,
}

impl SchemaExecutor {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// SQL the operation would run, ignoring guards.
    pub fn render(&self, op: &SchemaOp) -> String {
        let d = self.dialect;
        match op {
            SchemaOp::CreateTable(table) => d.create_table(table),
            SchemaOp::DropTable { name } => d.drop_table(name),
            SchemaOp::AddColumn { table, column } => d.add_column(table, column),
            SchemaOp::DropColumn { table, column } => d.drop_column(table, column),
            SchemaOp::CreateIndex(index) => d.create_index(index),
            SchemaOp::DropIndex { name } => d.drop_index(name),
            SchemaOp::Backfill(backfill) => d.backfill(backfill),
        }
    }

    pub async fn apply(&self, conn: &mut AnyConnection, op: &SchemaOp) -> Result<OpOutcome, sqlx::Error> {
        let d = self.dialect;
        let already_holds = match op {
            SchemaOp::CreateTable(table) => table_exists(conn, d, &table.name).await?,
            SchemaOp::DropTable { name } => !table_exists(conn, d, name).await?,
            SchemaOp::AddColumn { table, column } => column_exists(conn, d, table, &column.name).await?,
            SchemaOp::DropColumn { table, column } => !column_exists(conn, d, table, column).await?,
            SchemaOp::CreateIndex(index) => index_exists(conn, d, &index.name).await?,
            SchemaOp::DropIndex { name } => !index_exists(conn, d, name).await?,
            SchemaOp::Backfill(_) => false,
        };

        if already_holds {
            debug!(op = %op.summary(), "Skipping schema operation, target state already holds");
            return Ok(OpOutcome::Skipped);
        }

        let sql = self.render(op);
        debug!(op = %op.summary(), %sql, "Applying schema operation");
        let result = sqlx::query(&sql).execute(&mut *conn).await?;

        Ok(match op {
            SchemaOp::Backfill(_) => OpOutcome::RowsAffected(result.rows_affected()),
            _ => OpOutcome::Applied,
        })
    }
}
