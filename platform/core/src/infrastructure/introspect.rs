// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Schema Introspection
//!
//! Existence probes backing the guarded schema operations, and a full
//! snapshot of the physical schema for `migrate status --schema` and for
//! shape comparisons in tests.

use serde::Serialize;
use sqlx::AnyConnection;
use sqlx::Row;
use std::collections::BTreeMap;

use crate::infrastructure::dialect::Dialect;

/// Bookkeeping tables owned by the migration engine itself.
pub const INTERNAL_TABLES: &[&str] = &["schema_version", "schema_migration_history", "schema_migration_lock"];

pub async fn table_exists(conn: &mut AnyConnection, dialect: Dialect, table: &str) -> Result<bool, sqlx::Error> {
    let row = sqlx::query(dialect.table_exists_query())
        .bind(table)
        .fetch_one(&mut *conn)
        .await?;
    Ok(row.try_get::<i64, _>("n")? > 0)
}

pub async fn column_exists(
    conn: &mut AnyConnection,
    dialect: Dialect,
    table: &str,
    column: &str,
) -> Result<bool, sqlx::Error> {
    let row = sqlx::query(dialect.column_exists_query())
        .bind(table)
        .bind(column)
        .fetch_one(&mut *conn)
        .await?;
    Ok(row.try_get::<i64, _>("n")? > 0)
}

pub async fn index_exists(conn: &mut AnyConnection, dialect: Dialect, index: &str) -> Result<bool, sqlx::Error> {
    let row = sqlx::query(dialect.index_exists_query())
        .bind(index)
        .fetch_one(&mut *conn)
        .await?;
    Ok(row.try_get::<i64, _>("n")? > 0)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnShape {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableShape {
    pub columns: Vec<ColumnShape>,
    pub indexes: Vec<String>,
}

/// Physical shape of every application table, keyed by table name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaSnapshot {
    pub tables: BTreeMap<String, TableShape>,
}

impl SchemaSnapshot {
    pub async fn capture(conn: &mut AnyConnection, dialect: Dialect) -> Result<Self, sqlx::Error> {
        let names: Vec<String> = sqlx::query(dialect.list_tables_query())
            .fetch_all(&mut *conn)
            .await?
            .iter()
            .map(|row| row.try_get::<String, _>("name"))
            .collect::<Result<_, _>>()?;

        let mut tables = BTreeMap::new();
        for name in names.into_iter().filter(|n| !INTERNAL_TABLES.contains(&n.as_str())) {
            let columns = sqlx::query(dialect.list_columns_query())
                .bind(&name)
                .fetch_all(&mut *conn)
                .await?
                .iter()
                .map(|row| -> Result<ColumnShape, sqlx::Error> {
                    Ok(ColumnShape {
                        name: row.try_get("name")?,
                        data_type: row.try_get("data_type")?,
                        nullable: row.try_get::<String, _>("is_nullable")? == "YES",
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            let indexes = sqlx::query(dialect.list_indexes_query())
                .bind(&name)
                .fetch_all(&mut *conn)
                .await?
                .iter()
                .map(|row| row.try_get::<String, _>("name"))
                .collect::<Result<Vec<_>, _>>()?;

            tables.insert(name, TableShape { columns, indexes });
        }

        Ok(Self { tables })
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    pub fn has_column(&self, table: &str, column: &str) -> bool {
        self.tables
            .get(table)
            .map(|t| t.columns.iter().any(|c| c.name == column))
            .unwrap_or(false)
    }

    pub fn has_index(&self, table: &str, index: &str) -> bool {
        self.tables
            .get(table)
            .map(|t| t.indexes.iter().any(|i| i == index))
            .unwrap_or(false)
    }
}
