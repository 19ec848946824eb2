// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # SQL Dialects
//!
//! Renders [`SchemaOp`]s and introspection queries for the two supported
//! stores. PostgreSQL is the production target; SQLite backs local
//! development and the test suite. Rendering sticks to portable DDL plus
//! `IF [NOT] EXISTS` and a JSON column type.

use serde::{Deserialize, Serialize};

use crate::domain::migration::{Backfill, ColumnDef, ColumnType, DefaultValue, IndexDef, OnDelete, TableDef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Postgres,
    Sqlite,
}

#[derive(Debug, thiserror::Error)]
#[error("Unsupported database URL scheme: {0}")]
pub struct UnsupportedDialect(pub String);

impl Dialect {
    pub fn from_url(url: &str) -> Result<Self, UnsupportedDialect> {
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Ok(Dialect::Postgres)
        } else if url.starts_with("sqlite:") {
            Ok(Dialect::Sqlite)
        } else {
            let scheme = url.split(':').next().unwrap_or_default().to_string();
            Err(UnsupportedDialect(scheme))
        }
    }

    pub fn column_type(&self, column_type: &ColumnType) -> String {
        match (self, column_type) {
            (_, ColumnType::Text) => "TEXT".to_string(),
            (_, ColumnType::Varchar(n)) => format!("VARCHAR({})", n),
            (_, ColumnType::Uuid) => "VARCHAR(36)".to_string(),
            (_, ColumnType::BigInt) => "BIGINT".to_string(),
            (Dialect::Postgres, ColumnType::Double) => "DOUBLE PRECISION".to_string(),
            (Dialect::Sqlite, ColumnType::Double) => "REAL".to_string(),
            (_, ColumnType::Boolean) => "BOOLEAN".to_string(),
            (Dialect::Postgres, ColumnType::Timestamp) => "TIMESTAMPTZ".to_string(),
            (Dialect::Sqlite, ColumnType::Timestamp) => "TEXT".to_string(),
            (Dialect::Postgres, ColumnType::Json) => "JSONB".to_string(),
            (Dialect::Sqlite, ColumnType::Json) => "TEXT".to_string(),
        }
    }

    pub fn default_value(&self, value: &DefaultValue) -> String {
        match value {
            DefaultValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
            DefaultValue::Integer(i) => i.to_string(),
            DefaultValue::Boolean(true) => "TRUE".to_string(),
            DefaultValue::Boolean(false) => "FALSE".to_string(),
            DefaultValue::CurrentTimestamp => "CURRENT_TIMESTAMP".to_string(),
        }
    }

    pub fn column_definition(&self, column: &ColumnDef) -> String {
        let mut sql = format!("{} {}", column.name, self.column_type(&column.column_type));
        if column.primary_key {
            sql.push_str(" PRIMARY KEY");
        }
        if !column.nullable {
            sql.push_str(" NOT NULL");
        }
        if let Some(default) = &column.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(&self.default_value(default));
        }
        if let Some(fk) = &column.references {
            sql.push_str(&format!(" REFERENCES {}({})", fk.table, fk.column));
            match fk.on_delete {
                OnDelete::Cascade => sql.push_str(" ON DELETE CASCADE"),
                OnDelete::SetNull => sql.push_str(" ON DELETE SET NULL"),
                OnDelete::Restrict => {}
            }
        }
        sql
    }

    pub fn create_table(&self, table: &TableDef) -> String {
        let columns: Vec<String> = table.columns.iter().map(|c| self.column_definition(c)).collect();
        format!("CREATE TABLE IF NOT EXISTS {} ({})", table.name, columns.join(", "))
    }

    pub fn drop_table(&self, name: &str) -> String {
        format!("DROP TABLE IF EXISTS {}", name)
    }

    pub fn add_column(&self, table: &str, column: &ColumnDef) -> String {
        format!("ALTER TABLE {} ADD COLUMN {}", table, self.column_definition(column))
    }

    pub fn drop_column(&self, table: &str, column: &str) -> String {
        format!("ALTER TABLE {} DROP COLUMN {}", table, column)
    }

    pub fn create_index(&self, index: &IndexDef) -> String {
        format!(
            "CREATE {}INDEX IF NOT EXISTS {} ON {} ({})",
            if index.unique { "UNIQUE " } else { "" },
            index.name,
            index.table,
            index.columns.join(", ")
        )
    }

    pub fn drop_index(&self, name: &str) -> String {
        format!("DROP INDEX IF EXISTS {}", name)
    }

    pub fn backfill(&self, backfill: &Backfill) -> String {
        let assignments: Vec<String> = backfill
            .assignments
            .iter()
            .map(|a| format!("{} = {}", a.column, a.expression))
            .collect();
        format!(
            "UPDATE {} SET {} WHERE {}",
            backfill.table,
            assignments.join(", "),
            backfill.predicate
        )
    }

    /// Positional placeholder, cast where the driver binds text into a
    /// richer column type.
    pub fn bind(&self, position: usize, column_type: &ColumnType) -> String {
        match (self, column_type) {
            (Dialect::Postgres, ColumnType::Timestamp) => format!("CAST(${} AS TIMESTAMPTZ)", position),
            (Dialect::Postgres, ColumnType::Json) => format!("CAST(${} AS JSONB)", position),
            _ => format!("${}", position),
        }
    }

    /// Select expression reading any column back as text.
    pub fn read_text(&self, column: &str) -> String {
        format!("CAST({} AS TEXT) AS {}", column, column)
    }

    // ------------------------------------------------------------------
    // Introspection (every query returns a single `n` count or named rows)
    // ------------------------------------------------------------------

    pub fn table_exists_query(&self) -> &'static str {
        match self {
            Dialect::Postgres => {
                "SELECT COUNT(*) AS n FROM information_schema.tables \
                 WHERE table_schema = current_schema() AND table_name = $1"
            }
            Dialect::Sqlite => "SELECT COUNT(*) AS n FROM sqlite_master WHERE type = 'table' AND name = $1",
        }
    }

    pub fn column_exists_query(&self) -> &'static str {
        match self {
            Dialect::Postgres => {
                "SELECT COUNT(*) AS n FROM information_schema.columns \
                 WHERE table_schema = current_schema() AND table_name = $1 AND column_name = $2"
            }
            Dialect::Sqlite => "SELECT COUNT(*) AS n FROM pragma_table_info($1) WHERE name = $2",
        }
    }

    pub fn index_exists_query(&self) -> &'static str {
        match self {
            Dialect::Postgres => {
                "SELECT COUNT(*) AS n FROM pg_indexes \
                 WHERE schemaname = current_schema() AND indexname = $1"
            }
            Dialect::Sqlite => "SELECT COUNT(*) AS n FROM sqlite_master WHERE type = 'index' AND name = $1",
        }
    }

    /// Rows: `name`
    pub fn list_tables_query(&self) -> &'static str {
        match self {
            Dialect::Postgres => {
                "SELECT CAST(table_name AS TEXT) AS name FROM information_schema.tables \
                 WHERE table_schema = current_schema() AND table_type = 'BASE TABLE' \
                 ORDER BY table_name"
            }
            Dialect::Sqlite => {
                "SELECT name FROM sqlite_master \
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name"
            }
        }
    }

    /// Rows: `name`, `data_type`, `is_nullable` (`YES`/`NO`)
    pub fn list_columns_query(&self) -> &'static str {
        match self {
            Dialect::Postgres => {
                "SELECT CAST(column_name AS TEXT) AS name, CAST(data_type AS TEXT) AS data_type, \
                 CAST(is_nullable AS TEXT) AS is_nullable FROM information_schema.columns \
                 WHERE table_schema = current_schema() AND table_name = $1 ORDER BY ordinal_position"
            }
            Dialect::Sqlite => {
                "SELECT name, type AS data_type, \
                 CASE WHEN \"notnull\" = 0 THEN 'YES' ELSE 'NO' END AS is_nullable \
                 FROM pragma_table_info($1) ORDER BY cid"
            }
        }
    }

    /// Rows: `name`
    pub fn list_indexes_query(&self) -> &'static str {
        match self {
            Dialect::Postgres => {
                "SELECT CAST(indexname AS TEXT) AS name FROM pg_indexes \
                 WHERE schemaname = current_schema() AND tablename = $1 ORDER BY indexname"
            }
            Dialect::Sqlite => {
                "SELECT name FROM sqlite_master WHERE type = 'index' AND tbl_name = $1 ORDER BY name"
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_url() {
        assert_eq!(Dialect::from_url("postgres://u@h/db").unwrap(), Dialect::Postgres);
        assert_eq!(Dialect::from_url("postgresql://u@h/db").unwrap(), Dialect::Postgres);
        assert_eq!(Dialect::from_url("sqlite://app.db?mode=rwc").unwrap(), Dialect::Sqlite);
        assert_eq!(Dialect::from_url("sqlite::memory:").unwrap(), Dialect::Sqlite);
        assert!(Dialect::from_url("mysql://h/db").is_err());
    }

    #[test]
    fn test_create_table_rendering() {
        let table = TableDef::new(
            "beta_applications",
            vec![
                ColumnDef::new("id", ColumnType::Uuid).primary_key(),
                ColumnDef::new("status", ColumnType::Varchar(32))
                    .not_null()
                    .default(DefaultValue::Text("pending".to_string())),
                ColumnDef::new("meta", ColumnType::Json),
            ],
        );
        assert_eq!(
            Dialect::Postgres.create_table(&table),
            "CREATE TABLE IF NOT EXISTS beta_applications (id VARCHAR(36) PRIMARY KEY NOT NULL, \
             status VARCHAR(32) NOT NULL DEFAULT 'pending', meta JSONB)"
        );
        assert_eq!(
            Dialect::Sqlite.create_table(&table),
            "CREATE TABLE IF NOT EXISTS beta_applications (id VARCHAR(36) PRIMARY KEY NOT NULL, \
             status VARCHAR(32) NOT NULL DEFAULT 'pending', meta TEXT)"
        );
    }

    #[test]
    fn test_foreign_key_and_index_rendering() {
        let column = ColumnDef::new("agent_id", ColumnType::Uuid)
            .not_null()
            .references("agents", "id", OnDelete::Cascade);
        assert_eq!(
            Dialect::Postgres.column_definition(&column),
            "agent_id VARCHAR(36) NOT NULL REFERENCES agents(id) ON DELETE CASCADE"
        );

        let index = IndexDef::new("uq_beta_email", "beta_applications", &["email"]).unique();
        assert_eq!(
            Dialect::Sqlite.create_index(&index),
            "CREATE UNIQUE INDEX IF NOT EXISTS uq_beta_email ON beta_applications (email)"
        );
    }

    #[test]
    fn test_backfill_and_bind_rendering() {
        let backfill = Backfill::new("api_audit_log", "auth_method_migrated = FALSE", "mark rows")
            .set("auth_method_migrated", "TRUE");
        assert_eq!(
            Dialect::Postgres.backfill(&backfill),
            "UPDATE api_audit_log SET auth_method_migrated = TRUE WHERE auth_method_migrated = FALSE"
        );
        assert_eq!(Dialect::Postgres.bind(3, &ColumnType::Json), "CAST($3 AS JSONB)");
        assert_eq!(Dialect::Sqlite.bind(3, &ColumnType::Json), "$3");
        assert_eq!(Dialect::Postgres.bind(1, &ColumnType::Text), "$1");
    }

    #[test]
    fn test_text_default_is_escaped() {
        assert_eq!(
            Dialect::Sqlite.default_value(&DefaultValue::Text("o'clock".to_string())),
            "'o''clock'"
        );
    }
}
