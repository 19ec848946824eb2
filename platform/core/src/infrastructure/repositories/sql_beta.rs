// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # SQL Beta Application Repository
//!
//! `beta_applications` carries two uniqueness rules: the (normalized) email,
//! and the issued API key when one is present. Both surface as
//! [`RepositoryError::Conflict`]. New rows take their `status` from the
//! column default.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::any::AnyRow;
use sqlx::Row;
use tracing::info;
use uuid::Uuid;

use super::{get_opt_timestamp, get_timestamp, get_uuid};
use crate::domain::beta::{BetaApplication, BetaStatus, NewBetaApplication};
use crate::domain::migration::ColumnType;
use crate::domain::repository::{BetaApplicationRepository, RepositoryError};
use crate::infrastructure::db::{format_timestamp, Database};

pub struct SqlBetaApplicationRepository {
    db: Database,
}

impl SqlBetaApplicationRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn select_sql(&self, filter: &str) -> String {
        let d = self.db.dialect();
        format!(
            "SELECT id, email, full_name, company, use_case, status, api_key, {}, {} \
             FROM beta_applications WHERE {}",
            d.read_text("created_at"),
            d.read_text("reviewed_at"),
            filter
        )
    }

    async fn fetch_by_id(&self, id: Uuid) -> Result<BetaApplication, RepositoryError> {
        let row = sqlx::query(&self.select_sql("id = $1"))
            .bind(id.to_string())
            .fetch_optional(self.db.pool())
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("beta application {}", id)))?;
        row_to_application(&row)
    }
}

fn row_to_application(row: &AnyRow) -> Result<BetaApplication, RepositoryError> {
    let status: String = row.try_get("status")?;
    Ok(BetaApplication {
        id: get_uuid(row, "id")?,
        email: row.try_get("email")?,
        full_name: row.try_get("full_name")?,
        company: row.try_get("company")?,
        use_case: row.try_get("use_case")?,
        status: BetaStatus::parse(&status)
            .ok_or_else(|| RepositoryError::Serialization(format!("Unknown beta status '{}'", status)))?,
        api_key: row.try_get("api_key")?,
        created_at: get_timestamp(row, "created_at")?,
        reviewed_at: get_opt_timestamp(row, "reviewed_at")?,
    })
}

#[async_trait]
impl BetaApplicationRepository for SqlBetaApplicationRepository {
    async fn create(&self, application: &NewBetaApplication) -> Result<BetaApplication, RepositoryError> {
        let id = Uuid::new_v4();
        let sql = format!(
            "INSERT INTO beta_applications (id, email, full_name, company, use_case, created_at) \
             VALUES ($1, $2, $3, $4, $5, {})",
            self.db.dialect().bind(6, &ColumnType::Timestamp)
        );

        sqlx::query(&sql)
            .bind(id.to_string())
            .bind(application.normalized_email())
            .bind(application.full_name.as_str())
            .bind(application.company.clone())
            .bind(application.use_case.clone())
            .bind(format_timestamp(&Utc::now()))
            .execute(self.db.pool())
            .await?;

        info!(application_id = %id, "Beta application received");
        self.fetch_by_id(id).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<BetaApplication>, RepositoryError> {
        let row = sqlx::query(&self.select_sql("email = $1"))
            .bind(email.trim().to_lowercase())
            .fetch_optional(self.db.pool())
            .await?;

        row.as_ref().map(row_to_application).transpose()
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: BetaStatus,
        api_key: Option<&str>,
    ) -> Result<BetaApplication, RepositoryError> {
        let sql = format!(
            "UPDATE beta_applications SET status = $1, api_key = $2, reviewed_at = {} WHERE id = $4",
            self.db.dialect().bind(3, &ColumnType::Timestamp)
        );

        let result = sqlx::query(&sql)
            .bind(status.as_str())
            .bind(api_key.map(str::to_string))
            .bind(format_timestamp(&Utc::now()))
            .bind(id.to_string())
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("beta application {}", id)));
        }

        info!(application_id = %id, status = status.as_str(), "Beta application reviewed");
        self.fetch_by_id(id).await
    }

    async fn list_by_status(&self, status: BetaStatus) -> Result<Vec<BetaApplication>, RepositoryError> {
        let rows = sqlx::query(&self.select_sql("status = $1 ORDER BY created_at"))
            .bind(status.as_str())
            .fetch_all(self.db.pool())
            .await?;

        rows.iter().map(row_to_application).collect()
    }
}
