use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::application::{ApplicationFields, ApplicationRecord, ApplicationStatus};
use crate::store::ApplicationStore;

/// Raw `jobs` row. Everything is TEXT in SQLite; conversion to the typed
/// record happens in `TryFrom`.
#[derive(Debug, FromRow)]
struct JobRow {
    id: String,
    role: String,
    company: String,
    location: Option<String>,
    industry: Option<String>,
    poc: Option<String>,
    agent: Option<String>,
    process: String,
    #[sqlx(rename = "appliedDate")]
    applied_date: String,
    status: String,
    notes: Option<String>,
    #[sqlx(rename = "createdAt")]
    created_at: String,
}

/// Parses both our own `...T..Z` default and SQLite's `CURRENT_TIMESTAMP`
/// format, which older databases created by hand may still carry.
fn parse_created_at(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

fn parse_applied_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_created_at(raw).map(|dt| dt.date_naive()))
}

impl TryFrom<JobRow> for ApplicationRecord {
    type Error = AppError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&row.id)
            .map_err(|e| anyhow!("jobs row has invalid id '{}': {e}", row.id))?;
        let applied_date = parse_applied_date(&row.applied_date)
            .ok_or_else(|| anyhow!("jobs row {id} has invalid appliedDate '{}'", row.applied_date))?;
        let status = row
            .status
            .parse::<ApplicationStatus>()
            .map_err(|e| anyhow!("jobs row {id}: {e}"))?;
        let created_at = parse_created_at(&row.created_at)
            .ok_or_else(|| anyhow!("jobs row {id} has invalid createdAt '{}'", row.created_at))?;

        Ok(ApplicationRecord {
            id,
            company: row.company,
            position: row.role,
            location: row.location,
            industry: row.industry,
            poc: row.poc,
            agent: row.agent,
            process: row.process,
            applied_date,
            status,
            notes: row.notes,
            created_at,
        })
    }
}

/// Application store over the local `jobs` table.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ApplicationStore for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn insert(&self, fields: ApplicationFields) -> Result<ApplicationRecord, AppError> {
        let id = Uuid::new_v4();

        let row: JobRow = sqlx::query_as(
            r#"
            INSERT INTO jobs
                (id, role, company, location, industry, poc, agent,
                 process, appliedDate, status, notes)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(id.to_string())
        .bind(&fields.position)
        .bind(&fields.company)
        .bind(&fields.location)
        .bind(&fields.industry)
        .bind(&fields.poc)
        .bind(&fields.agent)
        .bind(&fields.process)
        .bind(fields.applied_date.format("%Y-%m-%d").to_string())
        .bind(fields.status.as_str())
        .bind(&fields.notes)
        .fetch_one(&self.pool)
        .await?;

        info!("Inserted application {id} ({} at {})", fields.position, fields.company);
        row.try_into()
    }

    async fn get(&self, id: Uuid) -> Result<Option<ApplicationRecord>, AppError> {
        let row: Option<JobRow> = sqlx::query_as("SELECT * FROM jobs WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(ApplicationRecord::try_from).transpose()
    }

    async fn list(&self) -> Result<Vec<ApplicationRecord>, AppError> {
        let rows: Vec<JobRow> = sqlx::query_as("SELECT * FROM jobs ORDER BY createdAt DESC, id")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(ApplicationRecord::try_from).collect()
    }

    async fn update(
        &self,
        id: Uuid,
        fields: ApplicationFields,
    ) -> Result<Option<ApplicationRecord>, AppError> {
        let row: Option<JobRow> = sqlx::query_as(
            r#"
            UPDATE jobs
            SET role = ?, company = ?, location = ?, industry = ?, poc = ?,
                agent = ?, process = ?, appliedDate = ?, status = ?, notes = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(&fields.position)
        .bind(&fields.company)
        .bind(&fields.location)
        .bind(&fields.industry)
        .bind(&fields.poc)
        .bind(&fields.agent)
        .bind(&fields.process)
        .bind(fields.applied_date.format("%Y-%m-%d").to_string())
        .bind(fields.status.as_str())
        .bind(&fields.notes)
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        if row.is_some() {
            info!("Updated application {id}");
        }
        row.map(ApplicationRecord::try_from).transpose()
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        let removed = result.rows_affected() > 0;
        if removed {
            info!("Deleted application {id}");
        }
        Ok(removed)
    }
}
