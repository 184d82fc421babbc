use crate::circuit_breaker::{archive_breaker, ArchiveBreaker};
use crate::errors::{AppError, ResultExt};
use crate::models::ProfileRecord;
use failsafe::futures::CircuitBreaker;
use sqlx::types::Json;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

/// Largest page the archive listing will return.
pub const MAX_ARCHIVE_PAGE: i64 = 200;
const ARCHIVE_POOL_SIZE: u32 = 10;

/// Postgres archive of merged profiles, one row per identity key.
#[derive(Clone)]
pub struct ReportStorage {
    pool: PgPool,
    breaker: ArchiveBreaker,
}

impl ReportStorage {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            breaker: archive_breaker(),
        }
    }

    /// Opens the archive pool, checks the database answers and makes sure
    /// the `profile_reports` table exists.
    pub async fn connect(database_url: &str) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(ARCHIVE_POOL_SIZE)
            .connect(database_url)
            .await
            .context("Failed to connect to the report archive")?;

        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .context("Report archive did not answer")?;

        let storage = Self::new(pool);
        storage.ensure_schema().await?;
        Ok(storage)
    }

    /// Creates the archive table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), AppError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS profile_reports (
                handle TEXT PRIMARY KEY,
                report JSONB NOT NULL,
                last_fetched TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create profile_reports table")?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS profile_reports_last_fetched_idx ON profile_reports (last_fetched DESC)",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create profile_reports index")?;

        Ok(())
    }

    /// Store or replace the archived report for `record.id`.
    ///
    /// Runs behind the circuit breaker; while it is open the write is
    /// rejected immediately.
    pub async fn upsert_report(&self, record: &ProfileRecord) -> Result<(), AppError> {
        let write = sqlx::query(
            r#"
            INSERT INTO profile_reports (handle, report, last_fetched, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (handle) DO UPDATE
               SET report = EXCLUDED.report,
                   last_fetched = EXCLUDED.last_fetched,
                   updated_at = NOW()
            "#,
        )
        .bind(&record.id)
        .bind(Json(record))
        .bind(record.last_fetched)
        .execute(&self.pool);

        match self.breaker.call(write).await {
            Ok(_) => {
                tracing::debug!("Archived report for {}", record.id);
                Ok(())
            }
            Err(failsafe::Error::Inner(e)) => Err::<(), _>(AppError::DatabaseError(e))
                .with_context(|| format!("Failed to archive report for {}", record.id)),
            Err(failsafe::Error::Rejected) => Err(AppError::Unavailable(
                "Archive circuit breaker is open".to_string(),
            )),
        }
    }

    /// Most recently fetched reports first.
    pub async fn list_reports(&self, limit: i64) -> Result<Vec<ProfileRecord>, AppError> {
        let limit = limit.clamp(1, MAX_ARCHIVE_PAGE);
        let rows = sqlx::query(
            "SELECT report FROM profile_reports ORDER BY last_fetched DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list archived reports")?;

        rows.iter()
            .map(|row| {
                row.try_get::<Json<ProfileRecord>, _>("report")
                    .map(|json| json.0)
                    .context("Failed to decode archived report")
            })
            .collect()
    }

    pub async fn get_report(&self, handle: &str) -> Result<Option<ProfileRecord>, AppError> {
        let row = sqlx::query("SELECT report FROM profile_reports WHERE handle = $1")
            .bind(handle)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to load archived report")?;

        row.map(|row| {
            row.try_get::<Json<ProfileRecord>, _>("report")
                .map(|json| json.0)
                .context("Failed to decode archived report")
        })
        .transpose()
    }

    /// Returns true if a row was deleted.
    pub async fn delete_report(&self, handle: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM profile_reports WHERE handle = $1")
            .bind(handle)
            .execute(&self.pool)
            .await
            .context("Failed to delete archived report")?;

        Ok(result.rows_affected() > 0)
    }
}
