use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::{migrate::Migrator, postgres::PgPoolOptions, types::Json, PgPool, Postgres, QueryBuilder};

use crate::{
    datastore::{ClaimOutcome, JobPatch, JobStore},
    BroadcastJob, JudgedWindow,
};

static MIGRATOR: Migrator = sqlx::migrate!();

const JOB_COLUMNS: &str = "id, external_id, title, stream_url, local_media_path, is_live_now, \
     capture_status, summary_status, summary_retry_count, summary_started_at, summary_error, \
     transcript_text, judged_windows, started_at";

#[derive(Debug, Clone)]
pub struct PgJobStore {
    pub pool: PgPool,
}

impl PgJobStore {
    /// Establish connection to database and run pending migrations.
    pub async fn init(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .inspect_err(
                |e| tracing::error!(error = ?e, "Failed to establish connection to database"),
            )
            .context("Failed to connect to postgres database")?;

        MIGRATOR
            .run(&pool)
            .await
            .inspect_err(|e| tracing::error!(error = ?e, "Failed to run database migrations"))
            .context("Failed to run database migrations")?;

        Ok(PgJobStore { pool })
    }
}

#[derive(sqlx::FromRow)]
struct JobRow {
    id: i64,
    external_id: String,
    title: Option<String>,
    stream_url: Option<String>,
    local_media_path: Option<String>,
    is_live_now: bool,
    capture_status: String,
    summary_status: Option<String>,
    summary_retry_count: i32,
    summary_started_at: Option<DateTime<Utc>>,
    summary_error: Option<String>,
    transcript_text: Option<String>,
    judged_windows: Json<Vec<JudgedWindow>>,
    started_at: DateTime<Utc>,
}

impl TryFrom<JobRow> for BroadcastJob {
    type Error = anyhow::Error;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        Ok(BroadcastJob {
            id: row.id,
            external_id: row.external_id,
            title: row.title,
            stream_url: row.stream_url,
            local_media_path: row.local_media_path,
            is_live_now: row.is_live_now,
            capture_status: row.capture_status.parse()?,
            summary_status: row.summary_status.as_deref().map(str::parse).transpose()?,
            summary_retry_count: row.summary_retry_count,
            summary_started_at: row.summary_started_at,
            summary_error: row.summary_error,
            transcript_text: row.transcript_text,
            judged_windows: row.judged_windows.0,
            started_at: row.started_at,
        })
    }
}

impl JobStore for PgJobStore {
    async fn find_live_jobs(&self) -> anyhow::Result<Vec<BroadcastJob>> {
        let rows = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {JOB_COLUMNS} FROM broadcast_jobs \
             WHERE is_live_now = TRUE AND external_id <> '' \
               AND stream_url IS NOT NULL AND stream_url <> ''"
        ))
        .fetch_all(&self.pool)
        .await
        .inspect_err(|e| tracing::error!(error = ?e, "Failed to fetch live jobs"))
        .context("Failed to fetch live jobs")?;

        rows.into_iter().map(BroadcastJob::try_from).collect()
    }

    async fn find_job(&self, external_id: &str) -> anyhow::Result<Option<BroadcastJob>> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {JOB_COLUMNS} FROM broadcast_jobs WHERE external_id = $1"
        ))
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await
        .inspect_err(|e| tracing::error!(error = ?e, external_id, "Failed to fetch job"))
        .context("Failed to fetch job")?;

        row.map(BroadcastJob::try_from).transpose()
    }

    async fn find_stuck_jobs(&self, cutoff: DateTime<Utc>) -> anyhow::Result<Vec<BroadcastJob>> {
        let rows = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {JOB_COLUMNS} FROM broadcast_jobs \
             WHERE summary_status = 'processing' AND summary_started_at < $1"
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .inspect_err(|e| tracing::error!(error = ?e, "Failed to fetch stuck jobs"))
        .context("Failed to fetch stuck jobs")?;

        rows.into_iter().map(BroadcastJob::try_from).collect()
    }

    async fn update_job(&self, id: i64, patch: JobPatch) -> anyhow::Result<bool> {
        if patch.is_empty() {
            return Ok(false);
        }

        let mut qb = QueryBuilder::<Postgres>::new("UPDATE broadcast_jobs SET ");
        let mut fields = qb.separated(", ");
        if let Some(status) = patch.capture_status {
            fields.push("capture_status = ");
            fields.push_bind_unseparated(status.as_str());
        }
        if let Some(status) = patch.summary_status {
            fields.push("summary_status = ");
            fields.push_bind_unseparated(status.as_str());
        }
        if let Some(count) = patch.summary_retry_count {
            fields.push("summary_retry_count = ");
            fields.push_bind_unseparated(count);
        }
        if let Some(message) = patch.summary_error {
            fields.push("summary_error = ");
            fields.push_bind_unseparated(message);
        }
        if let Some(text) = patch.transcript_text {
            fields.push("transcript_text = ");
            fields.push_bind_unseparated(text);
        }
        if let Some(windows) = patch.judged_windows {
            fields.push("judged_windows = ");
            fields.push_bind_unseparated(Json(windows));
        }
        if let Some(live) = patch.is_live_now {
            fields.push("is_live_now = ");
            fields.push_bind_unseparated(live);
        }
        qb.push(" WHERE id = ").push_bind(id);

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .inspect_err(|e| tracing::error!(error = ?e, job_id = id, "Failed to update job"))
            .context("Failed to update job")?;

        Ok(result.rows_affected() > 0)
    }

    async fn claim_next_summary_job(
        &self,
        max_retries: i32,
        now: DateTime<Utc>,
    ) -> anyhow::Result<ClaimOutcome> {
        // Single find-and-modify; SKIP LOCKED keeps concurrent claimers from
        // ever receiving the same job.
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "UPDATE broadcast_jobs SET \
                 summary_status = 'processing', \
                 summary_started_at = $2, \
                 summary_retry_count = summary_retry_count + 1 \
             WHERE id = ( \
                 SELECT id FROM broadcast_jobs \
                 WHERE capture_status = 'completed' \
                   AND (summary_status IS NULL OR summary_status = 'pending') \
                   AND summary_retry_count < $1 \
                 ORDER BY started_at ASC \
                 FOR UPDATE SKIP LOCKED \
                 LIMIT 1 \
             ) \
             RETURNING {JOB_COLUMNS}"
        ))
        .bind(max_retries)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .inspect_err(|e| tracing::error!(error = ?e, "Failed to claim summary job"))
        .context("Failed to claim summary job")?;

        match row {
            Some(row) => Ok(ClaimOutcome::Claimed(Box::new(row.try_into()?))),
            None => Ok(ClaimOutcome::NoneAvailable),
        }
    }
}
