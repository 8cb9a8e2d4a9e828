use chrono::{DateTime, Utc};
use cp_domain::types::{Job, JobStatus, JobType};
use cp_domain::Result;
use serde_json::Value as Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::map_sqlx_err;
use crate::pool::Db;

fn job_type_str(t: JobType) -> &'static str {
    match t {
        JobType::FileIngest => "file_ingest",
        JobType::UrlIngest => "url_ingest",
        JobType::VideoIngest => "video_ingest",
        JobType::TextIngest => "text_ingest",
    }
}

fn parse_job_type(s: &str) -> JobType {
    match s {
        "url_ingest" => JobType::UrlIngest,
        "video_ingest" => JobType::VideoIngest,
        "text_ingest" => JobType::TextIngest,
        _ => JobType::FileIngest,
    }
}

fn status_str(s: JobStatus) -> &'static str {
    match s {
        JobStatus::Pending => "pending",
        JobStatus::Processing => "processing",
        JobStatus::Completed => "completed",
        JobStatus::Failed => "failed",
        JobStatus::Cancelled => "cancelled",
    }
}

fn parse_status(s: &str) -> JobStatus {
    match s {
        "processing" => JobStatus::Processing,
        "completed" => JobStatus::Completed,
        "failed" => JobStatus::Failed,
        "cancelled" => JobStatus::Cancelled,
        _ => JobStatus::Pending,
    }
}

#[derive(FromRow)]
struct JobRow {
    id: Uuid,
    user_id: Uuid,
    collection_id: Uuid,
    job_type: String,
    status: String,
    input_data: Json,
    processing_options: Json,
    result_data: Option<Json>,
    progress_percent: i16,
    current_step: String,
    total_steps: Option<i32>,
    error_message: Option<String>,
    documents_processed: i32,
    chunks_created: i32,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    processing_time_seconds: Option<f64>,
    estimated_seconds: Option<i32>,
}

impl From<JobRow> for Job {
    fn from(row: JobRow) -> Self {
        Job {
            id: row.id,
            user_id: row.user_id,
            collection_id: row.collection_id,
            job_type: parse_job_type(&row.job_type),
            status: parse_status(&row.status),
            input_data: row.input_data,
            processing_options: row.processing_options,
            result_data: row.result_data,
            progress_percent: row.progress_percent.clamp(0, 100) as u8,
            current_step: row.current_step,
            total_steps: row.total_steps.map(|v| v as u32),
            error_message: row.error_message,
            documents_processed: row.documents_processed as u32,
            chunks_created: row.chunks_created as u32,
            created_at: row.created_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
            processing_time_seconds: row.processing_time_seconds,
            estimated_seconds: row.estimated_seconds.map(|v| v as u32),
        }
    }
}

const JOB_COLUMNS: &str = "id, user_id, collection_id, job_type, status, input_data, processing_options, result_data, progress_percent, current_step, total_steps, error_message, documents_processed, chunks_created, created_at, started_at, completed_at, processing_time_seconds, estimated_seconds";

pub struct JobStore {
    db: Db,
}

impl JobStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        collection_id: Uuid,
        job_type: JobType,
        input_data: &Json,
        processing_options: &Json,
        estimated_seconds: Option<u32>,
    ) -> Result<Job> {
        let row: JobRow = sqlx::query_as(&format!(
            "INSERT INTO jobs (user_id, collection_id, job_type, input_data, processing_options, estimated_seconds)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {JOB_COLUMNS}"
        ))
        .bind(user_id)
        .bind(collection_id)
        .bind(job_type_str(job_type))
        .bind(input_data)
        .bind(processing_options)
        .bind(estimated_seconds.map(|v| v as i32))
        .fetch_one(&self.db)
        .await
        .map_err(map_sqlx_err)?;
        Ok(row.into())
    }

    pub async fn get(&self, id: Uuid) -> Result<Job> {
        let row: JobRow = sqlx::query_as(&format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1"))
            .bind(id)
            .fetch_one(&self.db)
            .await
            .map_err(map_sqlx_err)?;
        Ok(row.into())
    }

    pub async fn list_by_user(&self, user_id: Uuid, limit: i64) -> Result<Vec<Job>> {
        let rows: Vec<JobRow> = sqlx::query_as(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2"
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.db)
        .await
        .map_err(map_sqlx_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Every job regardless of owner, for the service-principal admin
    /// override.
    pub async fn list_all(&self, limit: i64) -> Result<Vec<Job>> {
        let rows: Vec<JobRow> = sqlx::query_as(&format!("SELECT {JOB_COLUMNS} FROM jobs ORDER BY created_at DESC LIMIT $1"))
            .bind(limit)
            .fetch_all(&self.db)
            .await
            .map_err(map_sqlx_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Number of jobs still waiting for a worker slot, used to stamp
    /// `current_step` with a queue position at submission time.
    pub async fn count_pending(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT count(*) FROM jobs WHERE status = 'pending'")
            .fetch_one(&self.db)
            .await
            .map_err(map_sqlx_err)?;
        Ok(count)
    }

    /// Claim the next pending job in FIFO order for a worker slot. Uses
    /// `FOR UPDATE SKIP LOCKED` so concurrent workers never double-claim.
    pub async fn claim_next(&self) -> Result<Option<Job>> {
        let mut tx = self.db.begin().await.map_err(map_sqlx_err)?;
        let row: Option<JobRow> = sqlx::query_as(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE status = 'pending'
             ORDER BY created_at
             FOR UPDATE SKIP LOCKED
             LIMIT 1"
        ))
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        if let Some(ref job) = row {
            sqlx::query("UPDATE jobs SET status = 'processing', started_at = now(), current_step = 'starting' WHERE id = $1")
                .bind(job.id)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_err)?;
        }
        tx.commit().await.map_err(map_sqlx_err)?;
        Ok(row.map(Into::into))
    }

    pub async fn update_progress(&self, id: Uuid, percent: u8, current_step: &str) -> Result<()> {
        sqlx::query("UPDATE jobs SET progress_percent = $1, current_step = $2 WHERE id = $3")
            .bind(percent.min(100) as i16)
            .bind(current_step)
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn complete(
        &self,
        id: Uuid,
        result_data: &Json,
        documents_processed: u32,
        chunks_created: u32,
        processing_time_seconds: f64,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE jobs SET status = 'completed', progress_percent = 100, current_step = 'done',
                 result_data = $1, documents_processed = $2, chunks_created = $3,
                 processing_time_seconds = $4, completed_at = now()
             WHERE id = $5",
        )
        .bind(result_data)
        .bind(documents_processed as i32)
        .bind(chunks_created as i32)
        .bind(processing_time_seconds)
        .bind(id)
        .execute(&self.db)
        .await
        .map_err(map_sqlx_err)?;
        Ok(())
    }

    /// No retry semantics: a failed job stays failed.
    pub async fn fail(&self, id: Uuid, error_message: &str) -> Result<()> {
        sqlx::query(
            "UPDATE jobs SET status = 'failed', error_message = $1, completed_at = now() WHERE id = $2",
        )
        .bind(error_message)
        .bind(id)
        .execute(&self.db)
        .await
        .map_err(map_sqlx_err)?;
        Ok(())
    }

    /// Cancellation only applies to jobs not yet in a terminal state
    /// -- the caller is expected to check `is_terminal`
    /// first via `get`, this just enforces it at the SQL layer too.
    pub async fn cancel(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'cancelled', completed_at = now()
             WHERE id = $1 AND status IN ('pending', 'processing')",
        )
        .bind(id)
        .execute(&self.db)
        .await
        .map_err(map_sqlx_err)?;
        Ok(result.rows_affected() > 0)
    }
}
