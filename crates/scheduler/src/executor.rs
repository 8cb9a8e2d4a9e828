//! The executor seam: the scheduler knows how to run *a* job with bounded
//! concurrency and cancellation, but not what any particular `JobType`
//! means. Concrete dispatch (e.g. into the ingestion pipeline) lives
//! outside this crate and is wired in via `JobExecutor`.

use std::sync::Arc;

use async_trait::async_trait;
use cp_db::JobStore;
use cp_domain::types::Job;
use cp_domain::Result;
use serde_json::Value as Json;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub struct JobOutcome {
    pub result_data: Json,
    pub documents_processed: u32,
    pub chunks_created: u32,
    /// A job with at least one surviving document completes even if some
    /// items failed; otherwise it fails.
    pub succeeded: bool,
    pub failure_message: Option<String>,
}

#[async_trait]
pub trait JobExecutor: Send + Sync {
    async fn execute(&self, job: &Job, progress: ProgressReporter, cancel: CancellationToken) -> Result<JobOutcome>;
}

/// Handed to an executor so it can push `current_step`/`progress_percent`
/// updates without holding a reference to the whole scheduler.
#[derive(Clone)]
pub struct ProgressReporter {
    jobs: Arc<JobStore>,
    job_id: Uuid,
}

impl ProgressReporter {
    pub fn new(jobs: Arc<JobStore>, job_id: Uuid) -> Self {
        Self { jobs, job_id }
    }

    pub async fn report(&self, percent: u8, step: &str) -> Result<()> {
        self.jobs.update_progress(self.job_id, percent, step).await
    }
}
