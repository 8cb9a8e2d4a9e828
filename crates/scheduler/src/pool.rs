//! Cooperative worker pool with bounded concurrency, an in-memory FIFO
//! queue backed by the persistent `Job` table, and per-job cancellation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use cp_db::JobStore;
use cp_domain::types::{Job, JobType};
use cp_domain::{Actor, Error, Result};
use parking_lot::Mutex;
use serde_json::Value as Json;
use tokio::sync::{Notify, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::executor::{JobExecutor, ProgressReporter};

pub struct SchedulerConfig {
    pub max_concurrent: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { max_concurrent: 3 }
    }
}

/// Owns the dispatch loop and the cancellation tokens for jobs currently
/// `processing`. Cheap to clone (everything behind `Arc`); intended to be
/// built once and shared with the HTTP layer for `submit`/`cancel` calls.
pub struct Scheduler {
    jobs: Arc<JobStore>,
    executor: Arc<dyn JobExecutor>,
    semaphore: Arc<Semaphore>,
    tokens: Mutex<HashMap<Uuid, CancellationToken>>,
    notify: Arc<Notify>,
    max_concurrent: usize,
}

impl Scheduler {
    pub fn new(jobs: Arc<JobStore>, executor: Arc<dyn JobExecutor>, config: SchedulerConfig) -> Arc<Self> {
        Arc::new(Self {
            jobs,
            executor,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent)),
            tokens: Mutex::new(HashMap::new()),
            notify: Arc::new(Notify::new()),
            max_concurrent: config.max_concurrent,
        })
    }

    /// Persist a `pending` Job row and wake the dispatcher. If no capacity
    /// is available the row's `current_step` is stamped with its queue
    /// position as a UI hint.
    #[allow(clippy::too_many_arguments)]
    pub async fn submit(
        &self,
        user_id: Uuid,
        collection_id: Uuid,
        job_type: JobType,
        input_data: Json,
        processing_options: Json,
        estimated_seconds: Option<u32>,
    ) -> Result<Job> {
        let job = self
            .jobs
            .create(user_id, collection_id, job_type, &input_data, &processing_options, estimated_seconds)
            .await?;

        if self.semaphore.available_permits() == 0 {
            let position = self.jobs.count_pending().await?;
            self.jobs
                .update_progress(job.id, 0, &format!("queued (position {position})"))
                .await?;
        }

        self.notify.notify_one();
        Ok(job)
    }

    /// Long-lived background loop: claims the next pending job whenever a
    /// worker slot is free, spawning it as an independent task. Intended
    /// to be started once via `tokio::spawn` at process startup.
    pub async fn run(self: Arc<Self>) {
        loop {
            let permit = match self.semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };

            match self.jobs.claim_next().await {
                Ok(Some(job)) => {
                    let scheduler = self.clone();
                    tokio::spawn(async move { scheduler.run_job(job, permit).await });
                }
                Ok(None) => {
                    drop(permit);
                    tokio::select! {
                        _ = self.notify.notified() => {}
                        _ = tokio::time::sleep(Duration::from_secs(5)) => {}
                    }
                }
                Err(e) => {
                    warn!(error = %e, "failed to claim next job");
                    drop(permit);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }

    async fn run_job(self: Arc<Self>, job: Job, permit: tokio::sync::OwnedSemaphorePermit) {
        let token = CancellationToken::new();
        self.tokens.lock().insert(job.id, token.clone());
        let progress = ProgressReporter::new(self.jobs.clone(), job.id);
        let started = Instant::now();

        let outcome = tokio::select! {
            _ = token.cancelled() => None,
            result = self.executor.execute(&job, progress, token.clone()) => Some(result),
        };

        match outcome {
            None => {
                info!(job_id = %job.id, "job cancelled during processing");
                if let Err(e) = self.jobs.cancel(job.id).await {
                    warn!(job_id = %job.id, error = %e, "failed to record cancellation");
                }
            }
            Some(Ok(outcome)) if outcome.succeeded => {
                if let Err(e) = self
                    .jobs
                    .complete(
                        job.id,
                        &outcome.result_data,
                        outcome.documents_processed,
                        outcome.chunks_created,
                        started.elapsed().as_secs_f64(),
                    )
                    .await
                {
                    warn!(job_id = %job.id, error = %e, "failed to record job completion");
                }
            }
            Some(Ok(outcome)) => {
                let message = outcome.failure_message.unwrap_or_else(|| "no documents survived ingestion".to_string());
                if let Err(e) = self.jobs.fail(job.id, &message).await {
                    warn!(job_id = %job.id, error = %e, "failed to record job failure");
                }
            }
            Some(Err(e)) => {
                if let Err(store_err) = self.jobs.fail(job.id, &e.to_string()).await {
                    warn!(job_id = %job.id, error = %store_err, "failed to record job failure");
                }
            }
        }

        self.tokens.lock().remove(&job.id);
        drop(permit);
        self.notify.notify_one();
    }

    /// A service actor may act on any job; a regular user only their own.
    pub fn authorize(&self, actor: &Actor, job: &Job) -> Result<()> {
        authorize_job_access(actor, job)
    }

    /// Pending jobs are cancelled immediately via the store; a processing
    /// job's cancellation token is signalled so the worker honors it at
    /// its next await point.
    pub async fn cancel(&self, actor: &Actor, job_id: Uuid) -> Result<()> {
        let job = self.jobs.get(job_id).await?;
        self.authorize(actor, &job)?;

        if let Some(token) = self.tokens.lock().get(&job_id).cloned() {
            token.cancel();
            return Ok(());
        }
        self.jobs.cancel(job_id).await?;
        Ok(())
    }

    pub fn capacity(&self) -> usize {
        self.max_concurrent
    }
}

/// A service actor may act on any job; a regular user only their own.
/// Pulled out of `Scheduler::authorize` as a free function so it's testable
/// without a live `JobStore`.
fn authorize_job_access(actor: &Actor, job: &Job) -> Result<()> {
    if actor.is_service() {
        return Ok(());
    }
    match actor.user_id() {
        Some(uid) if uid == job.user_id => Ok(()),
        _ => Err(Error::Forbidden("not the job owner".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use cp_domain::types::{JobStatus, JobType, Role};
    use serde_json::json;

    fn job(user_id: Uuid) -> Job {
        Job {
            id: Uuid::new_v4(),
            user_id,
            collection_id: Uuid::new_v4(),
            job_type: JobType::TextIngest,
            status: JobStatus::Pending,
            input_data: json!({}),
            processing_options: json!({}),
            result_data: None,
            progress_percent: 0,
            current_step: "queued".to_string(),
            total_steps: None,
            error_message: None,
            documents_processed: 0,
            chunks_created: 0,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            processing_time_seconds: None,
            estimated_seconds: None,
        }
    }

    #[test]
    fn service_actor_may_authorize_any_job() {
        let actor = Actor::service("worker");
        assert!(authorize_job_access(&actor, &job(Uuid::new_v4())).is_ok());
    }

    #[test]
    fn owning_user_may_authorize_their_job() {
        let owner = Uuid::new_v4();
        let actor = Actor::user(owner.to_string(), Role::User);
        assert!(authorize_job_access(&actor, &job(owner)).is_ok());
    }

    #[test]
    fn other_user_is_forbidden() {
        let actor = Actor::user(Uuid::new_v4().to_string(), Role::User);
        assert!(authorize_job_access(&actor, &job(Uuid::new_v4())).is_err());
    }

    #[test]
    fn service_actor_without_user_id_still_authorized() {
        let actor = Actor::service("cron");
        assert!(actor.user_id().is_none());
        assert!(authorize_job_access(&actor, &job(Uuid::new_v4())).is_ok());
    }
}
