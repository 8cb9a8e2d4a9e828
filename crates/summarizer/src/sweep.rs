//! Background naming sweep: finds threads due for naming, summarizes
//! their conversation through the naming model, and writes the result
//! back unless the thread was renamed by its user in the meantime.

use std::sync::Arc;

use chrono::Utc;
use cp_db::{CacheStateStore, ThreadStore};
use cp_domain::config::NamingConfig;
use cp_domain::Result;
use cp_mirror::UpstreamEngine;
use tracing::{info, warn};

use crate::context::build_conversation;
use crate::llm::NamingModel;

#[derive(Debug, Default)]
pub struct SweepSummary {
    pub named: usize,
    pub skipped_user_renamed: usize,
    pub failed: usize,
}

pub struct ThreadSummarizer {
    threads: Arc<ThreadStore>,
    upstream: Arc<dyn UpstreamEngine>,
    model: Arc<dyn NamingModel>,
    cache_state: Arc<CacheStateStore>,
    config: NamingConfig,
}

impl ThreadSummarizer {
    pub fn new(threads: Arc<ThreadStore>, upstream: Arc<dyn UpstreamEngine>, model: Arc<dyn NamingModel>, cache_state: Arc<CacheStateStore>, config: NamingConfig) -> Self {
        Self {
            threads,
            upstream,
            model,
            cache_state,
            config,
        }
    }

    /// One pass over `naming_candidates`. Safe to call repeatedly from a
    /// scheduled loop; each thread is re-checked for `user_renamed` at
    /// write time so a race with a manual rename never clobbers it.
    pub async fn sweep(&self) -> Result<SweepSummary> {
        let mut summary = SweepSummary::default();
        if !self.config.enabled {
            return Ok(summary);
        }

        let candidates = self
            .threads
            .naming_candidates(self.config.min_interval_seconds, self.config.batch_limit as i64)
            .await?;

        for thread in candidates {
            match self.name_one(thread.thread_id).await {
                Ok(true) => summary.named += 1,
                Ok(false) => summary.skipped_user_renamed += 1,
                Err(e) => {
                    warn!(thread_id = %thread.thread_id, error = %e, "thread naming failed");
                    let _ = self.threads.touch_naming_failure(thread.thread_id, Utc::now()).await;
                    summary.failed += 1;
                }
            }
        }

        info!(named = summary.named, failed = summary.failed, "thread naming sweep complete");
        Ok(summary)
    }

    async fn name_one(&self, thread_id: uuid::Uuid) -> Result<bool> {
        let messages = self.upstream.thread_history(thread_id).await?;
        let conversation = build_conversation(&messages, self.config.token_budget);

        let naming = self.model.name_thread(&self.config.model, &conversation).await?;

        let applied = self
            .threads
            .apply_generated_name(thread_id, &naming.name, &naming.summary, Utc::now())
            .await?;
        if applied {
            self.cache_state.bump_threads().await?;
        }
        Ok(applied)
    }
}
