//! `AppState` construction and background-task spawning, extracted from
//! `main.rs` to keep boot wiring separate from the binary entry point.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sha2::{Digest, Sha256};

use cp_collections::{CollectionWriter, HttpEmbedder, SearchService};
use cp_domain::config::Config;
use cp_ingestion::{ChunkingStrategy, HttpDocumentConverter, HttpTranscriptProvider, IngestJobExecutor, IngestPipeline, SizeClass, TranscriptService};
use cp_mirror::{HttpUpstreamEngine, MirrorSyncService, UpstreamEngine, VersionService};
use cp_permissions::{IdentityService, NotificationService, PermissionEngine, PublicPermissionMaterializer};
use cp_scheduler::{Scheduler, SchedulerConfig};
use cp_summarizer::{HttpNamingModel, ThreadSummarizer};

use crate::state::AppState;

pub async fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    let db = cp_db::connect(&config.database).await.context("connecting to the database")?;
    let stores = cp_db::Stores::new(db);
    tracing::info!("database connected, migrations applied");

    // ── Access control ────────────────────────────────────────────────
    let permissions = Arc::new(PermissionEngine::new(stores.permissions.clone(), stores.collections.clone()));
    let public_permissions = Arc::new(PublicPermissionMaterializer::new(
        stores.public_permissions.clone(),
        stores.permissions.clone(),
        stores.users.clone(),
        stores.assistants.clone(),
    ));
    let identity = Arc::new(IdentityService::new(stores.users.clone(), public_permissions.clone()));
    let notification_service = Arc::new(NotificationService::new(
        stores.db.clone(),
        stores.notifications.clone(),
        stores.permissions.clone(),
        stores.assistants.clone(),
        config.notifications.expiry_seconds,
    ));
    tracing::info!("access control ready");

    // ── Collections & search ──────────────────────────────────────────
    let embedder: Arc<dyn cp_collections::Embedder> = Arc::new(HttpEmbedder::new(config.external.embedding_url.clone(), config.external.embedding_timeout_ms));
    let search = Arc::new(SearchService::new(stores.chunks.clone(), stores.documents.clone(), embedder.clone(), permissions.clone()));
    let writer = Arc::new(CollectionWriter::new(stores.documents.clone(), stores.chunks.clone(), permissions.clone()));
    tracing::info!("collection store + search ready");

    // ── Ingestion pipeline & scheduler ────────────────────────────────
    let converter: Arc<dyn cp_ingestion::DocumentConverter> = Arc::new(HttpDocumentConverter::new(config.external.conversion_url.clone(), config.jobs.conversion_timeout_seconds * 1000));
    let transcript_primary: Box<dyn cp_ingestion::TranscriptProvider> = Box::new(HttpTranscriptProvider::new(config.external.transcript_url.clone(), config.jobs.conversion_timeout_seconds * 1000));
    let transcript_fallback: Option<Box<dyn cp_ingestion::TranscriptProvider>> = config
        .external
        .transcript_fallback_url
        .clone()
        .map(|url| Box::new(HttpTranscriptProvider::new(url, config.jobs.conversion_timeout_seconds * 1000)) as Box<dyn cp_ingestion::TranscriptProvider>);
    let transcripts = Arc::new(TranscriptService::new(
        transcript_primary,
        transcript_fallback,
        Duration::from_secs(config.jobs.conversion_timeout_seconds),
    ));

    let pipeline = IngestPipeline::new(
        stores.documents.clone(),
        writer.clone(),
        embedder,
        converter,
        transcripts,
        Duration::from_secs(config.jobs.conversion_timeout_seconds),
        ChunkingStrategy::Recursive,
        SizeClass::Medium,
    );
    let ingest_executor = Arc::new(IngestJobExecutor::new(pipeline, reqwest::Client::new()));
    let scheduler = Scheduler::new(
        stores.jobs.clone(),
        ingest_executor.clone(),
        SchedulerConfig {
            max_concurrent: config.jobs.max_concurrent_jobs,
        },
    );
    tracing::info!(max_concurrent = config.jobs.max_concurrent_jobs, "ingestion pipeline + scheduler ready");

    // ── Mirror, version history, thread naming ────────────────────────
    let upstream: Arc<dyn UpstreamEngine> = Arc::new(HttpUpstreamEngine::new(config.mirror.upstream_base_url.clone(), config.mirror.upstream_timeout_ms));
    let mirror_sync = Arc::new(MirrorSyncService::new(
        stores.graphs.clone(),
        stores.assistants.clone(),
        stores.cache_state.clone(),
        upstream.clone(),
        config.mirror.grace_days,
        config.mirror.page_size,
    ));
    let versions = Arc::new(VersionService::new(stores.assistant_versions.clone(), upstream.clone(), mirror_sync.clone()));
    let naming_model = Arc::new(HttpNamingModel::new(config.external.naming_url.clone(), config.mirror.upstream_timeout_ms));
    let summarizer = Arc::new(ThreadSummarizer::new(
        stores.threads.clone(),
        upstream.clone(),
        naming_model,
        stores.cache_state.clone(),
        config.naming.clone(),
    ));
    tracing::info!("mirror sync + version history + thread summarizer ready");

    let api_token_hash = read_api_token_hash();

    Ok(AppState {
        config,
        stores,
        permissions,
        identity,
        notifications: notification_service,
        public_permissions,
        search,
        writer,
        scheduler,
        ingest_executor,
        upstream,
        mirror_sync,
        versions,
        summarizer,
        api_token_hash,
    })
}

/// Reads `COLLAB_API_TOKEN` once at startup and hashes it for constant-time
/// comparison in `auth::require_api_token`. Unset or empty disables auth
/// (dev mode), matching the boundary's optional-gate contract.
fn read_api_token_hash() -> Option<Vec<u8>> {
    match std::env::var("COLLAB_API_TOKEN") {
        Ok(token) if !token.is_empty() => {
            tracing::info!("deployment bearer-token auth enabled");
            Some(Sha256::digest(token.as_bytes()).to_vec())
        }
        _ => {
            tracing::warn!("deployment bearer-token auth DISABLED -- set COLLAB_API_TOKEN to enable");
            None
        }
    }
}

/// Spawns the long-running background sweeps: job dispatch, notification
/// expiry, mirror cleanup, and thread naming.
pub fn spawn_background_tasks(state: &AppState) {
    {
        let scheduler = state.scheduler.clone();
        tokio::spawn(async move {
            scheduler.run().await;
        });
    }

    {
        let notifications = state.notifications.clone();
        let interval_secs = state.config.notifications.sweep_interval_seconds;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
            loop {
                interval.tick().await;
                match notifications.expire_due().await {
                    Ok(expired) if !expired.is_empty() => {
                        tracing::info!(count = expired.len(), "expired pending notifications");
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!(error = %e, "notification expiry sweep failed"),
                }
            }
        });
    }

    {
        let mirror_sync = state.mirror_sync.clone();
        let grace_days = state.config.mirror.grace_days;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(3_600));
            loop {
                interval.tick().await;
                match mirror_sync.cleanup_stale_mirrors().await {
                    Ok(0) => {}
                    Ok(n) => tracing::info!(removed = n, grace_days, "cleaned up stale mirror rows"),
                    Err(e) => tracing::warn!(error = %e, "mirror cleanup sweep failed"),
                }
            }
        });
    }

    {
        let summarizer = state.summarizer.clone();
        let interval_secs = state.config.notifications.sweep_interval_seconds;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
            loop {
                interval.tick().await;
                match summarizer.sweep().await {
                    Ok(summary) if summary.named > 0 || summary.failed > 0 => {
                        tracing::info!(named = summary.named, skipped = summary.skipped_user_renamed, failed = summary.failed, "thread naming sweep");
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!(error = %e, "thread naming sweep failed"),
                }
            }
        });
    }

    tracing::info!("background tasks spawned");
}
