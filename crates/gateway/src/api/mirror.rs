//! Mirror sync admin endpoints over `MirrorSyncService`/`CacheStateStore`.
//!
//! `/sync/incremental` pages the global upstream assistant listing (no
//! `graph_id` filter), discovering graphs the mirror has never seen;
//! `/sync/full` re-pulls every already-known graph and additionally bumps
//! `cache_state.last_synced_at`. Both report the same `SyncSummary` shape.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::state::AppState;

const DEFAULT_INCREMENTAL_LIMIT: usize = 500;

#[derive(Debug, Deserialize)]
pub struct IncrementalQuery {
    pub limit: Option<usize>,
}

pub async fn sync_incremental(State(state): State<AppState>, Query(query): Query<IncrementalQuery>) -> ApiResult<impl IntoResponse> {
    let limit = query.limit.unwrap_or(DEFAULT_INCREMENTAL_LIMIT);
    let summary = state.mirror_sync.sync_incremental(limit).await?;
    Ok(Json(serde_json::json!({
        "updated": summary.updated,
        "unchanged": summary.unchanged,
        "errors": summary.errors,
    })))
}

pub async fn sync_full(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let summary = state.mirror_sync.full_sync().await?;
    state.stores.cache_state.set_last_synced(chrono::Utc::now()).await?;
    Ok(Json(serde_json::json!({
        "updated": summary.updated,
        "unchanged": summary.unchanged,
        "errors": summary.errors,
    })))
}

pub async fn sync_assistant(
    State(state): State<AppState>,
    Path(assistant_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let changed = state.mirror_sync.sync_one(assistant_id).await?;
    Ok(Json(serde_json::json!({ "changed": changed })))
}

pub async fn sync_graph(State(state): State<AppState>, Path(graph_id): Path<String>) -> ApiResult<impl IntoResponse> {
    let summary = state.mirror_sync.sync_graph(&graph_id).await?;
    Ok(Json(serde_json::json!({
        "updated": summary.updated,
        "unchanged": summary.unchanged,
        "errors": summary.errors,
    })))
}

/// `grace_days` is accepted for API-shape compatibility but not threaded
/// through -- the built service's grace horizon is fixed at construction
/// time from `MirrorConfig::grace_days`.
#[derive(Debug, Deserialize)]
pub struct CleanupBody {
    #[serde(default)]
    #[allow(dead_code)]
    pub grace_days: Option<i64>,
}

pub async fn cleanup(State(state): State<AppState>, Json(_body): Json<CleanupBody>) -> ApiResult<impl IntoResponse> {
    let cleaned = state.mirror_sync.cleanup_stale_mirrors().await?;
    Ok(Json(serde_json::json!({ "cleaned": cleaned })))
}

pub async fn cache_state(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let state_row = state.stores.cache_state.get().await?;
    Ok(Json(serde_json::json!({ "cache_state": state_row })))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sync/incremental", post(sync_incremental))
        .route("/sync/full", post(sync_full))
        .route("/sync/assistant/:id", post(sync_assistant))
        .route("/sync/graph/:graph_id", post(sync_graph))
        .route("/sync/cleanup", post(cleanup))
        .route("/cache-state", get(cache_state))
}
