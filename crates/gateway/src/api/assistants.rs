//! Read-only graph/assistant listing and version history/restore.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use cp_domain::types::ResourceKind;
use cp_domain::Error;
use cp_mirror::visibility::user_facing;

use crate::auth::ActorHeaders;
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list_graphs(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let graphs = state.stores.graphs.list_active().await?;
    Ok(Json(serde_json::json!({ "graphs": graphs })))
}

pub async fn get_graph(State(state): State<AppState>, Path(graph_id): Path<String>) -> ApiResult<impl IntoResponse> {
    let graph = state.stores.graphs.get(&graph_id).await?;
    Ok(Json(serde_json::json!({ "graph": graph })))
}

pub async fn list_assistants(
    State(state): State<AppState>,
    Path(graph_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let assistants = user_facing(state.stores.assistants.list_by_graph(&graph_id).await?);
    Ok(Json(serde_json::json!({ "assistants": assistants })))
}

pub async fn get_assistant(
    State(state): State<AppState>,
    Path(assistant_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let assistant = state.stores.assistants.get(assistant_id).await?;
    Ok(Json(serde_json::json!({ "assistant": assistant })))
}

pub async fn history(
    State(state): State<AppState>,
    ActorHeaders(actor): ActorHeaders,
    Path(assistant_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    if !state
        .permissions
        .can_access(&actor, ResourceKind::Assistant, &assistant_id.to_string(), "viewer")
        .await?
    {
        return Err(Error::Forbidden(format!("no access to assistant {assistant_id}")).into());
    }
    let versions = state.versions.history(assistant_id).await?;
    Ok(Json(serde_json::json!({ "versions": versions })))
}

#[derive(Debug, Deserialize)]
pub struct RestoreBody {
    pub version: i32,
    #[serde(default)]
    #[allow(dead_code)]
    pub commit_message: Option<String>,
}

pub async fn restore(
    State(state): State<AppState>,
    ActorHeaders(actor): ActorHeaders,
    Path(assistant_id): Path<Uuid>,
    Json(body): Json<RestoreBody>,
) -> ApiResult<impl IntoResponse> {
    if !state
        .permissions
        .can_access(&actor, ResourceKind::Assistant, &assistant_id.to_string(), "editor")
        .await?
    {
        return Err(Error::Forbidden(format!("no editor access to assistant {assistant_id}")).into());
    }
    let restored = state.versions.restore(assistant_id, body.version).await?;
    Ok(Json(serde_json::json!({ "version": restored })))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/graphs", get(list_graphs))
        .route("/graphs/:graph_id", get(get_graph))
        .route("/graphs/:graph_id/assistants", get(list_assistants))
        .route("/assistants/:assistant_id", get(get_assistant))
        .route("/assistants/:assistant_id/versions", get(history))
        .route("/assistants/:assistant_id/restore", post(restore))
}
