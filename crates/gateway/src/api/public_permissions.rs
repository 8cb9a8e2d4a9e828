//! Public-permission admin endpoints over `PublicPermissionMaterializer`.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use cp_domain::types::RevokeMode;
use cp_domain::Error;

use super::permissions::parse_kind;
use crate::auth::ActorHeaders;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateBody {
    pub level: String,
    #[serde(default)]
    pub notes: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    ActorHeaders(actor): ActorHeaders,
    Path((kind, target_id)): Path<(String, String)>,
    Json(body): Json<CreateBody>,
) -> ApiResult<impl IntoResponse> {
    require_admin(&actor)?;
    let kind = parse_kind(&kind)?;
    let created_by = actor.user_id().ok_or(Error::Unauthorized)?;
    let (permission, users_granted) = state
        .public_permissions
        .create(kind, &target_id, &body.level, created_by, body.notes.as_deref())
        .await?;
    Ok(Json(serde_json::json!({ "permission": permission, "users_granted": users_granted })))
}

#[derive(Debug, Deserialize)]
pub struct RevokeBody {
    pub revoke_mode: RevokeMode,
}

pub async fn get_active(
    State(state): State<AppState>,
    Path((kind, target_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let kind = parse_kind(&kind)?;
    let history = state.public_permissions.history(kind, &target_id).await?;
    let active = history.into_iter().find(|p| p.is_active());
    Ok(Json(serde_json::json!({ "permission": active })))
}

/// Public-permission admin mutations are business_admin/dev_admin-only.
fn require_admin(actor: &cp_domain::Actor) -> ApiResult<()> {
    if actor.is_business_admin() || actor.is_dev_admin() {
        return Ok(());
    }
    Err(Error::Forbidden("public-permission administration requires an admin role".into()).into())
}

pub async fn revoke(
    State(state): State<AppState>,
    ActorHeaders(actor): ActorHeaders,
    Path((kind, target_id)): Path<(String, String)>,
    Json(body): Json<RevokeBody>,
) -> ApiResult<impl IntoResponse> {
    require_admin(&actor)?;
    let kind = parse_kind(&kind)?;
    state.public_permissions.revoke(kind, &target_id, body.revoke_mode).await?;
    Ok(Json(serde_json::json!({ "revoked": true })))
}

pub async fn reinvoke(
    State(state): State<AppState>,
    ActorHeaders(actor): ActorHeaders,
    Path((kind, target_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    require_admin(&actor)?;
    let kind = parse_kind(&kind)?;
    let permission = state.public_permissions.reinvoke(kind, &target_id).await?;
    Ok(Json(serde_json::json!({ "permission": permission })))
}

pub async fn backfill(
    State(state): State<AppState>,
    ActorHeaders(actor): ActorHeaders,
    Path((kind, target_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    require_admin(&actor)?;
    let kind = parse_kind(&kind)?;
    let users_granted = state.public_permissions.backfill(kind, &target_id).await?;
    Ok(Json(serde_json::json!({ "users_granted": users_granted })))
}

pub async fn history(
    State(state): State<AppState>,
    Path((kind, target_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let kind = parse_kind(&kind)?;
    let history = state.public_permissions.history(kind, &target_id).await?;
    Ok(Json(serde_json::json!({ "history": history })))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/public-permissions/:kind/:target_id", post(create).get(get_active))
        .route("/public-permissions/:kind/:target_id/revoke", post(revoke))
        .route("/public-permissions/:kind/:target_id/reinvoke", post(reinvoke))
        .route("/public-permissions/:kind/:target_id/backfill", post(backfill))
        .route("/public-permissions/:kind/:target_id/history", get(history))
}
