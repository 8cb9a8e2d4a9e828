//! Notification inbox endpoints over `NotificationService`.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use cp_domain::types::NotificationStatus;
use cp_domain::Error;

use cp_permissions::notifications::AcceptOutcome;

use crate::auth::ActorHeaders;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<NotificationStatus>,
}

pub async fn list(
    State(state): State<AppState>,
    ActorHeaders(actor): ActorHeaders,
    Query(query): Query<ListQuery>,
) -> ApiResult<impl IntoResponse> {
    let recipient_id = actor.user_id().ok_or(Error::Unauthorized)?;
    let notifications = state.notifications.list(recipient_id, query.status).await?;
    let pending_count = notifications
        .iter()
        .filter(|n| n.status == NotificationStatus::Pending)
        .count();
    Ok(Json(serde_json::json!({
        "total_count": notifications.len(),
        "pending_count": pending_count,
        "notifications": notifications,
    })))
}

pub async fn unread_count(State(state): State<AppState>, ActorHeaders(actor): ActorHeaders) -> ApiResult<impl IntoResponse> {
    let recipient_id = actor.user_id().ok_or(Error::Unauthorized)?;
    let unread_count = state.notifications.unread_count(recipient_id).await?;
    Ok(Json(serde_json::json!({ "unread_count": unread_count })))
}

pub async fn accept(
    State(state): State<AppState>,
    ActorHeaders(actor): ActorHeaders,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let recipient_id = actor.user_id().ok_or(Error::Unauthorized)?;
    let outcome = state.notifications.accept(recipient_id, id).await?;
    let body = match outcome {
        AcceptOutcome::Granted { permission_level } => serde_json::json!({
            "notification_id": id,
            "action": "accept",
            "success": true,
            "permission_granted": true,
            "permission_level": permission_level,
        }),
        AcceptOutcome::Guided { next_action, related_graph_notification_id } => serde_json::json!({
            "notification_id": id,
            "action": "accept",
            "success": false,
            "permission_granted": false,
            "requires_graph_first": true,
            "next_action": next_action,
            "related_graph_notification_id": related_graph_notification_id,
        }),
    };
    Ok(Json(body))
}

pub async fn reject(
    State(state): State<AppState>,
    ActorHeaders(actor): ActorHeaders,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let recipient_id = actor.user_id().ok_or(Error::Unauthorized)?;
    state.notifications.reject(recipient_id, id).await?;
    Ok(Json(serde_json::json!({
        "notification_id": id,
        "action": "reject",
        "success": true,
    })))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list))
        .route("/notifications/unread-count", get(unread_count))
        .route("/notifications/:id/accept", post(accept))
        .route("/notifications/:id/reject", post(reject))
}
