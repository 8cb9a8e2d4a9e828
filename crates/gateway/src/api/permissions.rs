//! Permission grant/revoke/list/level endpoints over `PermissionEngine`.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use cp_domain::types::{NotificationType, ResourceKind};
use cp_domain::Error;

use crate::auth::ActorHeaders;
use crate::error::ApiResult;
use crate::state::AppState;

/// `ResourceKind` has no `FromStr` -- its serde impl is only meant for JSON
/// bodies, so path segments are parsed by hand here.
pub fn parse_kind(raw: &str) -> ApiResult<ResourceKind> {
    match raw {
        "graph" => Ok(ResourceKind::Graph),
        "assistant" => Ok(ResourceKind::Assistant),
        "collection" => Ok(ResourceKind::Collection),
        other => Err(Error::InvalidInput(format!("unknown resource kind: {other}")).into()),
    }
}

#[derive(Debug, Deserialize)]
pub struct GrantBody {
    pub recipient: Uuid,
    pub level: String,
}

pub async fn grant(
    State(state): State<AppState>,
    ActorHeaders(actor): ActorHeaders,
    Path((kind, target_id)): Path<(String, String)>,
    Json(body): Json<GrantBody>,
) -> ApiResult<impl IntoResponse> {
    let kind = parse_kind(&kind)?;
    let (permission, outcome) = state
        .permissions
        .grant(&actor, kind, &target_id, body.recipient, &body.level)
        .await?;
    Ok(Json(serde_json::json!({ "permission": permission, "outcome": format!("{outcome:?}") })))
}

#[derive(Debug, Deserialize)]
pub struct ShareBody {
    pub recipient: Uuid,
    pub level: String,
}

/// Creates a pending share notification rather than granting directly --
/// the producer side of notification-mediated sharing. The recipient must
/// still call `accept` before the permission row exists.
pub async fn share(
    State(state): State<AppState>,
    ActorHeaders(actor): ActorHeaders,
    Path((kind, target_id)): Path<(String, String)>,
    Json(body): Json<ShareBody>,
) -> ApiResult<impl IntoResponse> {
    let kind = parse_kind(&kind)?;
    cp_permissions::levels::parse_level(kind, &body.level)?;
    state.permissions.require_manage_authority(&actor, kind, &target_id).await?;

    let sender_id = actor.user_id().ok_or(Error::Unauthorized)?;
    let sender = state.identity.get(sender_id).await?;
    let (resource_name, resource_description) = resource_display(&state, kind, &target_id).await?;

    let notification_type = match kind {
        ResourceKind::Graph => NotificationType::GraphShare,
        ResourceKind::Assistant => NotificationType::AssistantShare,
        ResourceKind::Collection => NotificationType::CollectionShare,
    };

    let notification = state
        .notifications
        .create(
            sender_id,
            &sender.display_name,
            body.recipient,
            notification_type,
            &target_id,
            kind,
            &body.level,
            &resource_name,
            resource_description.as_deref(),
        )
        .await?;

    Ok(Json(serde_json::json!({ "notification": notification })))
}

async fn resource_display(state: &AppState, kind: ResourceKind, target_id: &str) -> ApiResult<(String, Option<String>)> {
    match kind {
        ResourceKind::Graph => {
            let graph = state.stores.graphs.get(target_id).await?;
            Ok((graph.name, graph.description))
        }
        ResourceKind::Assistant => {
            let id = target_id
                .parse::<Uuid>()
                .map_err(|_| Error::InvalidInput(format!("invalid assistant id: {target_id}")))?;
            let assistant = state.stores.assistants.get(id).await?;
            Ok((assistant.name, assistant.description))
        }
        ResourceKind::Collection => {
            let id = target_id
                .parse::<Uuid>()
                .map_err(|_| Error::InvalidInput(format!("invalid collection id: {target_id}")))?;
            let collection = state.stores.collections.get(id).await?;
            let description = collection.metadata.get("description").and_then(|v| v.as_str()).map(str::to_string);
            Ok((collection.name, description))
        }
    }
}

pub async fn revoke(
    State(state): State<AppState>,
    ActorHeaders(actor): ActorHeaders,
    Path((kind, target_id, recipient)): Path<(String, String, Uuid)>,
) -> ApiResult<impl IntoResponse> {
    let kind = parse_kind(&kind)?;
    state.permissions.revoke(&actor, kind, &target_id, recipient).await?;
    Ok(Json(serde_json::json!({ "revoked": true })))
}

pub async fn list(
    State(state): State<AppState>,
    ActorHeaders(actor): ActorHeaders,
    Path((kind, target_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let kind = parse_kind(&kind)?;
    let permissions = state.permissions.list(&actor, kind, &target_id).await?;
    Ok(Json(serde_json::json!({ "permissions": permissions })))
}

pub async fn level(
    State(state): State<AppState>,
    ActorHeaders(actor): ActorHeaders,
    Path((kind, target_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let kind = parse_kind(&kind)?;
    let user_id = actor.user_id().ok_or(Error::Unauthorized)?;
    let level = state.permissions.level(user_id, kind, &target_id).await?;
    Ok(Json(serde_json::json!({ "level": level })))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/permissions/:kind/:target_id", post(grant).get(list))
        .route("/permissions/:kind/:target_id/share", post(share))
        .route("/permissions/:kind/:target_id/level", get(level))
        .route("/permissions/:kind/:target_id/:recipient", axum::routing::delete(revoke))
}
