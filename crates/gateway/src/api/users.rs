//! Identity endpoints, thin CRUD over `IdentityService`.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{post, put};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use cp_domain::types::Role;

use crate::auth::ActorHeaders;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateUserBody {
    pub email: String,
    pub display_name: String,
}

pub async fn create(State(state): State<AppState>, Json(body): Json<CreateUserBody>) -> ApiResult<impl IntoResponse> {
    let user = state.identity.create_user(&body.email, &body.display_name).await?;
    Ok(Json(serde_json::json!({ "user": user })))
}

pub async fn get_user(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<impl IntoResponse> {
    let user = state.identity.get(id).await?;
    Ok(Json(serde_json::json!({ "user": user })))
}

#[derive(Debug, Deserialize)]
pub struct FindQuery {
    pub email: Option<String>,
}

pub async fn list(State(state): State<AppState>, Query(query): Query<FindQuery>) -> ApiResult<impl IntoResponse> {
    if let Some(email) = query.email {
        let user = state.identity.find_by_email(&email).await?;
        return Ok(Json(serde_json::json!({ "user": user })));
    }
    let users = state.identity.list().await?;
    Ok(Json(serde_json::json!({ "users": users })))
}

#[derive(Debug, Deserialize)]
pub struct SetRoleBody {
    pub role: Role,
}

pub async fn set_role(
    State(state): State<AppState>,
    ActorHeaders(actor): ActorHeaders,
    Path(id): Path<Uuid>,
    Json(body): Json<SetRoleBody>,
) -> ApiResult<impl IntoResponse> {
    state.identity.set_role(&actor, id, body.role).await?;
    Ok(Json(serde_json::json!({ "updated": true })))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(create).get(list))
        .route("/users/:id", axum::routing::get(get_user))
        .route("/users/:id/role", put(set_role))
}
