//! Job submission and status endpoints over `Scheduler`.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value as Json_;
use uuid::Uuid;

use cp_domain::types::{JobStatus, JobType, ResourceKind};
use cp_domain::Error;

use crate::auth::ActorHeaders;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SubmitJobBody {
    pub collection_id: Uuid,
    pub job_type: JobType,
    pub input_data: Json_,
    #[serde(default)]
    pub processing_options: Json_,
    #[serde(default)]
    pub estimated_seconds: Option<u32>,
}

pub async fn submit(
    State(state): State<AppState>,
    ActorHeaders(actor): ActorHeaders,
    Json(body): Json<SubmitJobBody>,
) -> ApiResult<impl IntoResponse> {
    let user_id = actor.user_id().ok_or(Error::Unauthorized)?;
    if !state
        .permissions
        .can_access(&actor, ResourceKind::Collection, &body.collection_id.to_string(), "editor")
        .await?
    {
        return Err(Error::Forbidden(format!("no editor access to collection {}", body.collection_id)).into());
    }

    let job = state
        .scheduler
        .submit(
            user_id,
            body.collection_id,
            body.job_type,
            body.input_data,
            body.processing_options,
            body.estimated_seconds,
        )
        .await?;
    Ok(Json(serde_json::json!({ "job": job })))
}

pub async fn get_job(
    State(state): State<AppState>,
    ActorHeaders(actor): ActorHeaders,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let job = state.stores.jobs.get(id).await?;
    state.scheduler.authorize(&actor, &job)?;
    Ok(Json(serde_json::json!({ "job": job })))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub status: Option<JobStatus>,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

pub async fn list(
    State(state): State<AppState>,
    ActorHeaders(actor): ActorHeaders,
    Query(query): Query<ListQuery>,
) -> ApiResult<impl IntoResponse> {
    let mut jobs = if actor.is_service() {
        state.stores.jobs.list_all(query.limit).await?
    } else {
        let user_id = actor.user_id().ok_or(Error::Unauthorized)?;
        state.stores.jobs.list_by_user(user_id, query.limit).await?
    };
    if let Some(status) = query.status {
        jobs.retain(|j| j.status == status);
    }
    Ok(Json(serde_json::json!({ "jobs": jobs })))
}

pub async fn cancel(
    State(state): State<AppState>,
    ActorHeaders(actor): ActorHeaders,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    state.scheduler.cancel(&actor, id).await?;
    Ok(Json(serde_json::json!({ "cancelled": true })))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/jobs", post(submit).get(list))
        .route("/jobs/:id", get(get_job))
        .route("/jobs/:id/cancel", post(cancel))
}
