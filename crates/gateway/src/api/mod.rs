//! HTTP surface assembly: one module per capability, merged here and
//! gated behind the deployment bearer token.

pub mod assistants;
pub mod collections;
pub mod jobs;
pub mod mirror;
pub mod notifications;
pub mod permissions;
pub mod public_permissions;
pub mod users;

use axum::middleware;
use axum::routing::get;
use axum::Router;

use crate::auth::require_api_token;
use crate::state::AppState;

async fn health() -> &'static str {
    "ok"
}

/// Builds the full router. `state` is only consumed here to bind the
/// bearer-token middleware; the caller still supplies it to `with_state`
/// once the surrounding layers (CORS, tracing) are attached.
pub fn router(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .merge(users::routes())
        .merge(permissions::routes())
        .merge(public_permissions::routes())
        .merge(notifications::routes())
        .merge(collections::routes())
        .merge(jobs::routes())
        .merge(assistants::routes())
        .merge(mirror::routes())
        .route_layer(middleware::from_fn_with_state(state, require_api_token));

    Router::new().route("/health", get(health)).merge(protected)
}
