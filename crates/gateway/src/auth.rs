//! Actor resolution and the deployment-wide bearer-token gate.
//!
//! The authentication provider is treated as an external boundary: every
//! request arrives already attributed to an `Actor`. This gateway expects
//! that boundary to set two headers:
//!
//! - `X-Actor-Type: user|service`
//! - `X-Actor-Id: <uuid or service name>`
//! - `X-Actor-Role` (optional, user actors only): `user|business_admin|dev_admin`
//!
//! In front of that, `require_api_token` mirrors the coarse-grained
//! deployment secret pattern: a single bearer token read once at startup and
//! compared in constant time, gating the boundary itself from stray traffic.
//! If no token is configured the server runs in dev mode (unauthenticated).

use axum::async_trait;
use axum::body::Body;
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use cp_domain::types::Role;
use cp_domain::{Actor, ActorKind, Error};

use crate::error::ApiError;
use crate::state::AppState;

pub async fn require_api_token(State(state): State<AppState>, req: Request<Body>, next: Next) -> Response {
    let expected_hash = match &state.api_token_hash {
        Some(h) => h,
        None => return next.run(req).await,
    };

    let provided = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or("");

    let provided_hash = Sha256::digest(provided.as_bytes());
    if !bool::from(provided_hash.ct_eq(expected_hash.as_slice())) {
        return ApiError(Error::Unauthorized).into_response();
    }

    next.run(req).await
}

/// Extracts the caller's `Actor` from the boundary-set headers. Any handler
/// taking `ActorHeaders` as an argument gets `Unauthorized` for free if the
/// headers are absent or malformed.
pub struct ActorHeaders(pub Actor);

#[async_trait]
impl FromRequestParts<AppState> for ActorHeaders {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &AppState) -> Result<Self, Self::Rejection> {
        let header = |name: &str| parts.headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);

        let kind = header("x-actor-type").ok_or(Error::Unauthorized)?;
        let identity = header("x-actor-id").ok_or(Error::Unauthorized)?;

        let actor = match kind.as_str() {
            "service" => Actor::service(identity),
            "user" => {
                let role = match header("x-actor-role").as_deref() {
                    None | Some("user") => Role::User,
                    Some("business_admin") => Role::BusinessAdmin,
                    Some("dev_admin") => Role::DevAdmin,
                    Some(other) => return Err(Error::InvalidInput(format!("unknown actor role: {other}")).into()),
                };
                Actor::user(identity, role)
            }
            other => return Err(Error::InvalidInput(format!("unknown actor type: {other}")).into()),
        };

        Ok(ActorHeaders(actor))
    }
}

/// Re-exported for call sites that only need the kind enum for logging.
pub fn describe(actor: &Actor) -> &'static str {
    match actor.kind {
        ActorKind::User => "user",
        ActorKind::Service => "service",
    }
}
