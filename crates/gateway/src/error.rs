//! Maps `cp_domain::Error` onto HTTP status codes and a uniform JSON body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use cp_domain::Error;

pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            Error::Unauthorized => (StatusCode::UNAUTHORIZED, self.0.to_string()),
            Error::Forbidden(_) => (StatusCode::FORBIDDEN, self.0.to_string()),
            Error::NotFound(_) => (StatusCode::NOT_FOUND, self.0.to_string()),
            Error::Conflict(_) => (StatusCode::CONFLICT, self.0.to_string()),
            Error::InvalidInput(_) => (StatusCode::BAD_REQUEST, self.0.to_string()),
            Error::LastOwner(_) => (StatusCode::CONFLICT, self.0.to_string()),
            Error::NotPending(_) => (StatusCode::CONFLICT, self.0.to_string()),
            Error::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, self.0.to_string()),
            Error::UpstreamFailure(_) => (StatusCode::BAD_GATEWAY, self.0.to_string()),
            Error::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string()),
            Error::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string()),
        };

        if matches!(self.0, Error::Database(_) | Error::Internal(_)) {
            tracing::error!(error = %self.0, "request failed");
        }

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
