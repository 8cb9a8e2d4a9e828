/// Shared error type used across every platform crate.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("cannot remove the last owner of {0}")]
    LastOwner(String),

    #[error("notification is not pending: {0}")]
    NotPending(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("upstream failure: {0}")]
    UpstreamFailure(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
