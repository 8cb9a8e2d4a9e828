use cp_domain::Error;

/// Translate a raw `sqlx::Error` into the domain's closed error set.
///
/// Lives here rather than as a `From` impl on `cp_domain::Error` because
/// neither the trait nor the type is local to this crate (orphan rule) --
/// callers map explicitly with `.map_err(map_sqlx_err)`.
pub fn map_sqlx_err(err: sqlx::Error) -> Error {
    match err {
        sqlx::Error::RowNotFound => Error::NotFound("row not found".into()),
        sqlx::Error::Database(db_err) => {
            if db_err.is_unique_violation() {
                Error::Conflict(db_err.message().to_string())
            } else if db_err.is_foreign_key_violation() {
                Error::InvalidInput(db_err.message().to_string())
            } else {
                Error::Database(db_err.message().to_string())
            }
        }
        sqlx::Error::PoolTimedOut => Error::Timeout("database pool exhausted".into()),
        other => Error::Database(other.to_string()),
    }
}
