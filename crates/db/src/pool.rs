use std::time::Duration;

use cp_domain::config::DatabaseConfig;
use sqlx::postgres::{PgPool, PgPoolOptions};

/// Alias kept short because it shows up in nearly every store's
/// constructor signature across the domain crates.
pub type Db = PgPool;

/// Build a connection pool from config and run embedded migrations.
///
/// All fallible startup work lives in one async function that the
/// gateway's `bootstrap` awaits once.
pub async fn connect(config: &DatabaseConfig) -> Result<Db, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_millis(config.acquire_timeout_ms))
        .connect(&config.url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}
