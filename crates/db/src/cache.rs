use chrono::{DateTime, Utc};
use cp_domain::types::CacheState;
use cp_domain::Result;
use sqlx::FromRow;

use crate::error::map_sqlx_err;
use crate::pool::Db;

#[derive(FromRow)]
struct CacheStateRow {
    graphs_version: i64,
    assistants_version: i64,
    schemas_version: i64,
    threads_version: i64,
    last_synced_at: Option<DateTime<Utc>>,
}

impl From<CacheStateRow> for CacheState {
    fn from(row: CacheStateRow) -> Self {
        CacheState {
            graphs_version: row.graphs_version,
            assistants_version: row.assistants_version,
            schemas_version: row.schemas_version,
            threads_version: row.threads_version,
            last_synced_at: row.last_synced_at,
        }
    }
}

/// The single-row `cache_state` table. Consumers poll `get` for the
/// monotonic version counters a client uses to decide whether its local
/// cache of graphs/assistants/schemas/threads is stale.
pub struct CacheStateStore {
    db: Db,
}

impl CacheStateStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn get(&self) -> Result<CacheState> {
        let row: CacheStateRow = sqlx::query_as(
            "SELECT graphs_version, assistants_version, schemas_version, threads_version, last_synced_at
             FROM cache_state",
        )
        .fetch_one(&self.db)
        .await
        .map_err(map_sqlx_err)?;
        Ok(row.into())
    }

    pub async fn bump_graphs(&self) -> Result<()> {
        sqlx::query("UPDATE cache_state SET graphs_version = graphs_version + 1")
            .execute(&self.db)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }

    pub async fn bump_assistants(&self) -> Result<()> {
        sqlx::query("UPDATE cache_state SET assistants_version = assistants_version + 1")
            .execute(&self.db)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }

    pub async fn bump_schemas(&self) -> Result<()> {
        sqlx::query("UPDATE cache_state SET schemas_version = schemas_version + 1")
            .execute(&self.db)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }

    pub async fn bump_threads(&self) -> Result<()> {
        sqlx::query("UPDATE cache_state SET threads_version = threads_version + 1")
            .execute(&self.db)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }

    pub async fn set_last_synced(&self, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE cache_state SET last_synced_at = $1")
            .bind(at)
            .execute(&self.db)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }
}
