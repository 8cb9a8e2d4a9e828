use chrono::{DateTime, Utc};
use cp_domain::types::Thread;
use cp_domain::Result;
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::map_sqlx_err;
use crate::pool::Db;

#[derive(FromRow)]
struct ThreadRow {
    thread_id: Uuid,
    user_id: Uuid,
    name: Option<String>,
    summary: Option<String>,
    user_renamed: bool,
    needs_naming: bool,
    last_naming_at: Option<DateTime<Utc>>,
    last_message_at: DateTime<Utc>,
}

impl From<ThreadRow> for Thread {
    fn from(row: ThreadRow) -> Self {
        Thread {
            thread_id: row.thread_id,
            user_id: row.user_id,
            name: row.name,
            summary: row.summary,
            user_renamed: row.user_renamed,
            needs_naming: row.needs_naming,
            last_naming_at: row.last_naming_at,
            last_message_at: row.last_message_at,
        }
    }
}

const THREAD_COLUMNS: &str = "thread_id, user_id, name, summary, user_renamed, needs_naming, last_naming_at, last_message_at";

pub struct ThreadStore {
    db: Db,
}

impl ThreadStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn upsert(&self, user_id: Uuid, thread_id: Uuid, last_message_at: DateTime<Utc>) -> Result<Thread> {
        let row: ThreadRow = sqlx::query_as(&format!(
            "INSERT INTO threads (thread_id, user_id, last_message_at)
             VALUES ($1, $2, $3)
             ON CONFLICT (thread_id) DO UPDATE SET
                 last_message_at = EXCLUDED.last_message_at,
                 needs_naming = CASE WHEN threads.user_renamed THEN false ELSE true END
             RETURNING {THREAD_COLUMNS}"
        ))
        .bind(thread_id)
        .bind(user_id)
        .bind(last_message_at)
        .fetch_one(&self.db)
        .await
        .map_err(map_sqlx_err)?;
        Ok(row.into())
    }

    pub async fn get(&self, thread_id: Uuid) -> Result<Thread> {
        let row: ThreadRow =
            sqlx::query_as(&format!("SELECT {THREAD_COLUMNS} FROM threads WHERE thread_id = $1"))
                .bind(thread_id)
                .fetch_one(&self.db)
                .await
                .map_err(map_sqlx_err)?;
        Ok(row.into())
    }

    /// Threads eligible for auto-naming: `needs_naming`, never
    /// user-renamed, and either never named or last named further back
    /// than `min_interval_seconds`.
    pub async fn naming_candidates(&self, min_interval_seconds: i64, batch_limit: i64) -> Result<Vec<Thread>> {
        let rows: Vec<ThreadRow> = sqlx::query_as(&format!(
            "SELECT {THREAD_COLUMNS} FROM threads
             WHERE needs_naming AND NOT user_renamed
               AND (last_naming_at IS NULL OR last_naming_at < now() - make_interval(secs => $1))
             ORDER BY last_message_at
             LIMIT $2"
        ))
        .bind(min_interval_seconds as f64)
        .bind(batch_limit)
        .fetch_all(&self.db)
        .await
        .map_err(map_sqlx_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Atomically set the generated name/summary and clear `needs_naming`.
    /// Never touches rows where `user_renamed = true`.
    pub async fn apply_generated_name(&self, thread_id: Uuid, name: &str, summary: &str, now: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE threads SET name = $1, summary = $2, needs_naming = false, last_naming_at = $3
             WHERE thread_id = $4 AND NOT user_renamed",
        )
        .bind(name)
        .bind(summary)
        .bind(now)
        .bind(thread_id)
        .execute(&self.db)
        .await
        .map_err(map_sqlx_err)?;
        Ok(result.rows_affected() > 0)
    }

    /// Throttle retries after a failed naming attempt without clearing
    /// `needs_naming`.
    pub async fn touch_naming_failure(&self, thread_id: Uuid, now: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE threads SET last_naming_at = $1 WHERE thread_id = $2 AND NOT user_renamed")
            .bind(now)
            .bind(thread_id)
            .execute(&self.db)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }

    pub async fn set_user_name(&self, thread_id: Uuid, name: &str) -> Result<()> {
        sqlx::query(
            "UPDATE threads SET name = $1, user_renamed = true, needs_naming = false WHERE thread_id = $2",
        )
        .bind(name)
        .bind(thread_id)
        .execute(&self.db)
        .await
        .map_err(map_sqlx_err)?;
        Ok(())
    }
}
