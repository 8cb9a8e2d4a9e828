use cp_domain::types::{Permission, ResourceKind};
use cp_domain::Result;
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::map_sqlx_err;
use crate::pool::Db;

pub(crate) fn table(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Graph => "graph_permissions",
        ResourceKind::Assistant => "assistant_permissions",
        ResourceKind::Collection => "collection_permissions",
    }
}

#[derive(FromRow)]
pub(crate) struct PermissionRow {
    target_id: String,
    user_id: Uuid,
    level: String,
    granted_by: String,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<PermissionRow> for Permission {
    fn from(row: PermissionRow) -> Self {
        Permission {
            target_id: row.target_id,
            user_id: row.user_id,
            level: row.level,
            granted_by: row.granted_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Per-resource grant table. `target_id` is stored as text for graphs
/// (which use engine-assigned string IDs) and as a UUID's string form for
/// assistants/collections -- callers pass whatever `to_string()` form the
/// resource's own ID type produces.
pub struct PermissionStore {
    db: Db,
}

impl PermissionStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn grant(
        &self,
        kind: ResourceKind,
        target_id: &str,
        user_id: Uuid,
        level: &str,
        granted_by: &str,
    ) -> Result<Permission> {
        let sql = format!(
            "INSERT INTO {t} (target_id, user_id, level, granted_by)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (target_id, user_id) DO UPDATE SET
                 level = EXCLUDED.level,
                 granted_by = EXCLUDED.granted_by,
                 updated_at = now()
             RETURNING target_id, user_id, level, granted_by, created_at, updated_at",
            t = table(kind)
        );
        let row: PermissionRow = sqlx::query_as(&sql)
            .bind(target_id)
            .bind(user_id)
            .bind(level)
            .bind(granted_by)
            .fetch_one(&self.db)
            .await
            .map_err(map_sqlx_err)?;
        Ok(row.into())
    }

    /// Insert-only grant used by the public-permission fanout: existing
    /// rows (manual grants) are left untouched. Returns whether a new row was inserted.
    pub async fn grant_if_absent(
        &self,
        kind: ResourceKind,
        target_id: &str,
        user_id: Uuid,
        level: &str,
        granted_by: &str,
    ) -> Result<bool> {
        let sql = format!(
            "INSERT INTO {t} (target_id, user_id, level, granted_by)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (target_id, user_id) DO NOTHING",
            t = table(kind)
        );
        let result = sqlx::query(&sql)
            .bind(target_id)
            .bind(user_id)
            .bind(level)
            .bind(granted_by)
            .execute(&self.db)
            .await
            .map_err(map_sqlx_err)?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every grant made by the public-permission fanout for a
    /// target, used by `revoke_all`.
    pub async fn delete_system_public_grants(&self, kind: ResourceKind, target_id: &str) -> Result<u64> {
        let sql = format!(
            "DELETE FROM {t} WHERE target_id = $1 AND granted_by = $2",
            t = table(kind)
        );
        let result = sqlx::query(&sql)
            .bind(target_id)
            .bind(cp_domain::types::SYSTEM_PUBLIC_GRANTOR)
            .execute(&self.db)
            .await
            .map_err(map_sqlx_err)?;
        Ok(result.rows_affected())
    }

    pub async fn revoke(&self, kind: ResourceKind, target_id: &str, user_id: Uuid) -> Result<()> {
        let sql = format!("DELETE FROM {t} WHERE target_id = $1 AND user_id = $2", t = table(kind));
        sqlx::query(&sql)
            .bind(target_id)
            .bind(user_id)
            .execute(&self.db)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }

    pub async fn get(
        &self,
        kind: ResourceKind,
        target_id: &str,
        user_id: Uuid,
    ) -> Result<Option<Permission>> {
        let sql = format!(
            "SELECT target_id, user_id, level, granted_by, created_at, updated_at
             FROM {t} WHERE target_id = $1 AND user_id = $2",
            t = table(kind)
        );
        let row: Option<PermissionRow> = sqlx::query_as(&sql)
            .bind(target_id)
            .bind(user_id)
            .fetch_optional(&self.db)
            .await
            .map_err(map_sqlx_err)?;
        Ok(row.map(Into::into))
    }

    pub async fn list_for_target(&self, kind: ResourceKind, target_id: &str) -> Result<Vec<Permission>> {
        let sql = format!(
            "SELECT target_id, user_id, level, granted_by, created_at, updated_at
             FROM {t} WHERE target_id = $1",
            t = table(kind)
        );
        let rows: Vec<PermissionRow> = sqlx::query_as(&sql)
            .bind(target_id)
            .fetch_all(&self.db)
            .await
            .map_err(map_sqlx_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn list_for_user(&self, kind: ResourceKind, user_id: Uuid) -> Result<Vec<Permission>> {
        let sql = format!(
            "SELECT target_id, user_id, level, granted_by, created_at, updated_at
             FROM {t} WHERE user_id = $1",
            t = table(kind)
        );
        let rows: Vec<PermissionRow> = sqlx::query_as(&sql)
            .bind(user_id)
            .fetch_all(&self.db)
            .await
            .map_err(map_sqlx_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Count of `owner`-level grants, used by the last-owner guard before
    /// a revoke or downgrade on assistants/collections.
    pub async fn count_level(&self, kind: ResourceKind, target_id: &str, level: &str) -> Result<i64> {
        let sql = format!(
            "SELECT COUNT(*) FROM {t} WHERE target_id = $1 AND level = $2",
            t = table(kind)
        );
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(target_id)
            .bind(level)
            .fetch_one(&self.db)
            .await
            .map_err(map_sqlx_err)?;
        Ok(count)
    }
}
