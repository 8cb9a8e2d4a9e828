use cp_domain::types::{PublicPermission, ResourceKind, RevokeMode};
use cp_domain::Result;
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::map_sqlx_err;
use crate::pool::Db;

fn table(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Graph => "graph_public_permissions",
        ResourceKind::Assistant => "assistant_public_permissions",
        ResourceKind::Collection => "collection_public_permissions",
    }
}

fn revoke_mode_str(mode: RevokeMode) -> &'static str {
    match mode {
        RevokeMode::FutureOnly => "future_only",
        RevokeMode::RevokeAll => "revoke_all",
    }
}

fn parse_revoke_mode(s: Option<&str>) -> Option<RevokeMode> {
    match s {
        Some("future_only") => Some(RevokeMode::FutureOnly),
        Some("revoke_all") => Some(RevokeMode::RevokeAll),
        _ => None,
    }
}

#[derive(FromRow)]
struct PublicPermissionRow {
    target_id: String,
    level: String,
    created_by: Uuid,
    created_at: chrono::DateTime<chrono::Utc>,
    revoked_at: Option<chrono::DateTime<chrono::Utc>>,
    revoke_mode: Option<String>,
    notes: Option<String>,
}

impl PublicPermissionRow {
    fn into_domain(self, kind: ResourceKind) -> PublicPermission {
        PublicPermission {
            target_id: self.target_id,
            resource_kind: kind,
            level: self.level,
            created_by: self.created_by,
            created_at: self.created_at,
            revoked_at: self.revoked_at,
            revoke_mode: parse_revoke_mode(self.revoke_mode.as_deref()),
            notes: self.notes,
        }
    }
}

const PUBLIC_COLUMNS: &str = "target_id, level, created_by, created_at, revoked_at, revoke_mode, notes";

/// One active row per target is enforced by the partial unique index in
/// the migration, not in application code.
pub struct PublicPermissionStore {
    db: Db,
}

impl PublicPermissionStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn get_active(&self, kind: ResourceKind, target_id: &str) -> Result<Option<PublicPermission>> {
        let sql = format!(
            "SELECT {PUBLIC_COLUMNS} FROM {t} WHERE target_id = $1 AND revoked_at IS NULL",
            t = table(kind)
        );
        let row: Option<PublicPermissionRow> = sqlx::query_as(&sql)
            .bind(target_id)
            .fetch_optional(&self.db)
            .await
            .map_err(map_sqlx_err)?;
        Ok(row.map(|r| r.into_domain(kind)))
    }

    /// Create a new active public-permission row. Callers must revoke any
    /// existing active row first (the unique index rejects two actives at
    /// once) -- the engine crate decides whether that's an error or an
    /// implicit mode upgrade.
    pub async fn create(
        &self,
        kind: ResourceKind,
        target_id: &str,
        level: &str,
        created_by: Uuid,
        notes: Option<&str>,
    ) -> Result<PublicPermission> {
        let sql = format!(
            "INSERT INTO {t} (target_id, level, created_by, notes)
             VALUES ($1, $2, $3, $4)
             RETURNING {PUBLIC_COLUMNS}",
            t = table(kind)
        );
        let row: PublicPermissionRow = sqlx::query_as(&sql)
            .bind(target_id)
            .bind(level)
            .bind(created_by)
            .bind(notes)
            .fetch_one(&self.db)
            .await
            .map_err(map_sqlx_err)?;
        Ok(row.into_domain(kind))
    }

    pub async fn revoke(&self, kind: ResourceKind, target_id: &str, mode: RevokeMode) -> Result<()> {
        let sql = format!(
            "UPDATE {t} SET revoked_at = now(), revoke_mode = $1 WHERE target_id = $2 AND revoked_at IS NULL",
            t = table(kind)
        );
        sqlx::query(&sql)
            .bind(revoke_mode_str(mode))
            .bind(target_id)
            .execute(&self.db)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }

    /// All currently active public-permission rows for a kind, across
    /// every target -- used by the auto-grant-on-user-creation hook.
    pub async fn list_all_active(&self, kind: ResourceKind) -> Result<Vec<PublicPermission>> {
        let sql = format!(
            "SELECT {PUBLIC_COLUMNS} FROM {t} WHERE revoked_at IS NULL",
            t = table(kind)
        );
        let rows: Vec<PublicPermissionRow> = sqlx::query_as(&sql)
            .fetch_all(&self.db)
            .await
            .map_err(map_sqlx_err)?;
        Ok(rows.into_iter().map(|r| r.into_domain(kind)).collect())
    }

    /// Reactivate the most recently revoked row for a target without
    /// re-running the fanout.
    pub async fn reactivate_latest(&self, kind: ResourceKind, target_id: &str) -> Result<PublicPermission> {
        let sql = format!(
            "UPDATE {t} SET revoked_at = NULL, revoke_mode = NULL
             WHERE target_id = $1 AND id = (
                 SELECT id FROM {t} WHERE target_id = $1 ORDER BY created_at DESC LIMIT 1
             )
             RETURNING {PUBLIC_COLUMNS}",
            t = table(kind)
        );
        let row: PublicPermissionRow = sqlx::query_as(&sql)
            .bind(target_id)
            .fetch_one(&self.db)
            .await
            .map_err(map_sqlx_err)?;
        Ok(row.into_domain(kind))
    }

    pub async fn history(&self, kind: ResourceKind, target_id: &str) -> Result<Vec<PublicPermission>> {
        let sql = format!(
            "SELECT {PUBLIC_COLUMNS} FROM {t} WHERE target_id = $1 ORDER BY created_at DESC",
            t = table(kind)
        );
        let rows: Vec<PublicPermissionRow> = sqlx::query_as(&sql)
            .bind(target_id)
            .fetch_all(&self.db)
            .await
            .map_err(map_sqlx_err)?;
        Ok(rows.into_iter().map(|r| r.into_domain(kind)).collect())
    }
}
