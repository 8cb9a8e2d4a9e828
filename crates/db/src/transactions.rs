//! Cross-table operations that must commit atomically, where the
//! per-store split elsewhere in this crate would otherwise issue them as
//! separate round trips.

use chrono::Utc;
use cp_domain::types::{Notification, Permission, ResourceKind};
use cp_domain::Result;
use uuid::Uuid;

use crate::error::map_sqlx_err;
use crate::notifications::{NotificationRow, NOTIF_COLUMNS};
use crate::permissions::{table as permission_table, PermissionRow};
use crate::pool::Db;

/// Accept a pending notification and apply the permission grant it
/// authorizes in a single transaction, so no observer can see an
/// `accepted` notification without the matching grant.
pub async fn accept_notification_with_grant(
    db: &Db,
    notification_id: Uuid,
    kind: ResourceKind,
    target_id: &str,
    recipient: Uuid,
    level: &str,
    granted_by: &str,
) -> Result<(Notification, Permission)> {
    let mut tx = db.begin().await.map_err(map_sqlx_err)?;

    let notif_row: NotificationRow = sqlx::query_as(&format!(
        "UPDATE notifications SET status = 'accepted', responded_at = $1, updated_at = now()
         WHERE id = $2 AND status = 'pending'
         RETURNING {NOTIF_COLUMNS}"
    ))
    .bind(Utc::now())
    .bind(notification_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(map_sqlx_err)?;

    let perm_sql = format!(
        "INSERT INTO {t} (target_id, user_id, level, granted_by)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (target_id, user_id) DO UPDATE SET
             level = EXCLUDED.level,
             granted_by = EXCLUDED.granted_by,
             updated_at = now()
         RETURNING target_id, user_id, level, granted_by, created_at, updated_at",
        t = permission_table(kind)
    );
    let perm_row: PermissionRow = sqlx::query_as(&perm_sql)
        .bind(target_id)
        .bind(recipient)
        .bind(level)
        .bind(granted_by)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

    tx.commit().await.map_err(map_sqlx_err)?;

    Ok((notif_row.into(), perm_row.into()))
}
