use chrono::{DateTime, Utc};
use cp_domain::types::{Notification, NotificationStatus, NotificationType, ResourceKind};
use cp_domain::Result;
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::map_sqlx_err;
use crate::pool::Db;

fn notif_type_str(t: NotificationType) -> &'static str {
    match t {
        NotificationType::GraphShare => "graph_share",
        NotificationType::AssistantShare => "assistant_share",
        NotificationType::CollectionShare => "collection_share",
    }
}

fn parse_notif_type(s: &str) -> NotificationType {
    match s {
        "assistant_share" => NotificationType::AssistantShare,
        "collection_share" => NotificationType::CollectionShare,
        _ => NotificationType::GraphShare,
    }
}

fn resource_kind_str(k: ResourceKind) -> &'static str {
    match k {
        ResourceKind::Graph => "graph",
        ResourceKind::Assistant => "assistant",
        ResourceKind::Collection => "collection",
    }
}

fn parse_resource_kind(s: &str) -> ResourceKind {
    match s {
        "assistant" => ResourceKind::Assistant,
        "collection" => ResourceKind::Collection,
        _ => ResourceKind::Graph,
    }
}

fn status_str(s: NotificationStatus) -> &'static str {
    match s {
        NotificationStatus::Pending => "pending",
        NotificationStatus::Accepted => "accepted",
        NotificationStatus::Rejected => "rejected",
        NotificationStatus::Expired => "expired",
    }
}

fn parse_status(s: &str) -> NotificationStatus {
    match s {
        "accepted" => NotificationStatus::Accepted,
        "rejected" => NotificationStatus::Rejected,
        "expired" => NotificationStatus::Expired,
        _ => NotificationStatus::Pending,
    }
}

#[derive(FromRow)]
pub(crate) struct NotificationRow {
    id: Uuid,
    recipient_id: Uuid,
    notification_type: String,
    resource_id: String,
    resource_type: String,
    permission_level: String,
    sender_id: Uuid,
    sender_display_name: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    responded_at: Option<DateTime<Utc>>,
    expires_at: DateTime<Utc>,
    resource_name: String,
    resource_description: Option<String>,
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        Notification {
            id: row.id,
            recipient_id: row.recipient_id,
            notification_type: parse_notif_type(&row.notification_type),
            resource_id: row.resource_id,
            resource_type: parse_resource_kind(&row.resource_type),
            permission_level: row.permission_level,
            sender_id: row.sender_id,
            sender_display_name: row.sender_display_name,
            status: parse_status(&row.status),
            created_at: row.created_at,
            updated_at: row.updated_at,
            responded_at: row.responded_at,
            expires_at: row.expires_at,
            resource_name: row.resource_name,
            resource_description: row.resource_description,
        }
    }
}

pub(crate) const NOTIF_COLUMNS: &str = "id, recipient_id, notification_type, resource_id, resource_type, permission_level, sender_id, sender_display_name, status, created_at, updated_at, responded_at, expires_at, resource_name, resource_description";

pub struct NotificationStore {
    db: Db,
}

impl NotificationStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        recipient_id: Uuid,
        notification_type: NotificationType,
        resource_id: &str,
        resource_type: ResourceKind,
        permission_level: &str,
        sender_id: Uuid,
        sender_display_name: &str,
        expires_at: DateTime<Utc>,
        resource_name: &str,
        resource_description: Option<&str>,
    ) -> Result<Notification> {
        let row: NotificationRow = sqlx::query_as(&format!(
            "INSERT INTO notifications (recipient_id, notification_type, resource_id, resource_type, permission_level, sender_id, sender_display_name, expires_at, resource_name, resource_description)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {NOTIF_COLUMNS}"
        ))
        .bind(recipient_id)
        .bind(notif_type_str(notification_type))
        .bind(resource_id)
        .bind(resource_kind_str(resource_type))
        .bind(permission_level)
        .bind(sender_id)
        .bind(sender_display_name)
        .bind(expires_at)
        .bind(resource_name)
        .bind(resource_description)
        .fetch_one(&self.db)
        .await
        .map_err(map_sqlx_err)?;
        Ok(row.into())
    }

    pub async fn get(&self, id: Uuid) -> Result<Notification> {
        let row: NotificationRow =
            sqlx::query_as(&format!("SELECT {NOTIF_COLUMNS} FROM notifications WHERE id = $1"))
                .bind(id)
                .fetch_one(&self.db)
                .await
                .map_err(map_sqlx_err)?;
        Ok(row.into())
    }

    pub async fn list_for_recipient(&self, recipient_id: Uuid) -> Result<Vec<Notification>> {
        let rows: Vec<NotificationRow> = sqlx::query_as(&format!(
            "SELECT {NOTIF_COLUMNS} FROM notifications WHERE recipient_id = $1 ORDER BY created_at DESC"
        ))
        .bind(recipient_id)
        .fetch_all(&self.db)
        .await
        .map_err(map_sqlx_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn unread_count(&self, recipient_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = $1 AND status = 'pending' AND expires_at > now()",
        )
        .bind(recipient_id)
        .fetch_one(&self.db)
        .await
        .map_err(map_sqlx_err)?;
        Ok(count)
    }

    pub async fn set_status(
        &self,
        id: Uuid,
        status: NotificationStatus,
        responded_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE notifications SET status = $1, responded_at = $2, updated_at = now() WHERE id = $3",
        )
        .bind(status_str(status))
        .bind(responded_at)
        .bind(id)
        .execute(&self.db)
        .await
        .map_err(map_sqlx_err)?;
        Ok(())
    }

    /// Sweep pending notifications whose `expires_at` has passed, flipping
    /// them to `expired`. Returns the affected rows so the mirror/cache
    /// layer can react if needed.
    pub async fn expire_due(&self, now: DateTime<Utc>) -> Result<Vec<Notification>> {
        let rows: Vec<NotificationRow> = sqlx::query_as(&format!(
            "UPDATE notifications SET status = 'expired', updated_at = now()
             WHERE status = 'pending' AND expires_at <= $1
             RETURNING {NOTIF_COLUMNS}"
        ))
        .bind(now)
        .fetch_all(&self.db)
        .await
        .map_err(map_sqlx_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
