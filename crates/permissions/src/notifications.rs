//! Notification Service.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use cp_db::{AssistantStore, Db, NotificationStore, PermissionStore};
use cp_domain::types::{Notification, NotificationStatus, NotificationType, ResourceKind};
use cp_domain::{Error, Result};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub enum AcceptOutcome {
    Granted {
        permission_level: String,
    },
    Guided {
        next_action: &'static str,
        related_graph_notification_id: Uuid,
    },
}

pub struct NotificationService {
    db: Db,
    notifications: Arc<NotificationStore>,
    permissions: Arc<PermissionStore>,
    assistants: Arc<AssistantStore>,
    default_expiry: Duration,
}

impl NotificationService {
    pub fn new(
        db: Db,
        notifications: Arc<NotificationStore>,
        permissions: Arc<PermissionStore>,
        assistants: Arc<AssistantStore>,
        default_expiry_seconds: i64,
    ) -> Self {
        Self {
            db,
            notifications,
            permissions,
            assistants,
            default_expiry: Duration::seconds(default_expiry_seconds),
        }
    }

    /// Idempotent on (recipient, resource, sender, pending): returns the
    /// existing row if an equivalent pending notification already exists.
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        sender_id: Uuid,
        sender_display_name: &str,
        recipient_id: Uuid,
        notification_type: NotificationType,
        resource_id: &str,
        resource_type: ResourceKind,
        permission_level: &str,
        resource_name: &str,
        resource_description: Option<&str>,
    ) -> Result<Notification> {
        let existing = self.notifications.list_for_recipient(recipient_id).await?;
        if let Some(duplicate) = find_pending_duplicate(&existing, sender_id, resource_id, notification_type, Utc::now()) {
            return Ok(duplicate);
        }

        let expires_at = Utc::now() + self.default_expiry;
        self.notifications
            .create(
                recipient_id,
                notification_type,
                resource_id,
                resource_type,
                permission_level,
                sender_id,
                sender_display_name,
                expires_at,
                resource_name,
                resource_description,
            )
            .await
    }

    pub async fn list(&self, recipient_id: Uuid, status: Option<NotificationStatus>) -> Result<Vec<Notification>> {
        let rows = self.notifications.list_for_recipient(recipient_id).await?;
        Ok(apply_listing_view(rows, status, Utc::now()))
    }

    pub async fn unread_count(&self, recipient_id: Uuid) -> Result<i64> {
        self.notifications.unread_count(recipient_id).await
    }

    /// Accept state machine. Applies the graph-first policy:
    /// an assistant-share acceptance with no existing graph access is
    /// "guided" rather than completed -- the original notification is left
    /// untouched and a sibling `graph_share` is surfaced (creating one if
    /// none is pending).
    pub async fn accept(&self, recipient_id: Uuid, notification_id: Uuid) -> Result<AcceptOutcome> {
        let notification = self.load_actionable(recipient_id, notification_id).await?;

        if notification.resource_type == ResourceKind::Assistant {
            let graph_id = self.assistant_graph_id(&notification).await?;
            let has_graph_access = self
                .permissions
                .get(ResourceKind::Graph, &graph_id, recipient_id)
                .await?
                .is_some();

            if !has_graph_access {
                let related = self
                    .find_or_create_guided_graph_share(&notification, &graph_id)
                    .await?;
                return Ok(AcceptOutcome::Guided {
                    next_action: "accept_graph",
                    related_graph_notification_id: related,
                });
            }
        }

        // Accept + grant commit together.
        cp_db::accept_notification_with_grant(
            &self.db,
            notification_id,
            notification.resource_type,
            &notification.resource_id,
            recipient_id,
            &notification.permission_level,
            &notification.sender_display_name,
        )
        .await?;

        Ok(AcceptOutcome::Granted {
            permission_level: notification.permission_level,
        })
    }

    pub async fn reject(&self, recipient_id: Uuid, notification_id: Uuid) -> Result<()> {
        let notification = self.load_actionable(recipient_id, notification_id).await?;
        self.notifications
            .set_status(notification.id, NotificationStatus::Rejected, Some(Utc::now()))
            .await
    }

    /// Sweeps `pending` rows whose `expires_at < now`. Cooperative:
    /// `list`/`is_effectively_expired` also catch these on read before the
    /// sweeper next runs.
    pub async fn expire_due(&self) -> Result<Vec<Notification>> {
        self.notifications.expire_due(Utc::now()).await
    }

    async fn load_actionable(&self, recipient_id: Uuid, notification_id: Uuid) -> Result<Notification> {
        let notification = self.notifications.get(notification_id).await?;
        if notification.recipient_id != recipient_id {
            return Err(Error::Forbidden("not the notification recipient".into()));
        }
        let now = Utc::now();
        if notification.is_effectively_expired(now) {
            return Err(Error::NotPending(notification.id.to_string()));
        }
        if notification.status != NotificationStatus::Pending {
            return Err(Error::NotPending(notification.id.to_string()));
        }
        Ok(notification)
    }

    /// Looks up the assistant's owning graph through the mirror's own
    /// assistant row rather than any field on the notification -- neither
    /// `resource_id` (the assistant's own id) nor `resource_description`
    /// (free-text, not populated with a graph id by any caller) can stand
    /// in for it.
    async fn assistant_graph_id(&self, notification: &Notification) -> Result<String> {
        let assistant_id = notification
            .resource_id
            .parse::<Uuid>()
            .map_err(|_| Error::Internal(format!("assistant notification resource_id is not a uuid: {}", notification.resource_id)))?;
        let assistant = self.assistants.get(assistant_id).await?;
        Ok(assistant.graph_id)
    }

    async fn find_or_create_guided_graph_share(
        &self,
        notification: &Notification,
        graph_id: &str,
    ) -> Result<Uuid> {
        let existing = self.notifications.list_for_recipient(notification.recipient_id).await?;
        if let Some(id) = find_pending_graph_share(&existing, notification.sender_id, graph_id) {
            return Ok(id);
        }

        let expires_at: DateTime<Utc> = Utc::now() + self.default_expiry;
        let created = self
            .notifications
            .create(
                notification.recipient_id,
                NotificationType::GraphShare,
                graph_id,
                ResourceKind::Graph,
                "access",
                notification.sender_id,
                &notification.sender_display_name,
                expires_at,
                graph_id,
                None,
            )
            .await?;
        Ok(created.id)
    }
}

/// An equivalent pending notification already exists for this
/// (recipient, sender, resource, type) tuple.
fn find_pending_duplicate(
    existing: &[Notification],
    sender_id: Uuid,
    resource_id: &str,
    notification_type: NotificationType,
    now: DateTime<Utc>,
) -> Option<Notification> {
    existing
        .iter()
        .find(|n| {
            n.status == NotificationStatus::Pending
                && n.resource_id == resource_id
                && n.sender_id == sender_id
                && n.notification_type == notification_type
                && !n.is_effectively_expired(now)
        })
        .cloned()
}

/// Applies expiry-on-read and the optional status filter a `list` caller
/// requested, without mutating the store.
fn apply_listing_view(mut rows: Vec<Notification>, status: Option<NotificationStatus>, now: DateTime<Utc>) -> Vec<Notification> {
    for row in rows.iter_mut() {
        if row.is_effectively_expired(now) {
            row.status = NotificationStatus::Expired;
        }
    }
    if let Some(status) = status {
        rows.retain(|n| n.status == status);
    }
    rows
}

/// An already-pending graph-share notification from the same sender for
/// `graph_id`, reused instead of creating a duplicate sibling.
fn find_pending_graph_share(existing: &[Notification], sender_id: Uuid, graph_id: &str) -> Option<Uuid> {
    existing
        .iter()
        .find(|n| {
            n.status == NotificationStatus::Pending
                && n.resource_type == ResourceKind::Graph
                && n.resource_id == graph_id
                && n.sender_id == sender_id
        })
        .map(|n| n.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn notification(status: NotificationStatus, resource_type: ResourceKind, resource_id: &str, sender_id: Uuid) -> Notification {
        let now = Utc::now();
        Notification {
            id: Uuid::new_v4(),
            recipient_id: Uuid::new_v4(),
            notification_type: match resource_type {
                ResourceKind::Graph => NotificationType::GraphShare,
                ResourceKind::Assistant => NotificationType::AssistantShare,
                ResourceKind::Collection => NotificationType::CollectionShare,
            },
            resource_id: resource_id.to_string(),
            resource_type,
            permission_level: "viewer".to_string(),
            sender_id,
            sender_display_name: "alice".to_string(),
            status,
            created_at: now,
            updated_at: now,
            responded_at: None,
            expires_at: now + ChronoDuration::days(7),
            resource_name: resource_id.to_string(),
            resource_description: None,
        }
    }

    #[test]
    fn find_pending_duplicate_matches_same_tuple() {
        let sender = Uuid::new_v4();
        let existing = notification(NotificationStatus::Pending, ResourceKind::Assistant, "a1", sender);
        let rows = vec![existing.clone()];
        let found = find_pending_duplicate(&rows, sender, "a1", NotificationType::AssistantShare, Utc::now());
        assert_eq!(found.unwrap().id, existing.id);
    }

    #[test]
    fn find_pending_duplicate_ignores_expired_rows() {
        let sender = Uuid::new_v4();
        let mut existing = notification(NotificationStatus::Pending, ResourceKind::Assistant, "a1", sender);
        existing.expires_at = Utc::now() - ChronoDuration::days(1);
        let rows = vec![existing];
        assert!(find_pending_duplicate(&rows, sender, "a1", NotificationType::AssistantShare, Utc::now()).is_none());
    }

    #[test]
    fn find_pending_duplicate_ignores_other_senders() {
        let rows = vec![notification(NotificationStatus::Pending, ResourceKind::Assistant, "a1", Uuid::new_v4())];
        assert!(find_pending_duplicate(&rows, Uuid::new_v4(), "a1", NotificationType::AssistantShare, Utc::now()).is_none());
    }

    #[test]
    fn apply_listing_view_marks_expired_on_read() {
        let sender = Uuid::new_v4();
        let mut stale = notification(NotificationStatus::Pending, ResourceKind::Graph, "g1", sender);
        stale.expires_at = Utc::now() - ChronoDuration::days(1);
        let rows = apply_listing_view(vec![stale], None, Utc::now());
        assert_eq!(rows[0].status, NotificationStatus::Expired);
    }

    #[test]
    fn apply_listing_view_filters_by_status() {
        let sender = Uuid::new_v4();
        let pending = notification(NotificationStatus::Pending, ResourceKind::Graph, "g1", sender);
        let accepted = notification(NotificationStatus::Accepted, ResourceKind::Graph, "g2", sender);
        let rows = apply_listing_view(vec![pending.clone(), accepted], Some(NotificationStatus::Pending), Utc::now());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, pending.id);
    }

    #[test]
    fn find_pending_graph_share_matches_sender_and_graph() {
        let sender = Uuid::new_v4();
        let existing = notification(NotificationStatus::Pending, ResourceKind::Graph, "g1", sender);
        let rows = vec![existing.clone()];
        assert_eq!(find_pending_graph_share(&rows, sender, "g1"), Some(existing.id));
        assert_eq!(find_pending_graph_share(&rows, sender, "g2"), None);
    }
}
