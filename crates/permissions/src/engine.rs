//! Permission Engine.

use std::sync::Arc;

use cp_db::{CollectionStore, PermissionStore};
use cp_domain::types::{Permission, ResourceKind};
use cp_domain::{Actor, Error, Result};
use uuid::Uuid;

use crate::levels::{manage_level, parse_level, satisfies};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantOutcome {
    Created,
    Updated,
}

pub struct PermissionEngine {
    permissions: Arc<PermissionStore>,
    collections: Arc<CollectionStore>,
}

impl PermissionEngine {
    pub fn new(permissions: Arc<PermissionStore>, collections: Arc<CollectionStore>) -> Self {
        Self {
            permissions,
            collections,
        }
    }

    /// `dev_admin` always passes for graphs; otherwise an explicit
    /// permission row is required; collections additionally honor legacy
    /// owner metadata on the collection row itself.
    pub async fn can_access(
        &self,
        actor: &Actor,
        kind: ResourceKind,
        target_id: &str,
        required_level: &str,
    ) -> Result<bool> {
        if kind == ResourceKind::Graph && actor.is_dev_admin() {
            return Ok(true);
        }

        let Some(user_id) = actor.user_id() else {
            return Ok(actor.is_service());
        };

        if let Some(perm) = self.permissions.get(kind, target_id, user_id).await? {
            if satisfies(kind, &perm.level, required_level)? {
                return Ok(true);
            }
        }

        if kind == ResourceKind::Collection {
            if let Ok(collection_uuid) = target_id.parse::<Uuid>() {
                if let Ok(collection) = self.collections.get(collection_uuid).await {
                    if collection.owner_id == user_id {
                        return Ok(true);
                    }
                }
            }
        }

        Ok(false)
    }

    /// Requires the actor to hold manage authority (owner/admin) on
    /// `target`, or be `dev_admin`. Existing rows are upserted with
    /// `updated_at = now`; a recipient already at or above `level` is
    /// still upgraded to exactly `level` if it differs.
    pub async fn grant(
        &self,
        actor: &Actor,
        kind: ResourceKind,
        target_id: &str,
        recipient: Uuid,
        level: &str,
    ) -> Result<(Permission, GrantOutcome)> {
        parse_level(kind, level)?;
        self.require_manage_authority(actor, kind, target_id).await?;

        let granted_by = actor.identity.clone();
        let existed = self.permissions.get(kind, target_id, recipient).await?.is_some();
        let perm = self
            .permissions
            .grant(kind, target_id, recipient, level, &granted_by)
            .await?;
        Ok((
            perm,
            if existed {
                GrantOutcome::Updated
            } else {
                GrantOutcome::Created
            },
        ))
    }

    /// Rejects revoking the last remaining owner of an assistant or
    /// collection.
    pub async fn revoke(
        &self,
        actor: &Actor,
        kind: ResourceKind,
        target_id: &str,
        recipient: Uuid,
    ) -> Result<bool> {
        self.require_manage_authority(actor, kind, target_id).await?;

        if matches!(kind, ResourceKind::Assistant | ResourceKind::Collection) {
            if let Some(perm) = self.permissions.get(kind, target_id, recipient).await? {
                if perm.level == "owner" {
                    let owners = self.permissions.count_level(kind, target_id, "owner").await?;
                    if owners <= 1 {
                        return Err(Error::LastOwner(target_id.to_string()));
                    }
                }
            }
        }

        self.permissions.revoke(kind, target_id, recipient).await?;
        Ok(true)
    }

    pub async fn list(&self, actor: &Actor, kind: ResourceKind, target_id: &str) -> Result<Vec<Permission>> {
        self.require_manage_authority(actor, kind, target_id).await?;
        self.permissions.list_for_target(kind, target_id).await
    }

    pub async fn level(&self, user_id: Uuid, kind: ResourceKind, target_id: &str) -> Result<Option<String>> {
        if let Some(perm) = self.permissions.get(kind, target_id, user_id).await? {
            return Ok(Some(perm.level));
        }
        if kind == ResourceKind::Collection {
            if let Ok(collection_uuid) = target_id.parse::<Uuid>() {
                if let Ok(collection) = self.collections.get(collection_uuid).await {
                    if collection.owner_id == user_id {
                        return Ok(Some("owner".to_string()));
                    }
                }
            }
        }
        Ok(None)
    }

    /// Exposed so callers outside the engine (the share/invite endpoint)
    /// can gate on the same manage-authority check used internally by
    /// `grant`/`revoke`/`list` without duplicating the dev_admin/
    /// business_admin bypass.
    pub async fn require_manage_authority(&self, actor: &Actor, kind: ResourceKind, target_id: &str) -> Result<()> {
        if actor.is_dev_admin() || actor.is_business_admin() {
            return Ok(());
        }
        if self.can_access(actor, kind, target_id, manage_level(kind)).await? {
            return Ok(());
        }
        Err(Error::Forbidden(format!(
            "actor lacks manage authority on {target_id}"
        )))
    }
}
