//! Public-Permission Materializer.

use std::sync::Arc;

use cp_db::{AssistantStore, PermissionStore, PublicPermissionStore, UserStore};
use cp_domain::types::{PublicPermission, ResourceKind, RevokeMode, SYSTEM_PUBLIC_GRANTOR};
use cp_domain::{Error, Result};
use uuid::Uuid;

use crate::levels::parse_level;

pub struct PublicPermissionMaterializer {
    public: Arc<PublicPermissionStore>,
    permissions: Arc<PermissionStore>,
    users: Arc<UserStore>,
    assistants: Arc<AssistantStore>,
}

impl PublicPermissionMaterializer {
    pub fn new(
        public: Arc<PublicPermissionStore>,
        permissions: Arc<PermissionStore>,
        users: Arc<UserStore>,
        assistants: Arc<AssistantStore>,
    ) -> Self {
        Self {
            public,
            permissions,
            users,
            assistants,
        }
    }

    /// Rejects if an active public row already exists; otherwise inserts
    /// one and fans out a skip-on-conflict grant to every existing user.
    pub async fn create(
        &self,
        kind: ResourceKind,
        target_id: &str,
        level: &str,
        created_by: Uuid,
        notes: Option<&str>,
    ) -> Result<(PublicPermission, u64)> {
        parse_level(kind, level)?;
        if self.public.get_active(kind, target_id).await?.is_some() {
            return Err(Error::Conflict(format!(
                "an active public permission already exists for {target_id}"
            )));
        }

        let row = self.public.create(kind, target_id, level, created_by, notes).await?;
        let users_granted = self.fanout(kind, target_id, level).await?;
        Ok((row, users_granted))
    }

    async fn fanout(&self, kind: ResourceKind, target_id: &str, level: &str) -> Result<u64> {
        let mut granted = 0u64;
        for user in self.users.list().await? {
            if self
                .permissions
                .grant_if_absent(kind, target_id, user.id, level, SYSTEM_PUBLIC_GRANTOR)
                .await?
            {
                granted += 1;
            }
        }
        Ok(granted)
    }

    /// `future_only` only marks the public row revoked; `revoke_all` also
    /// deletes every per-user row this materializer created. Calling
    /// `revoke_all` after an earlier `future_only` is allowed and performs
    /// only the per-user deletions (the "mode upgrade").
    /// Cascades: revoking a graph's public permission also revokes active
    /// public permissions on every assistant of that graph with the same
    /// mode.
    pub async fn revoke(&self, kind: ResourceKind, target_id: &str, mode: RevokeMode) -> Result<()> {
        self.public.revoke(kind, target_id, mode).await?;
        if mode == RevokeMode::RevokeAll {
            self.permissions.delete_system_public_grants(kind, target_id).await?;
        }

        if kind == ResourceKind::Graph {
            for assistant in self.assistants.list_by_graph(target_id).await? {
                let assistant_id = assistant.assistant_id.to_string();
                if self
                    .public
                    .get_active(ResourceKind::Assistant, &assistant_id)
                    .await?
                    .is_some()
                {
                    self.revoke_assistant_no_cascade(&assistant_id, mode).await?;
                }
            }
        }
        Ok(())
    }

    async fn revoke_assistant_no_cascade(&self, assistant_id: &str, mode: RevokeMode) -> Result<()> {
        self.public.revoke(ResourceKind::Assistant, assistant_id, mode).await?;
        if mode == RevokeMode::RevokeAll {
            self.permissions
                .delete_system_public_grants(ResourceKind::Assistant, assistant_id)
                .await?;
        }
        Ok(())
    }

    /// Reactivates the most recently revoked public row without
    /// re-running the fanout; callers invoke a backfill separately if
    /// they want existing users caught up.
    pub async fn reinvoke(&self, kind: ResourceKind, target_id: &str) -> Result<PublicPermission> {
        self.public.reactivate_latest(kind, target_id).await
    }

    /// Backfill fanout for a reactivated public permission, as a distinct
    /// step from `reinvoke`.
    pub async fn backfill(&self, kind: ResourceKind, target_id: &str) -> Result<u64> {
        let active = self
            .public
            .get_active(kind, target_id)
            .await?
            .ok_or_else(|| Error::NotFound(target_id.to_string()))?;
        self.fanout(kind, target_id, &active.level).await
    }

    pub async fn history(&self, kind: ResourceKind, target_id: &str) -> Result<Vec<PublicPermission>> {
        self.public.history(kind, target_id).await
    }

    /// Grant every currently active public permission (across all
    /// resource kinds) to a newly created user as `system:public`.
    pub async fn grant_all_active_to_user(&self, user_id: Uuid) -> Result<()> {
        for kind in [ResourceKind::Graph, ResourceKind::Assistant, ResourceKind::Collection] {
            for active in self.public.list_all_active(kind).await? {
                self.permissions
                    .grant_if_absent(kind, &active.target_id, user_id, &active.level, SYSTEM_PUBLIC_GRANTOR)
                    .await?;
            }
        }
        Ok(())
    }
}
