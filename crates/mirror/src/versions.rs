//! Append-only assistant version history and restore.

use std::sync::Arc;

use cp_db::AssistantVersionStore;
use cp_domain::types::{set_tags, Assistant, AssistantVersion};
use cp_domain::Result;
use uuid::Uuid;

use crate::sync::MirrorSyncService;
use crate::upstream::{AssistantPatch, UpstreamEngine};

pub struct VersionService {
    versions: Arc<AssistantVersionStore>,
    upstream: Arc<dyn UpstreamEngine>,
    sync: Arc<MirrorSyncService>,
}

impl VersionService {
    pub fn new(versions: Arc<AssistantVersionStore>, upstream: Arc<dyn UpstreamEngine>, sync: Arc<MirrorSyncService>) -> Self {
        Self { versions, upstream, sync }
    }

    /// Snapshot an assistant's current live state as a new version row.
    /// Callers must have already confirmed `assistant.version` is the
    /// version number upstream just assigned.
    pub async fn record(&self, assistant: &Assistant, commit_message: Option<String>, created_by: Option<Uuid>) -> Result<AssistantVersion> {
        let version = AssistantVersion {
            assistant_id: assistant.assistant_id,
            version: assistant.version,
            name: assistant.name.clone(),
            description: assistant.description.clone(),
            config: assistant.config.clone(),
            metadata: assistant.metadata.clone(),
            tags: assistant.tags.clone(),
            langgraph_created_at: assistant.langgraph_created_at,
            commit_message,
            created_by,
        };
        self.versions.append(&version).await?;
        Ok(version)
    }

    pub async fn history(&self, assistant_id: Uuid) -> Result<Vec<AssistantVersion>> {
        self.versions.list(assistant_id).await
    }

    /// Restores `target_version`'s content: PATCHes upstream (which
    /// assigns a new version number rather than overwriting history),
    /// mirrors the response, and appends a local version row recording
    /// the restore.
    pub async fn restore(&self, assistant_id: Uuid, target_version: i32) -> Result<AssistantVersion> {
        let snapshot = self.versions.get(assistant_id, target_version).await?;
        let patch = restore_patch(&snapshot);
        let updated = self.upstream.patch_assistant(assistant_id, &patch).await?;
        self.sync.apply_assistant(updated.clone()).await?;

        let restored = AssistantVersion {
            assistant_id,
            version: updated.version,
            name: updated.name,
            description: updated.description,
            config: updated.config,
            metadata: updated.metadata,
            tags: snapshot.tags,
            langgraph_created_at: updated.created_at,
            commit_message: Some(format!("Restored from version {target_version}")),
            created_by: None,
        };
        self.versions.append(&restored).await?;
        Ok(restored)
    }

    pub async fn latest(&self, assistant_id: Uuid) -> Result<i32> {
        self.versions.latest_version(assistant_id).await
    }
}

/// Builds the upstream PATCH body that reinstates a snapshot's content.
/// Pulled out of `restore` so the mapping is testable without a live
/// upstream engine or store.
fn restore_patch(snapshot: &AssistantVersion) -> AssistantPatch {
    let mut metadata = snapshot.metadata.clone();
    set_tags(&mut metadata, &snapshot.tags);

    AssistantPatch {
        name: Some(snapshot.name.clone()),
        config: Some(snapshot.config.clone()),
        description: snapshot.description.clone(),
        metadata: Some(metadata),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cp_domain::types::extract_tags;
    use serde_json::json;

    fn version(tags: Vec<String>) -> AssistantVersion {
        AssistantVersion {
            assistant_id: Uuid::new_v4(),
            version: 3,
            name: "restored-name".to_string(),
            description: Some("restored-description".to_string()),
            config: json!({"k": "v"}),
            metadata: json!({}),
            tags,
            langgraph_created_at: chrono::Utc::now(),
            commit_message: None,
            created_by: None,
        }
    }

    #[test]
    fn restore_patch_carries_name_config_and_description() {
        let snapshot = version(vec![]);
        let patch = restore_patch(&snapshot);
        assert_eq!(patch.name.as_deref(), Some("restored-name"));
        assert_eq!(patch.description.as_deref(), Some("restored-description"));
        assert_eq!(patch.config, Some(json!({"k": "v"})));
    }

    #[test]
    fn restore_patch_reinstates_tags_into_metadata() {
        let snapshot = version(vec!["urgent".to_string(), "billing".to_string()]);
        let patch = restore_patch(&snapshot);
        let metadata = patch.metadata.expect("metadata set");
        assert_eq!(extract_tags(&metadata), vec!["urgent".to_string(), "billing".to_string()]);
    }
}
