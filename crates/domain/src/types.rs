//! Core entity and value types shared by every platform crate.
//!
//! Opaque blobs (`metadata`, `config`, JSON schemas, `result_data`) are
//! modeled as raw `serde_json::Value` and extracted at the edges via the
//! helpers at the bottom of this module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use uuid::Uuid;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Identity
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    BusinessAdmin,
    DevAdmin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: Role,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Permission levels
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Levels for graph permissions: `access` < `admin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphLevel {
    Access,
    Admin,
}

/// Levels for assistant permissions: `viewer` < `editor` < `owner`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssistantLevel {
    Viewer,
    Editor,
    Owner,
}

/// Levels for collection permissions: `viewer` < `editor` < `owner`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionLevel {
    Viewer,
    Editor,
    Owner,
}

/// The three resource kinds that carry a permission model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Graph,
    Assistant,
    Collection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub target_id: String,
    pub user_id: Uuid,
    pub level: String,
    pub granted_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevokeMode {
    FutureOnly,
    RevokeAll,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicPermission {
    pub target_id: String,
    pub resource_kind: ResourceKind,
    pub level: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revoke_mode: Option<RevokeMode>,
    pub notes: Option<String>,
}

impl PublicPermission {
    pub fn is_active(&self) -> bool {
        self.revoked_at.is_none()
    }
}

pub const SYSTEM_PUBLIC_GRANTOR: &str = "system:public";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Graph / Assistant / Schemas / Version
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Graph {
    pub graph_id: String,
    pub name: String,
    pub description: Option<String>,
    pub assistants_count: i64,
    pub schema_accessible: bool,
    pub mirror_hash: String,
    pub last_seen_at: DateTime<Utc>,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assistant {
    pub assistant_id: Uuid,
    pub graph_id: String,
    pub name: String,
    pub description: Option<String>,
    pub config: Json,
    pub metadata: Json,
    pub context: Json,
    pub version: i32,
    pub tags: Vec<String>,
    pub langgraph_created_at: DateTime<Utc>,
    pub langgraph_updated_at: DateTime<Utc>,
    pub mirror_hash: String,
    pub last_seen_at: DateTime<Utc>,
}

impl Assistant {
    /// True for the distinguished "graph template" assistant used to carry
    /// graph-level schemas. Hidden from user-facing listings.
    pub fn is_graph_template(&self) -> bool {
        self.metadata
            .get("created_by")
            .and_then(Json::as_str)
            .map(|v| v == "system")
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantSchemas {
    pub assistant_id: Uuid,
    pub input_schema: Json,
    pub config_schema: Json,
    pub state_schema: Json,
    pub schema_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantVersion {
    pub assistant_id: Uuid,
    pub version: i32,
    pub name: String,
    pub description: Option<String>,
    pub config: Json,
    pub metadata: Json,
    pub tags: Vec<String>,
    pub langgraph_created_at: DateTime<Utc>,
    pub commit_message: Option<String>,
    pub created_by: Option<Uuid>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Collection / Document / Chunk
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    pub id: Uuid,
    pub name: String,
    pub metadata: Json,
    pub owner_id: Uuid,
    pub table_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    File,
    Url,
    Youtube,
    Text,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub collection_id: Uuid,
    pub content: String,
    pub metadata: Json,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn content_hash(&self) -> Option<&str> {
        self.metadata.get("content_hash").and_then(Json::as_str)
    }

    pub fn original_filename(&self) -> Option<&str> {
        self.metadata
            .get("original_filename")
            .and_then(Json::as_str)
    }

    pub fn source_type(&self) -> Option<SourceType> {
        match self.metadata.get("source_type").and_then(Json::as_str) {
            Some("file") => Some(SourceType::File),
            Some("url") => Some(SourceType::Url),
            Some("youtube") => Some(SourceType::Youtube),
            Some("text") => Some(SourceType::Text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: Uuid,
    pub document_id: Option<Uuid>,
    pub collection_id: Uuid,
    pub content: String,
    pub embedding_vector: Vec<f32>,
    pub metadata: Json,
}

impl Chunk {
    pub fn chunk_index(&self) -> Option<i64> {
        self.metadata.get("chunk_index").and_then(Json::as_i64)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Notifications
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    GraphShare,
    AssistantShare,
    CollectionShare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Pending,
    Accepted,
    Rejected,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub notification_type: NotificationType,
    pub resource_id: String,
    pub resource_type: ResourceKind,
    pub permission_level: String,
    pub sender_id: Uuid,
    pub sender_display_name: String,
    pub status: NotificationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub resource_name: String,
    pub resource_description: Option<String>,
}

impl Notification {
    /// A `pending` row whose `expires_at` has passed must be treated as
    /// expired on read even before the sweeper runs.
    pub fn is_effectively_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == NotificationStatus::Pending && self.expires_at < now
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Threads
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub thread_id: Uuid,
    pub user_id: Uuid,
    pub name: Option<String>,
    pub summary: Option<String>,
    pub user_renamed: bool,
    pub needs_naming: bool,
    pub last_naming_at: Option<DateTime<Utc>>,
    pub last_message_at: DateTime<Utc>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Jobs
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Cancelled
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    FileIngest,
    UrlIngest,
    VideoIngest,
    TextIngest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub user_id: Uuid,
    pub collection_id: Uuid,
    pub job_type: JobType,
    pub status: JobStatus,
    pub input_data: Json,
    pub processing_options: Json,
    pub result_data: Option<Json>,
    pub progress_percent: u8,
    pub current_step: String,
    pub total_steps: Option<u32>,
    pub error_message: Option<String>,
    pub documents_processed: u32,
    pub chunks_created: u32,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub processing_time_seconds: Option<f64>,
    /// UI hint only; not authoritative.
    pub estimated_seconds: Option<u32>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Cache state
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct CacheState {
    pub graphs_version: i64,
    pub assistants_version: i64,
    pub schemas_version: i64,
    pub threads_version: i64,
    pub last_synced_at: Option<DateTime<Utc>>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Metadata extraction helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Reserved metadata key carrying tags end-to-end because the upstream
/// engine has no native tags field.
pub const TAGS_METADATA_KEY: &str = "_x_oap_tags";

/// Extract `metadata._x_oap_tags` as a `Vec<String>`, tolerating absence
/// or malformed entries (they're simply dropped).
pub fn extract_tags(metadata: &Json) -> Vec<String> {
    metadata
        .get(TAGS_METADATA_KEY)
        .and_then(Json::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(str::to_owned))
                .collect()
        })
        .unwrap_or_default()
}

/// Write `tags` back into `metadata._x_oap_tags`, keeping both
/// representations consistent.
pub fn set_tags(metadata: &mut Json, tags: &[String]) {
    if let Json::Object(map) = metadata {
        map.insert(
            TAGS_METADATA_KEY.to_string(),
            Json::Array(tags.iter().cloned().map(Json::String).collect()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn level_ordering() {
        assert!(GraphLevel::Access < GraphLevel::Admin);
        assert!(AssistantLevel::Viewer < AssistantLevel::Editor);
        assert!(AssistantLevel::Editor < AssistantLevel::Owner);
        assert!(CollectionLevel::Viewer < CollectionLevel::Owner);
    }

    #[test]
    fn tags_round_trip() {
        let mut metadata = json!({"created_by": "system"});
        set_tags(&mut metadata, &["a".into(), "b".into()]);
        assert_eq!(extract_tags(&metadata), vec!["a", "b"]);
    }

    #[test]
    fn tags_missing_is_empty() {
        assert!(extract_tags(&json!({})).is_empty());
    }

    #[test]
    fn graph_template_detection() {
        let mut assistant = sample_assistant();
        assert!(!assistant.is_graph_template());
        assistant.metadata = json!({"created_by": "system"});
        assert!(assistant.is_graph_template());
    }

    fn sample_assistant() -> Assistant {
        Assistant {
            assistant_id: Uuid::new_v4(),
            graph_id: "g1".into(),
            name: "a".into(),
            description: None,
            config: json!({}),
            metadata: json!({}),
            context: json!({}),
            version: 1,
            tags: vec![],
            langgraph_created_at: Utc::now(),
            langgraph_updated_at: Utc::now(),
            mirror_hash: String::new(),
            last_seen_at: Utc::now(),
        }
    }

    #[test]
    fn notification_effective_expiry() {
        let now = Utc::now();
        let mut n = Notification {
            id: Uuid::new_v4(),
            recipient_id: Uuid::new_v4(),
            notification_type: NotificationType::GraphShare,
            resource_id: "g1".into(),
            resource_type: ResourceKind::Graph,
            permission_level: "access".into(),
            sender_id: Uuid::new_v4(),
            sender_display_name: "Alice".into(),
            status: NotificationStatus::Pending,
            created_at: now,
            updated_at: now,
            responded_at: None,
            expires_at: now - chrono::Duration::seconds(1),
            resource_name: "Graph 1".into(),
            resource_description: None,
        };
        assert!(n.is_effectively_expired(now));
        n.status = NotificationStatus::Accepted;
        assert!(!n.is_effectively_expired(now));
    }
}
