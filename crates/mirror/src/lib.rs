pub mod sync;
pub mod upstream;
pub mod versions;
pub mod visibility;

pub use sync::{MirrorSyncService, SyncSummary};
pub use upstream::{AssistantPatch, AssistantSearchQuery, HttpUpstreamEngine, ThreadMessage, UpstreamAssistant, UpstreamEngine, UpstreamSchemas};
pub use versions::VersionService;
pub use visibility::user_facing;
