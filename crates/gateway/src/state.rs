use std::sync::Arc;

use cp_domain::config::Config;
use cp_ingestion::IngestJobExecutor;
use cp_mirror::{MirrorSyncService, UpstreamEngine, VersionService};
use cp_permissions::{IdentityService, NotificationService, PermissionEngine, PublicPermissionMaterializer};
use cp_scheduler::Scheduler;
use cp_summarizer::ThreadSummarizer;

use cp_collections::{CollectionWriter, SearchService};

/// Shared application state passed to every handler.
///
/// Grouped by concern: access control, collections/search, the ingestion
/// pipeline and scheduler, and the mirror/version/summarizer trio.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub stores: cp_db::Stores,

    // Access control
    pub permissions: Arc<PermissionEngine>,
    pub identity: Arc<IdentityService>,
    pub notifications: Arc<NotificationService>,
    pub public_permissions: Arc<PublicPermissionMaterializer>,

    // Collections & search
    pub search: Arc<SearchService>,
    pub writer: Arc<CollectionWriter>,

    // Ingestion & scheduling
    pub scheduler: Arc<Scheduler>,
    #[allow(dead_code)]
    pub ingest_executor: Arc<IngestJobExecutor>,

    // Mirror, versions, thread naming
    pub upstream: Arc<dyn UpstreamEngine>,
    pub mirror_sync: Arc<MirrorSyncService>,
    pub versions: Arc<VersionService>,
    pub summarizer: Arc<ThreadSummarizer>,

    /// SHA-256 hash of the deployment bearer token, read once at startup.
    /// `None` means auth is disabled (dev mode).
    pub api_token_hash: Option<Vec<u8>>,
}
