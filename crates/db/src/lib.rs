pub mod assistants;
pub mod cache;
pub mod chunks;
pub mod collections;
pub mod documents;
pub mod error;
pub mod graphs;
pub mod jobs;
pub mod notifications;
pub mod permissions;
pub mod pool;
pub mod public_permissions;
pub mod threads;
pub mod transactions;
pub mod users;

pub use assistants::{AssistantStore, AssistantVersionStore};
pub use cache::CacheStateStore;
pub use chunks::ChunkStore;
pub use collections::CollectionStore;
pub use documents::DocumentStore;
pub use error::map_sqlx_err;
pub use graphs::GraphStore;
pub use jobs::JobStore;
pub use notifications::NotificationStore;
pub use permissions::PermissionStore;
pub use pool::{connect, Db};
pub use public_permissions::PublicPermissionStore;
pub use threads::ThreadStore;
pub use transactions::accept_notification_with_grant;
pub use users::UserStore;

/// All per-entity stores bundled together, built once from a single pool
/// in `bootstrap` and cloned (cheap: every store just wraps a `PgPool`)
/// into whichever domain-crate services need them.
#[derive(Clone)]
pub struct Stores {
    /// Kept alongside the per-entity stores for the handful of operations
    /// that must span tables in one transaction (see `transactions.rs`).
    pub db: Db,
    pub users: std::sync::Arc<UserStore>,
    pub graphs: std::sync::Arc<GraphStore>,
    pub assistants: std::sync::Arc<AssistantStore>,
    pub assistant_versions: std::sync::Arc<AssistantVersionStore>,
    pub permissions: std::sync::Arc<PermissionStore>,
    pub public_permissions: std::sync::Arc<PublicPermissionStore>,
    pub notifications: std::sync::Arc<NotificationStore>,
    pub collections: std::sync::Arc<CollectionStore>,
    pub documents: std::sync::Arc<DocumentStore>,
    pub chunks: std::sync::Arc<ChunkStore>,
    pub threads: std::sync::Arc<ThreadStore>,
    pub jobs: std::sync::Arc<JobStore>,
    pub cache_state: std::sync::Arc<CacheStateStore>,
}

impl Stores {
    pub fn new(db: Db) -> Self {
        Self {
            db: db.clone(),
            users: std::sync::Arc::new(UserStore::new(db.clone())),
            graphs: std::sync::Arc::new(GraphStore::new(db.clone())),
            assistants: std::sync::Arc::new(AssistantStore::new(db.clone())),
            assistant_versions: std::sync::Arc::new(AssistantVersionStore::new(db.clone())),
            permissions: std::sync::Arc::new(PermissionStore::new(db.clone())),
            public_permissions: std::sync::Arc::new(PublicPermissionStore::new(db.clone())),
            notifications: std::sync::Arc::new(NotificationStore::new(db.clone())),
            collections: std::sync::Arc::new(CollectionStore::new(db.clone())),
            documents: std::sync::Arc::new(DocumentStore::new(db.clone())),
            chunks: std::sync::Arc::new(ChunkStore::new(db.clone())),
            threads: std::sync::Arc::new(ThreadStore::new(db.clone())),
            jobs: std::sync::Arc::new(JobStore::new(db.clone())),
            cache_state: std::sync::Arc::new(CacheStateStore::new(db)),
        }
    }
}
