pub mod engine;
pub mod identity;
pub mod levels;
pub mod notifications;
pub mod public;

pub use engine::{GrantOutcome, PermissionEngine};
pub use identity::IdentityService;
pub use notifications::{AcceptOutcome, NotificationService};
pub use public::PublicPermissionMaterializer;
