use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Role;

/// Identity of whoever is calling an operation, resolved by the boundary
/// (HTTP auth middleware) before any domain code runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub kind: ActorKind,
    pub identity: String,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    User,
    Service,
}

impl Actor {
    pub fn user(identity: impl Into<String>, role: Role) -> Self {
        Self {
            kind: ActorKind::User,
            identity: identity.into(),
            role: Some(role),
        }
    }

    pub fn service(identity: impl Into<String>) -> Self {
        Self {
            kind: ActorKind::Service,
            identity: identity.into(),
            role: None,
        }
    }

    pub fn is_service(&self) -> bool {
        self.kind == ActorKind::Service
    }

    pub fn is_dev_admin(&self) -> bool {
        matches!(self.role, Some(Role::DevAdmin))
    }

    pub fn is_business_admin(&self) -> bool {
        matches!(self.role, Some(Role::BusinessAdmin) | Some(Role::DevAdmin))
    }

    /// The caller's user id, when this actor represents a user whose
    /// `identity` is their user id. `None` for service actors.
    pub fn user_id(&self) -> Option<Uuid> {
        if self.is_service() {
            return None;
        }
        self.identity.parse().ok()
    }
}
