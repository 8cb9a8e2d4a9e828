//! The naming model is an external collaborator; only its interface is
//! specified here.

use async_trait::async_trait;
use cp_domain::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ThreadNaming {
    pub name: String,
    pub summary: String,
}

#[async_trait]
pub trait NamingModel: Send + Sync {
    /// Produces a short name and summary from the (already trimmed)
    /// conversation text. `model` is the configured model identifier
    /// (`NAMING_MODEL`), passed through for providers that multiplex on it.
    async fn name_thread(&self, model: &str, conversation: &str) -> Result<ThreadNaming>;
}
