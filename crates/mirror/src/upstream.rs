//! The upstream LangGraph-style engine is the external collaborator the
//! mirror and the thread summarizer read from and, for restores, write
//! back to.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cp_domain::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamAssistant {
    pub assistant_id: Uuid,
    pub graph_id: String,
    pub name: String,
    pub description: Option<String>,
    pub config: Json,
    pub metadata: Json,
    pub context: Json,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamSchemas {
    pub input_schema: Json,
    pub config_schema: Json,
    pub state_schema: Json,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AssistantSearchQuery {
    pub graph_id: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Fields a restore (or any other writer) may PATCH upstream; `None`
/// leaves the upstream field untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AssistantPatch {
    pub name: Option<String>,
    pub config: Option<Json>,
    pub description: Option<String>,
    pub metadata: Option<Json>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ThreadMessage {
    pub role: String,
    /// A string or an array of typed content blocks; the summarizer
    /// extracts text-only content from either shape.
    pub content: Json,
}

#[async_trait]
pub trait UpstreamEngine: Send + Sync {
    async fn get_assistant(&self, assistant_id: Uuid) -> Result<UpstreamAssistant>;
    async fn get_assistant_schemas(&self, assistant_id: Uuid) -> Result<UpstreamSchemas>;
    async fn search_assistants(&self, query: &AssistantSearchQuery) -> Result<Vec<UpstreamAssistant>>;
    async fn patch_assistant(&self, assistant_id: Uuid, patch: &AssistantPatch) -> Result<UpstreamAssistant>;
    async fn thread_history(&self, thread_id: Uuid) -> Result<Vec<ThreadMessage>>;
}

/// `reqwest`-backed implementation talking to the real upstream engine's
/// HTTP API, with a timeout bounding every call.
pub struct HttpUpstreamEngine {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpUpstreamEngine {
    pub fn new(base_url: String, timeout_ms: u64) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl UpstreamEngine for HttpUpstreamEngine {
    async fn get_assistant(&self, assistant_id: Uuid) -> Result<UpstreamAssistant> {
        let response = tokio::time::timeout(self.timeout, self.client.get(self.url(&format!("/assistants/{assistant_id}"))).send())
            .await
            .map_err(|_| Error::Timeout(format!("get_assistant {assistant_id}")))?
            .map_err(|e| Error::UpstreamFailure(e.to_string()))?;
        response.json().await.map_err(|e| Error::UpstreamFailure(e.to_string()))
    }

    async fn get_assistant_schemas(&self, assistant_id: Uuid) -> Result<UpstreamSchemas> {
        let response = tokio::time::timeout(
            self.timeout,
            self.client.get(self.url(&format!("/assistants/{assistant_id}/schemas"))).send(),
        )
        .await
        .map_err(|_| Error::Timeout(format!("get_assistant_schemas {assistant_id}")))?
        .map_err(|e| Error::UpstreamFailure(e.to_string()))?;
        response.json().await.map_err(|e| Error::UpstreamFailure(e.to_string()))
    }

    async fn search_assistants(&self, query: &AssistantSearchQuery) -> Result<Vec<UpstreamAssistant>> {
        let response = tokio::time::timeout(
            self.timeout,
            self.client.post(self.url("/assistants/search")).json(query).send(),
        )
        .await
        .map_err(|_| Error::Timeout("search_assistants".to_string()))?
        .map_err(|e| Error::UpstreamFailure(e.to_string()))?;
        response.json().await.map_err(|e| Error::UpstreamFailure(e.to_string()))
    }

    async fn patch_assistant(&self, assistant_id: Uuid, patch: &AssistantPatch) -> Result<UpstreamAssistant> {
        let response = tokio::time::timeout(
            self.timeout,
            self.client.patch(self.url(&format!("/assistants/{assistant_id}"))).json(patch).send(),
        )
        .await
        .map_err(|_| Error::Timeout(format!("patch_assistant {assistant_id}")))?
        .map_err(|e| Error::UpstreamFailure(e.to_string()))?;
        response.json().await.map_err(|e| Error::UpstreamFailure(e.to_string()))
    }

    async fn thread_history(&self, thread_id: Uuid) -> Result<Vec<ThreadMessage>> {
        let response = tokio::time::timeout(
            self.timeout,
            self.client.get(self.url(&format!("/threads/{thread_id}/history"))).send(),
        )
        .await
        .map_err(|_| Error::Timeout(format!("thread_history {thread_id}")))?
        .map_err(|e| Error::UpstreamFailure(e.to_string()))?;
        response.json().await.map_err(|e| Error::UpstreamFailure(e.to_string()))
    }
}
