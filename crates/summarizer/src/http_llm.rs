//! `reqwest`-backed `NamingModel`, mirroring `cp_mirror::upstream::HttpUpstreamEngine`
//! and `cp_collections::HttpEmbedder`.

use std::time::Duration;

use cp_domain::{Error, Result};
use serde::Serialize;

use crate::llm::{NamingModel, ThreadNaming};

#[derive(Serialize)]
struct NameRequest<'a> {
    model: &'a str,
    conversation: &'a str,
}

pub struct HttpNamingModel {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpNamingModel {
    pub fn new(base_url: String, timeout_ms: u64) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            timeout: Duration::from_millis(timeout_ms),
        }
    }
}

#[async_trait::async_trait]
impl NamingModel for HttpNamingModel {
    async fn name_thread(&self, model: &str, conversation: &str) -> Result<ThreadNaming> {
        let url = format!("{}/name", self.base_url.trim_end_matches('/'));
        let response = tokio::time::timeout(self.timeout, self.client.post(&url).json(&NameRequest { model, conversation }).send())
            .await
            .map_err(|_| Error::Timeout("naming".to_string()))?
            .map_err(|e| Error::UpstreamFailure(e.to_string()))?;
        response.json().await.map_err(|e| Error::UpstreamFailure(e.to_string()))
    }
}
