//! `reqwest`-backed `Embedder` talking to a real embedding service, with a
//! timeout bounding every call (mirrors `cp_mirror::upstream::HttpUpstreamEngine`).

use std::time::Duration;

use cp_domain::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::embedder::Embedder;

#[derive(Serialize)]
struct EmbedRequest<'a> {
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

pub struct HttpEmbedder {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpEmbedder {
    pub fn new(base_url: String, timeout_ms: u64) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    async fn embed_request(&self, input: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/embed", self.base_url.trim_end_matches('/'));
        let response = tokio::time::timeout(self.timeout, self.client.post(&url).json(&EmbedRequest { input }).send())
            .await
            .map_err(|_| Error::Timeout("embed".to_string()))?
            .map_err(|e| Error::UpstreamFailure(e.to_string()))?;
        let body: EmbedResponse = response.json().await.map_err(|e| Error::UpstreamFailure(e.to_string()))?;
        Ok(body.embeddings)
    }
}

#[async_trait::async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_request(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| Error::UpstreamFailure("embedding service returned no vectors".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.embed_request(texts).await
    }
}
