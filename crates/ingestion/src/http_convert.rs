//! `reqwest`-backed `DocumentConverter`/`TranscriptProvider`, mirroring
//! `cp_mirror::upstream::HttpUpstreamEngine` and `cp_collections::HttpEmbedder`.

use std::time::Duration;

use cp_domain::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::convert::{DocumentConverter, TranscriptProvider};

#[derive(Serialize)]
struct ConvertRequest<'a> {
    content_type: &'a str,
    data: String,
}

#[derive(Deserialize)]
struct ConvertResponse {
    text: String,
}

pub struct HttpDocumentConverter {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpDocumentConverter {
    pub fn new(base_url: String, timeout_ms: u64) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            timeout: Duration::from_millis(timeout_ms),
        }
    }
}

#[async_trait::async_trait]
impl DocumentConverter for HttpDocumentConverter {
    async fn convert(&self, bytes: &[u8], content_type: &str) -> Result<String> {
        use base64::Engine;
        let url = format!("{}/convert", self.base_url.trim_end_matches('/'));
        let body = ConvertRequest {
            content_type,
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        };
        let response = tokio::time::timeout(self.timeout, self.client.post(&url).json(&body).send())
            .await
            .map_err(|_| Error::Timeout("conversion".to_string()))?
            .map_err(|e| Error::UpstreamFailure(e.to_string()))?;
        let parsed: ConvertResponse = response.json().await.map_err(|e| Error::UpstreamFailure(e.to_string()))?;
        Ok(parsed.text)
    }
}

#[derive(Serialize)]
struct TranscribeRequest<'a> {
    video_url: &'a str,
}

#[derive(Deserialize)]
struct TranscribeResponse {
    transcript: String,
}

pub struct HttpTranscriptProvider {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpTranscriptProvider {
    pub fn new(base_url: String, timeout_ms: u64) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            timeout: Duration::from_millis(timeout_ms),
        }
    }
}

#[async_trait::async_trait]
impl TranscriptProvider for HttpTranscriptProvider {
    async fn transcribe(&self, video_url: &str) -> Result<String> {
        let url = format!("{}/transcribe", self.base_url.trim_end_matches('/'));
        let response = tokio::time::timeout(self.timeout, self.client.post(&url).json(&TranscribeRequest { video_url }).send())
            .await
            .map_err(|_| Error::Timeout("transcription".to_string()))?
            .map_err(|e| Error::UpstreamFailure(e.to_string()))?;
        let parsed: TranscribeResponse = response.json().await.map_err(|e| Error::UpstreamFailure(e.to_string()))?;
        Ok(parsed.transcript)
    }
}
