//! External collaborators for step 2 of the ingestion pipeline: document
//! conversion and video transcription.

use std::time::Duration;

use async_trait::async_trait;
use cp_domain::{Error, Result};

/// Converts a binary file or a fetched URL payload into plain/markdown text.
#[async_trait]
pub trait DocumentConverter: Send + Sync {
    async fn convert(&self, bytes: &[u8], content_type: &str) -> Result<String>;
}

/// Produces a transcript for a video URL. Implementations are expected to
/// wrap a single provider; primary/fallback composition lives in
/// `TranscriptService`.
#[async_trait]
pub trait TranscriptProvider: Send + Sync {
    async fn transcribe(&self, video_url: &str) -> Result<String>;
}

/// Tries `primary` first, falls back to `fallback` on any error, with a
/// timeout bounding each attempt.
pub struct TranscriptService {
    primary: Box<dyn TranscriptProvider>,
    fallback: Option<Box<dyn TranscriptProvider>>,
    timeout: Duration,
}

impl TranscriptService {
    pub fn new(primary: Box<dyn TranscriptProvider>, fallback: Option<Box<dyn TranscriptProvider>>, timeout: Duration) -> Self {
        Self {
            primary,
            fallback,
            timeout,
        }
    }

    pub async fn transcribe(&self, video_url: &str) -> Result<String> {
        match tokio::time::timeout(self.timeout, self.primary.transcribe(video_url)).await {
            Ok(Ok(text)) => return Ok(text),
            Ok(Err(_)) | Err(_) => {}
        }

        let Some(fallback) = &self.fallback else {
            return Err(Error::Timeout(format!("transcription timed out for {video_url}")));
        };

        match tokio::time::timeout(self.timeout, fallback.transcribe(video_url)).await {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(Error::Timeout(format!("transcription timed out for {video_url}"))),
        }
    }
}

/// Runs a `DocumentConverter` call under a timeout, turning an elapsed
/// deadline into the `Timeout` error kind.
pub async fn convert_with_timeout(converter: &dyn DocumentConverter, bytes: &[u8], content_type: &str, timeout: Duration) -> Result<String> {
    match tokio::time::timeout(timeout, converter.convert(bytes, content_type)).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout(format!("conversion timed out after {timeout:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Always(&'static str);

    #[async_trait]
    impl TranscriptProvider for Always {
        async fn transcribe(&self, _video_url: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct Fails;

    #[async_trait]
    impl TranscriptProvider for Fails {
        async fn transcribe(&self, _video_url: &str) -> Result<String> {
            Err(Error::UpstreamFailure("provider down".into()))
        }
    }

    #[tokio::test]
    async fn falls_back_when_primary_fails() {
        let service = TranscriptService::new(Box::new(Fails), Some(Box::new(Always("fallback text"))), Duration::from_secs(5));
        let text = service.transcribe("https://example.com/v").await.unwrap();
        assert_eq!(text, "fallback text");
    }

    #[tokio::test]
    async fn errors_when_no_fallback_available() {
        let service = TranscriptService::new(Box::new(Fails), None, Duration::from_secs(5));
        assert!(service.transcribe("https://example.com/v").await.is_err());
    }
}
