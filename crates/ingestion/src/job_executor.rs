//! Wires the ingestion pipeline into the scheduler's `JobExecutor` seam:
//! parses a `Job`'s opaque `input_data` per its `job_type`, runs the
//! pipeline, and reports the outcome back in the scheduler's vocabulary.

use async_trait::async_trait;
use base64::Engine;
use cp_domain::types::{Job, JobType};
use cp_domain::{Actor, Error, Result};
use cp_scheduler::{JobExecutor, JobOutcome, ProgressReporter};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::pipeline::{IngestInput, IngestPipeline};

const SCHEDULER_ACTOR: &str = "system:ingestion-scheduler";

#[derive(Deserialize)]
struct FileJobInput {
    files: Vec<FileEntry>,
}

#[derive(Deserialize)]
struct FileEntry {
    original_filename: String,
    content_type: String,
    content_base64: String,
}

#[derive(Deserialize)]
struct UrlJobInput {
    urls: Vec<String>,
}

#[derive(Deserialize)]
struct VideoJobInput {
    video_urls: Vec<String>,
}

#[derive(Deserialize)]
struct TextJobInput {
    texts: Vec<TextEntry>,
}

#[derive(Deserialize)]
struct TextEntry {
    content: String,
    #[serde(default)]
    title: Option<String>,
}

pub struct IngestJobExecutor {
    pipeline: IngestPipeline,
    http: reqwest::Client,
}

impl IngestJobExecutor {
    pub fn new(pipeline: IngestPipeline, http: reqwest::Client) -> Self {
        Self { pipeline, http }
    }

    async fn build_inputs(&self, job: &Job) -> Result<Vec<IngestInput>> {
        match job.job_type {
            JobType::FileIngest => {
                let parsed: FileJobInput = serde_json::from_value(job.input_data.clone())
                    .map_err(|e| Error::InvalidInput(format!("bad file ingest payload: {e}")))?;
                parsed
                    .files
                    .into_iter()
                    .map(|f| {
                        let bytes = base64::engine::general_purpose::STANDARD
                            .decode(f.content_base64)
                            .map_err(|e| Error::InvalidInput(format!("bad base64 for {}: {e}", f.original_filename)))?;
                        Ok(IngestInput::File {
                            original_filename: f.original_filename,
                            bytes,
                            content_type: f.content_type,
                        })
                    })
                    .collect()
            }
            JobType::UrlIngest => {
                let parsed: UrlJobInput = serde_json::from_value(job.input_data.clone())
                    .map_err(|e| Error::InvalidInput(format!("bad url ingest payload: {e}")))?;
                let mut inputs = Vec::with_capacity(parsed.urls.len());
                for url in parsed.urls {
                    let response = self
                        .http
                        .get(&url)
                        .send()
                        .await
                        .map_err(|e| Error::UpstreamFailure(format!("fetching {url}: {e}")))?;
                    let content_type = response
                        .headers()
                        .get(reqwest::header::CONTENT_TYPE)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let bytes = response
                        .bytes()
                        .await
                        .map_err(|e| Error::UpstreamFailure(format!("reading {url}: {e}")))?
                        .to_vec();
                    inputs.push(IngestInput::Url {
                        canonical_url: url,
                        bytes,
                        content_type,
                    });
                }
                Ok(inputs)
            }
            JobType::VideoIngest => {
                let parsed: VideoJobInput = serde_json::from_value(job.input_data.clone())
                    .map_err(|e| Error::InvalidInput(format!("bad video ingest payload: {e}")))?;
                Ok(parsed
                    .video_urls
                    .into_iter()
                    .map(|canonical_url| IngestInput::Video { canonical_url })
                    .collect())
            }
            JobType::TextIngest => {
                let parsed: TextJobInput = serde_json::from_value(job.input_data.clone())
                    .map_err(|e| Error::InvalidInput(format!("bad text ingest payload: {e}")))?;
                Ok(parsed
                    .texts
                    .into_iter()
                    .map(|t| IngestInput::Text {
                        content: t.content,
                        title: t.title,
                    })
                    .collect())
            }
        }
    }
}

#[async_trait]
impl JobExecutor for IngestJobExecutor {
    async fn execute(&self, job: &Job, progress: ProgressReporter, _cancel: CancellationToken) -> Result<JobOutcome> {
        let inputs = self.build_inputs(job).await?;
        let total = inputs.len().max(1);
        let actor = Actor::service(SCHEDULER_ACTOR);

        let result = self
            .pipeline
            .ingest(&actor, job.collection_id, inputs, |done, total| {
                let percent = ((done as f64 / total.max(1) as f64) * 100.0) as u8;
                let progress = progress.clone();
                tokio::spawn(async move {
                    let _ = progress.report(percent.min(100), &format!("processing {done}/{total}")).await;
                });
            })
            .await?;

        let succeeded = result.any_succeeded();
        let failure_message = (!succeeded).then(|| {
            result
                .errors
                .first()
                .map(|(label, msg)| format!("{label}: {msg}"))
                .unwrap_or_else(|| "no documents survived ingestion".to_string())
        });

        Ok(JobOutcome {
            result_data: result.as_json(),
            documents_processed: result.documents_processed as u32,
            chunks_created: result.chunks_created as u32,
            succeeded,
            failure_message,
        })
    }
}
