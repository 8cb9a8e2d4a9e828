//! Orchestration of the ingestion pipeline's four steps: duplicate
//! detection, conversion, chunking, embed-and-persist.

use std::sync::Arc;
use std::time::Duration;

use cp_collections::{CollectionWriter, Embedder, ChunkInput, UpsertDocument};
use cp_db::DocumentStore;
use cp_domain::hashing::sha256_hex;
use cp_domain::types::Document;
use cp_domain::{Actor, Result};
use serde_json::{json, Value as Json};
use uuid::Uuid;

use crate::chunking::{chunk_text, ChunkingStrategy, SizeClass};
use crate::convert::{DocumentConverter, TranscriptService};
use crate::dedupe::{classify_batch, Disposition, DuplicateReason};

/// One of the four input shapes the pipeline accepts.
pub enum IngestInput {
    File {
        original_filename: String,
        bytes: Vec<u8>,
        content_type: String,
    },
    Url {
        canonical_url: String,
        bytes: Vec<u8>,
        content_type: String,
    },
    Video {
        canonical_url: String,
    },
    Text {
        content: String,
        title: Option<String>,
    },
}

#[derive(Clone)]
pub enum IngestItemKind {
    File { original_filename: String },
    Url { canonical_url: String },
    Video { canonical_url: String },
    Text,
}

/// An `IngestInput` plus its precomputed content hash, ready for
/// duplicate classification.
pub struct IngestItem {
    pub kind: IngestItemKind,
    pub content_hash: String,
    input: IngestInput,
}

fn prepare(input: IngestInput) -> IngestItem {
    let (kind, hash_bytes): (IngestItemKind, Vec<u8>) = match &input {
        IngestInput::File {
            original_filename, bytes, ..
        } => (
            IngestItemKind::File {
                original_filename: original_filename.clone(),
            },
            bytes.clone(),
        ),
        IngestInput::Url { canonical_url, bytes, .. } => (
            IngestItemKind::Url {
                canonical_url: canonical_url.clone(),
            },
            bytes.clone(),
        ),
        IngestInput::Video { canonical_url } => (
            IngestItemKind::Video {
                canonical_url: canonical_url.clone(),
            },
            canonical_url.as_bytes().to_vec(),
        ),
        IngestInput::Text { content, .. } => (IngestItemKind::Text, content.as_bytes().to_vec()),
    };
    IngestItem {
        kind,
        content_hash: sha256_hex(&hash_bytes),
        input,
    }
}

pub struct SkippedItem {
    pub label: String,
    pub reason: DuplicateReason,
}

pub enum ItemOutcome {
    Processed { document_id: Uuid, chunk_count: usize },
    Overwritten { document_id: Uuid, chunk_count: usize },
    Failed { label: String, message: String },
}

pub struct IngestResult {
    pub documents_processed: usize,
    pub chunks_created: usize,
    pub skipped: Vec<SkippedItem>,
    pub overwritten: usize,
    pub errors: Vec<(String, String)>,
}

impl IngestResult {
    /// The job fails only if no document survived.
    pub fn any_succeeded(&self) -> bool {
        self.documents_processed > 0
    }

    pub fn as_json(&self) -> Json {
        json!({
            "documents_processed": self.documents_processed,
            "chunks_created": self.chunks_created,
            "overwritten": self.overwritten,
            "skipped_files": self.skipped.iter().map(|s| json!({"label": s.label, "reason": s.reason.as_str()})).collect::<Vec<_>>(),
            "errors": self.errors.iter().map(|(label, msg)| json!({"label": label, "message": msg})).collect::<Vec<_>>(),
        })
    }
}

pub struct IngestPipeline {
    documents: Arc<DocumentStore>,
    writer: Arc<CollectionWriter>,
    embedder: Arc<dyn Embedder>,
    converter: Arc<dyn DocumentConverter>,
    transcripts: Arc<TranscriptService>,
    conversion_timeout: Duration,
    strategy: ChunkingStrategy,
    size_class: SizeClass,
}

impl IngestPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        documents: Arc<DocumentStore>,
        writer: Arc<CollectionWriter>,
        embedder: Arc<dyn Embedder>,
        converter: Arc<dyn DocumentConverter>,
        transcripts: Arc<TranscriptService>,
        conversion_timeout: Duration,
        strategy: ChunkingStrategy,
        size_class: SizeClass,
    ) -> Self {
        Self {
            documents,
            writer,
            embedder,
            converter,
            transcripts,
            conversion_timeout,
            strategy,
            size_class,
        }
    }

    /// Runs all four steps over a batch of inputs bound to one collection.
    /// Per-item failures are collected rather than aborting the batch.
    pub async fn ingest(&self, actor: &Actor, collection_id: Uuid, inputs: Vec<IngestInput>, mut progress: impl FnMut(usize, usize)) -> Result<IngestResult> {
        let items: Vec<IngestItem> = inputs.into_iter().map(prepare).collect();
        let dispositions = classify_batch(&self.documents, collection_id, &items).await?;

        let mut result = IngestResult {
            documents_processed: 0,
            chunks_created: 0,
            skipped: Vec::new(),
            overwritten: 0,
            errors: Vec::new(),
        };

        let total = items.len();
        for (i, (item, disposition)) in items.into_iter().zip(dispositions).enumerate() {
            let label = item_label(&item);
            progress(i, total);

            let existing_document_id = match disposition {
                Disposition::Skip(reason) => {
                    result.skipped.push(SkippedItem { label, reason });
                    continue;
                }
                Disposition::Process => None,
                Disposition::Overwrite { existing_document_id } => Some(existing_document_id),
            };

            match self.process_one(actor, collection_id, item, existing_document_id).await {
                Ok(chunk_count) => {
                    if existing_document_id.is_some() {
                        result.overwritten += 1;
                    }
                    result.documents_processed += 1;
                    result.chunks_created += chunk_count;
                }
                Err(e) => result.errors.push((label, e.to_string())),
            }
        }
        progress(total, total);

        Ok(result)
    }

    async fn process_one(&self, actor: &Actor, collection_id: Uuid, item: IngestItem, existing_document_id: Option<Uuid>) -> Result<usize> {
        let content_hash = item.content_hash.clone();
        let (content, mut metadata) = self.convert(item).await?;
        if let Json::Object(ref mut map) = metadata {
            map.insert("content_hash".to_string(), Json::String(content_hash));
        }

        let drafts = chunk_text(&content, self.strategy, self.size_class);
        let texts: Vec<String> = drafts.iter().map(|d| d.content.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;

        let chunks: Vec<ChunkInput> = drafts
            .into_iter()
            .zip(vectors)
            .map(|(draft, vector)| ChunkInput {
                content: draft.content,
                embedding_vector: vector,
                metadata: draft.metadata,
            })
            .collect();
        let chunk_count = chunks.len();

        let upsert = UpsertDocument {
            document_id: existing_document_id,
            content,
            metadata,
            chunks,
        };
        let (_document, _written): (Document, _) = self.writer.upsert(actor, collection_id, upsert).await?;

        Ok(chunk_count)
    }

    async fn convert(&self, item: IngestItem) -> Result<(String, Json)> {
        match item.input {
            IngestInput::Text { content, title } => Ok((
                content,
                json!({ "source_type": "text", "title": title }),
            )),
            IngestInput::File {
                original_filename,
                bytes,
                content_type,
            } => {
                let text = crate::convert::convert_with_timeout(self.converter.as_ref(), &bytes, &content_type, self.conversion_timeout).await?;
                Ok((
                    text,
                    json!({ "source_type": "file", "original_filename": original_filename }),
                ))
            }
            IngestInput::Url { canonical_url, bytes, content_type } => {
                let text = crate::convert::convert_with_timeout(self.converter.as_ref(), &bytes, &content_type, self.conversion_timeout).await?;
                Ok((text, json!({ "source_type": "url", "source_url": canonical_url })))
            }
            IngestInput::Video { canonical_url } => {
                let text = self.transcripts.transcribe(&canonical_url).await?;
                Ok((text, json!({ "source_type": "video", "source_url": canonical_url })))
            }
        }
    }
}

fn item_label(item: &IngestItem) -> String {
    match &item.kind {
        IngestItemKind::File { original_filename } => original_filename.clone(),
        IngestItemKind::Url { canonical_url } => canonical_url.clone(),
        IngestItemKind::Video { canonical_url } => canonical_url.clone(),
        IngestItemKind::Text => "text".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepare_hashes_text_content() {
        let item = prepare(IngestInput::Text {
            content: "hello".to_string(),
            title: None,
        });
        assert_eq!(item.content_hash, sha256_hex(b"hello"));
    }

    #[test]
    fn result_fails_only_with_zero_documents() {
        let empty = IngestResult {
            documents_processed: 0,
            chunks_created: 0,
            skipped: vec![],
            overwritten: 0,
            errors: vec![],
        };
        assert!(!empty.any_succeeded());
    }
}
