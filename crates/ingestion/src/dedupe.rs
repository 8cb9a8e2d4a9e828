//! Duplicate detection by content hash, ahead of conversion and chunking.

use std::collections::HashSet;
use std::sync::Arc;

use cp_db::DocumentStore;
use cp_domain::Result;
use uuid::Uuid;

use crate::pipeline::{IngestItem, IngestItemKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateReason {
    /// A document with the same content hash already exists in the collection.
    ExactDuplicate,
    /// A document with the same `original_filename` exists with a different
    /// (or missing) content hash -- intent to replace it, recorded but not
    /// acted on.
    Overwrite,
    /// A document with the same canonical URL already exists.
    CanonicalUrlMatch,
    /// Two items in the same batch share a content hash; the later one is dropped.
    DuplicateInBatch,
}

impl DuplicateReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DuplicateReason::ExactDuplicate => "exact_duplicate",
            DuplicateReason::Overwrite => "overwrite",
            DuplicateReason::CanonicalUrlMatch => "canonical_url_match",
            DuplicateReason::DuplicateInBatch => "duplicate_in_batch",
        }
    }
}

pub enum Disposition {
    Process,
    Overwrite { existing_document_id: Uuid },
    Skip(DuplicateReason),
}

/// Classify each item in a batch against the collection's existing documents
/// and against sibling items already seen earlier in the same batch.
///
/// Batch order is preserved: for two items with equal content hash, the
/// first keeps `Process`/`Overwrite` and every later one is marked
/// `duplicate_in_batch` (Property 9).
pub async fn classify_batch(documents: &Arc<DocumentStore>, collection_id: Uuid, items: &[IngestItem]) -> Result<Vec<Disposition>> {
    let mut seen_hashes: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(items.len());

    for item in items {
        if seen_hashes.contains(&item.content_hash) {
            out.push(Disposition::Skip(DuplicateReason::DuplicateInBatch));
            continue;
        }

        let existing = documents.find_by_content_hash(collection_id, &item.content_hash).await?;
        if existing.is_some() {
            seen_hashes.insert(item.content_hash.clone());
            out.push(Disposition::Skip(DuplicateReason::ExactDuplicate));
            continue;
        }

        match &item.kind {
            IngestItemKind::File { original_filename } => {
                if let Some(prior) = find_by_filename(documents, collection_id, original_filename).await? {
                    seen_hashes.insert(item.content_hash.clone());
                    out.push(Disposition::Overwrite {
                        existing_document_id: prior,
                    });
                    continue;
                }
            }
            IngestItemKind::Url { canonical_url } | IngestItemKind::Video { canonical_url } => {
                if find_by_url(documents, collection_id, canonical_url).await?.is_some() {
                    seen_hashes.insert(item.content_hash.clone());
                    out.push(Disposition::Skip(DuplicateReason::CanonicalUrlMatch));
                    continue;
                }
            }
            IngestItemKind::Text => {}
        }

        seen_hashes.insert(item.content_hash.clone());
        out.push(Disposition::Process);
    }

    Ok(out)
}

async fn find_by_filename(documents: &Arc<DocumentStore>, collection_id: Uuid, filename: &str) -> Result<Option<Uuid>> {
    let all = documents.list_by_collection(collection_id).await?;
    Ok(all
        .into_iter()
        .find(|d| d.original_filename().as_deref() == Some(filename))
        .map(|d| d.id))
}

async fn find_by_url(documents: &Arc<DocumentStore>, collection_id: Uuid, url: &str) -> Result<Option<Uuid>> {
    let all = documents.list_by_collection(collection_id).await?;
    Ok(all
        .into_iter()
        .find(|d| d.metadata.get("source_url").and_then(|v| v.as_str()) == Some(url))
        .map(|d| d.id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_strings_use_snake_case_wire_names() {
        assert_eq!(DuplicateReason::ExactDuplicate.as_str(), "exact_duplicate");
        assert_eq!(DuplicateReason::DuplicateInBatch.as_str(), "duplicate_in_batch");
        assert_eq!(DuplicateReason::Overwrite.as_str(), "overwrite");
    }
}
