//! Context expansion: optional post-processing step for search results
//! that pulls in surrounding material from the parent document.

use std::sync::Arc;

use cp_db::{ChunkStore, DocumentStore};
use cp_domain::types::Chunk;
use cp_domain::Result;

#[derive(Debug, Clone, Copy)]
pub struct ContextOptions {
    pub prefer_full_document: bool,
    pub max_characters: usize,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            prefer_full_document: false,
            max_characters: 4000,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ExpandedContext {
    /// The parent document fit within budget; returned whole.
    FullDocument { content: String },
    /// Sibling chunks in natural (chunk_index) order, each flagged for
    /// whether it was the original search hit.
    Siblings { chunks: Vec<(Chunk, bool)> },
}

/// Expand `found` into its supporting context per `options`.
///
/// A chunk without a `document_id` (orphan legacy data) cannot be
/// expanded; it is returned alone as its own single-element sibling set.
pub async fn expand_context(
    documents: &Arc<DocumentStore>,
    chunks: &Arc<ChunkStore>,
    found: &Chunk,
    options: ContextOptions,
) -> Result<ExpandedContext> {
    let Some(document_id) = found.document_id else {
        return Ok(ExpandedContext::Siblings {
            chunks: vec![(found.clone(), true)],
        });
    };

    if options.prefer_full_document {
        let document = documents.get(document_id).await?;
        if document.content.len() <= options.max_characters {
            return Ok(ExpandedContext::FullDocument { content: document.content });
        }
    }

    let siblings = chunks.list_by_document(document_id).await?;
    Ok(ExpandedContext::Siblings {
        chunks: walk_siblings(&siblings, found, options.max_characters),
    })
}

/// Alternately walks chunks before/after the matched one by `chunk_index`
/// while the accumulated character budget allows, then returns the
/// selected set back in natural (ascending `chunk_index`) order.
fn walk_siblings(siblings: &[Chunk], found: &Chunk, max_characters: usize) -> Vec<(Chunk, bool)> {
    let Some(found_pos) = siblings.iter().position(|c| c.id == found.id) else {
        return vec![(found.clone(), true)];
    };

    let mut total = siblings[found_pos].content.len();
    let mut selected = vec![found_pos];
    let mut before = found_pos as isize - 1;
    let mut after = found_pos + 1;
    let mut take_before = true;

    while total < max_characters && (before >= 0 || after < siblings.len()) {
        if take_before && before >= 0 {
            let candidate = &siblings[before as usize];
            if total + candidate.content.len() > max_characters {
                before = -1;
            } else {
                total += candidate.content.len();
                selected.push(before as usize);
                before -= 1;
            }
        } else if !take_before && after < siblings.len() {
            let candidate = &siblings[after];
            if total + candidate.content.len() > max_characters {
                after = siblings.len();
            } else {
                total += candidate.content.len();
                selected.push(after);
                after += 1;
            }
        }
        take_before = !take_before;
        if before < 0 && after >= siblings.len() {
            break;
        }
    }

    selected.sort_unstable();
    selected
        .into_iter()
        .map(|i| (siblings[i].clone(), i == found_pos))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn chunk(doc: uuid::Uuid, coll: uuid::Uuid, index: i64, content: &str) -> Chunk {
        Chunk {
            id: Uuid::new_v4(),
            document_id: Some(doc),
            collection_id: coll,
            content: content.to_string(),
            embedding_vector: vec![],
            metadata: json!({"chunk_index": index}),
        }
    }

    #[test]
    fn walk_siblings_stays_in_natural_order() {
        let doc = Uuid::new_v4();
        let coll = Uuid::new_v4();
        let siblings = vec![
            chunk(doc, coll, 0, "aaaa"),
            chunk(doc, coll, 1, "bbbb"),
            chunk(doc, coll, 2, "cccc"),
            chunk(doc, coll, 3, "dddd"),
            chunk(doc, coll, 4, "eeee"),
        ];
        let found = siblings[2].clone();
        let result = walk_siblings(&siblings, &found, 20);
        let indices: Vec<i64> = result.iter().map(|(c, _)| c.chunk_index().unwrap()).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        assert!(result.iter().find(|(c, _)| c.id == found.id).unwrap().1);
    }

    #[test]
    fn walk_siblings_respects_budget() {
        let doc = Uuid::new_v4();
        let coll = Uuid::new_v4();
        let siblings = vec![chunk(doc, coll, 0, "a".repeat(10).as_str()), chunk(doc, coll, 1, "b".repeat(10).as_str())];
        let found = siblings[0].clone();
        let result = walk_siblings(&siblings, &found, 10);
        assert_eq!(result.len(), 1);
    }
}
