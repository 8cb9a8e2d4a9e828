//! Result formatting for consumers: groups chunks by document and renders
//! a combined markdown block for LLM consumers.

use std::collections::BTreeMap;

use cp_domain::types::Chunk;
use uuid::Uuid;

use crate::context::ExpandedContext;
use crate::search::SearchResult;

#[derive(Debug, Clone)]
pub struct DocumentBlock {
    /// `None` for orphan legacy chunks with no parent document.
    pub document_id: Option<Uuid>,
    pub title: Option<String>,
    /// Either the document's full content, or the union of matched and
    /// supporting chunks, already ordered by `chunk_index`.
    pub segments: Vec<ContentSegment>,
    is_full_document: bool,
}

#[derive(Debug, Clone)]
pub struct ContentSegment {
    pub content: String,
    pub matched: bool,
}

/// Combine each search hit with its expanded context into one block per
/// parent document, deduplicating overlapping supporting chunks across
/// hits that share a document.
pub fn group_by_document(hits: Vec<(SearchResult, ExpandedContext)>) -> Vec<DocumentBlock> {
    let mut by_document: BTreeMap<Option<Uuid>, DocumentBlock> = BTreeMap::new();

    for (hit, expanded) in hits {
        let document_id = hit.chunk.document_id;
        let title = document_title(&hit.chunk);

        let block = by_document.entry(document_id).or_insert_with(|| DocumentBlock {
            document_id,
            title: title.clone(),
            segments: Vec::new(),
            is_full_document: false,
        });

        match expanded {
            ExpandedContext::FullDocument { content } => {
                block.segments = vec![ContentSegment { content, matched: true }];
                block.is_full_document = true;
            }
            ExpandedContext::Siblings { chunks } => {
                if block.is_full_document {
                    continue;
                }
                merge_siblings(block, chunks);
            }
        }
    }

    by_document.into_values().collect()
}

fn merge_siblings(block: &mut DocumentBlock, incoming: Vec<(Chunk, bool)>) {
    for (chunk, matched) in incoming {
        let content = chunk.content.clone();
        if block.segments.iter().any(|s| s.content == content) {
            continue;
        }
        block.segments.push(ContentSegment { content, matched });
    }
}

fn document_title(chunk: &Chunk) -> Option<String> {
    chunk
        .metadata
        .get("title")
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

/// Render blocks as markdown for an LLM consumer: one heading per
/// document, matched segments flagged inline.
pub fn format_for_llm(blocks: &[DocumentBlock]) -> String {
    let mut out = String::new();
    for (i, block) in blocks.iter().enumerate() {
        let heading = block
            .title
            .clone()
            .or_else(|| block.document_id.map(|id| format!("Document {id}")))
            .unwrap_or_else(|| "Untitled".to_string());
        out.push_str(&format!("## {} ({}/{})\n\n", heading, i + 1, blocks.len()));
        for segment in &block.segments {
            if segment.matched {
                out.push_str("**[matched]**\n");
            }
            out.push_str(&segment.content);
            out.push_str("\n\n");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result(content: &str, matched_score: f32) -> SearchResult {
        SearchResult {
            chunk: Chunk {
                id: Uuid::new_v4(),
                document_id: Some(Uuid::new_v4()),
                collection_id: Uuid::new_v4(),
                content: content.to_string(),
                embedding_vector: vec![],
                metadata: json!({"title": "Doc"}),
            },
            score: matched_score,
        }
    }

    #[test]
    fn render_flags_matched_segments() {
        let hit = result("hello world", 0.9);
        let chunk = hit.chunk.clone();
        let blocks = group_by_document(vec![(
            hit,
            ExpandedContext::Siblings {
                chunks: vec![(chunk, true)],
            },
        )]);
        let rendered = format_for_llm(&blocks);
        assert!(rendered.contains("[matched]"));
        assert!(rendered.contains("hello world"));
    }
}
