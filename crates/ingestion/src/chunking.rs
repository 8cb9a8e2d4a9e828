//! Chunking strategies for ingested documents.

use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_json::Value as Json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkingStrategy {
    MarkdownAware,
    Semantic,
    Recursive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeClass {
    Small,
    Medium,
    Large,
}

impl SizeClass {
    /// Target chunk size in characters and the overlap carried between
    /// consecutive chunks, scaled by size class.
    fn target_and_overlap(self) -> (usize, usize) {
        match self {
            SizeClass::Small => (500, 50),
            SizeClass::Medium => (1000, 150),
            SizeClass::Large => (2000, 300),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChunkDraft {
    pub content: String,
    pub metadata: Json,
}

/// Split `content` per `strategy`/`size_class`, then run the "optimize"
/// pass that merges tiny trailing chunks into the previous one while
/// guaranteeing at least one chunk survives.
pub fn chunk_text(content: &str, strategy: ChunkingStrategy, size_class: SizeClass) -> Vec<ChunkDraft> {
    let (target, overlap) = size_class.target_and_overlap();

    let raw: Vec<String> = match strategy {
        ChunkingStrategy::MarkdownAware => chunk_markdown_aware(content, target),
        ChunkingStrategy::Semantic => chunk_recursive(content, target, overlap, &["\n\n", ". ", " "]),
        ChunkingStrategy::Recursive => chunk_recursive(content, target, overlap, &["\n\n", "\n", " "]),
    };

    let optimized = optimize(raw, target / 4);
    let total = optimized.len();

    optimized
        .into_iter()
        .enumerate()
        .map(|(i, text)| ChunkDraft {
            content: text,
            metadata: json!({
                "chunk_index": i,
                "total_chunks": total,
                "chunking_strategy": strategy_name(strategy),
                "size_class": size_class_name(size_class),
            }),
        })
        .collect()
}

fn strategy_name(s: ChunkingStrategy) -> &'static str {
    match s {
        ChunkingStrategy::MarkdownAware => "markdown_aware",
        ChunkingStrategy::Semantic => "semantic",
        ChunkingStrategy::Recursive => "recursive",
    }
}

fn size_class_name(s: SizeClass) -> &'static str {
    match s {
        SizeClass::Small => "small",
        SizeClass::Medium => "medium",
        SizeClass::Large => "large",
    }
}

/// Splits on markdown headers (`#`..`######`) first; any resulting block
/// still over `target` is re-split recursively.
fn chunk_markdown_aware(content: &str, target: usize) -> Vec<String> {
    let header = regex::Regex::new(r"(?m)^(#{1,6}\s.*)$").unwrap();

    let mut blocks = Vec::new();
    let mut last = 0;
    let mut current_start = 0;
    for mat in header.find_iter(content) {
        if mat.start() > current_start {
            blocks.push(content[current_start..mat.start()].to_string());
        }
        current_start = mat.start();
        last = mat.end();
    }
    blocks.push(content[current_start..].to_string());
    let _ = last;

    blocks
        .into_iter()
        .map(|b| b.trim().to_string())
        .filter(|b| !b.is_empty())
        .flat_map(|b| {
            if b.len() > target * 2 {
                chunk_recursive(&b, target, target / 10, &["\n\n", "\n", " "])
            } else {
                vec![b]
            }
        })
        .collect()
}

/// Greedy recursive splitter: tries each separator in order, falling back
/// to a hard character cut for text with no matching separator, carrying
/// `overlap` characters between consecutive chunks.
fn chunk_recursive(content: &str, target: usize, overlap: usize, separators: &[&str]) -> Vec<String> {
    if content.len() <= target {
        return vec![content.trim().to_string()].into_iter().filter(|s| !s.is_empty()).collect();
    }

    let sep = separators.iter().find(|s| content.contains(**s)).copied();
    let pieces: Vec<&str> = match sep {
        Some(sep) => content.split(sep).collect(),
        None => {
            return hard_split(content, target, overlap);
        }
    };

    let mut chunks = Vec::new();
    let mut current = String::new();
    for piece in pieces {
        if !current.is_empty() && current.len() + piece.len() > target {
            chunks.push(current.trim().to_string());
            let tail_start = current.len().saturating_sub(overlap);
            current = current[tail_start..].to_string();
        }
        if !current.is_empty() {
            current.push_str(sep.unwrap_or(""));
        }
        current.push_str(piece);
    }
    if !current.trim().is_empty() {
        chunks.push(current.trim().to_string());
    }

    chunks
        .into_iter()
        .filter(|c| !c.is_empty())
        .flat_map(|c| {
            if c.len() > target * 2 {
                let remaining: Vec<&str> = separators
                    .iter()
                    .skip_while(|s| Some(**s) == sep)
                    .copied()
                    .collect();
                if remaining.is_empty() {
                    hard_split(&c, target, overlap)
                } else {
                    chunk_recursive(&c, target, overlap, &remaining)
                }
            } else {
                vec![c]
            }
        })
        .collect()
}

fn hard_split(content: &str, target: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = content.chars().collect();
    let mut out = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + target).min(chars.len());
        out.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start = end.saturating_sub(overlap).max(start + 1);
    }
    out
}

/// Merge any trailing chunk smaller than `min_size` into its predecessor,
/// guaranteeing at least one chunk survives even for tiny input.
fn optimize(mut chunks: Vec<String>, min_size: usize) -> Vec<String> {
    if chunks.is_empty() {
        return vec![String::new()];
    }
    while chunks.len() > 1 {
        let last_len = chunks.last().unwrap().len();
        if last_len >= min_size {
            break;
        }
        let small = chunks.pop().unwrap();
        let prev = chunks.last_mut().unwrap();
        prev.push(' ');
        prev.push_str(&small);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recursive_splits_long_text() {
        let text = "word ".repeat(1000);
        let chunks = chunk_text(&text, ChunkingStrategy::Recursive, SizeClass::Small);
        assert!(chunks.len() > 1);
        assert_eq!(chunks[0].metadata["chunk_index"], 0);
    }

    #[test]
    fn optimize_merges_tiny_trailing_chunk() {
        let chunks = optimize(vec!["a".repeat(500), "x".to_string()], 100);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn optimize_never_returns_empty() {
        let chunks = optimize(vec![], 100);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn markdown_aware_splits_on_headers() {
        let text = "# Title\n\nintro text\n\n## Section\n\nbody text here that is reasonably long to avoid merge issues in this specific test case scenario";
        let chunks = chunk_text(text, ChunkingStrategy::MarkdownAware, SizeClass::Small);
        assert!(!chunks.is_empty());
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks = chunk_text("hello world", ChunkingStrategy::Recursive, SizeClass::Medium);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "hello world");
    }
}
