//! Semantic, keyword, and hybrid search over a collection's chunks.

use std::sync::Arc;

use cp_db::{ChunkStore, DocumentStore};
use cp_domain::types::{Chunk, ResourceKind};
use cp_domain::{Actor, Error, Result};
use cp_permissions::PermissionEngine;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use uuid::Uuid;

use crate::embedder::{cosine_similarity, Embedder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    Semantic,
    Keyword,
    Hybrid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub mode: SearchMode,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub filter: Option<Json>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// `w` in `s = w*sem + (1-w)*kw`, only used for `Hybrid`.
    #[serde(default = "default_weight")]
    pub semantic_weight: f32,
}

fn default_limit() -> usize {
    10
}
fn default_weight() -> f32 {
    0.5
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub chunk: Chunk,
    pub score: f32,
}

pub struct SearchService {
    chunks: Arc<ChunkStore>,
    #[allow(dead_code)]
    documents: Arc<DocumentStore>,
    embedder: Arc<dyn Embedder>,
    permissions: Arc<PermissionEngine>,
}

impl SearchService {
    pub fn new(
        chunks: Arc<ChunkStore>,
        documents: Arc<DocumentStore>,
        embedder: Arc<dyn Embedder>,
        permissions: Arc<PermissionEngine>,
    ) -> Self {
        Self {
            chunks,
            documents,
            embedder,
            permissions,
        }
    }

    /// Dispatches to the requested mode. Every mode requires any
    /// collection permission (viewer or above).
    pub async fn search(&self, actor: &Actor, collection_id: Uuid, req: &SearchRequest) -> Result<Vec<SearchResult>> {
        self.require_read_access(actor, collection_id).await?;

        match req.mode {
            SearchMode::Semantic => {
                let query = req
                    .query
                    .as_deref()
                    .ok_or_else(|| Error::InvalidInput("semantic search requires a query".into()))?;
                self.semantic(collection_id, query, req.limit, req.filter.as_ref()).await
            }
            SearchMode::Keyword => self.keyword(collection_id, &req.keywords, req.limit).await,
            SearchMode::Hybrid => self.hybrid(collection_id, req).await,
        }
    }

    async fn require_read_access(&self, actor: &Actor, collection_id: Uuid) -> Result<()> {
        let target = collection_id.to_string();
        if !self
            .permissions
            .can_access(actor, ResourceKind::Collection, &target, "viewer")
            .await?
        {
            return Err(Error::Forbidden(format!("no access to collection {collection_id}")));
        }
        Ok(())
    }

    /// Embed `query`, score every chunk in the collection by cosine
    /// similarity, and return the top `limit`.
    pub async fn semantic(
        &self,
        collection_id: Uuid,
        query: &str,
        limit: usize,
        filter: Option<&Json>,
    ) -> Result<Vec<SearchResult>> {
        let query_vec = self.embedder.embed(query).await?;
        let mut candidates = self.chunks.list_by_collection(collection_id).await?;
        if let Some(filter) = filter {
            candidates.retain(|c| metadata_matches(&c.metadata, filter));
        }

        let mut scored: Vec<SearchResult> = candidates
            .into_iter()
            .map(|chunk| {
                let score = cosine_similarity(&query_vec, &chunk.embedding_vector);
                SearchResult { chunk, score }
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal).then(a.chunk.id.cmp(&b.chunk.id)));
        scored.truncate(limit);
        Ok(scored)
    }

    /// Full-text search; phrases matched exactly, single tokens
    /// prefix-matched, multiple keywords OR'd.
    pub async fn keyword(&self, collection_id: Uuid, keywords: &[String], limit: usize) -> Result<Vec<SearchResult>> {
        let rows = self.chunks.search_keyword(collection_id, keywords, limit as i64).await?;
        Ok(rows
            .into_iter()
            .map(|(chunk, rank)| SearchResult { chunk, score: rank })
            .collect())
    }

    /// Runs both halves with `k' = min(2k, 50)`, min-max normalizes each
    /// score set independently, combines as `s = w*sem + (1-w)*kw`,
    /// dedupes by chunk id keeping the max normalized score per side, and
    /// returns the top `k` by combined score.
    pub async fn hybrid(&self, collection_id: Uuid, req: &SearchRequest) -> Result<Vec<SearchResult>> {
        let k = req.limit.max(1);
        let k_prime = (2 * k).min(50);
        let weight = req.semantic_weight.clamp(0.0, 1.0);

        let query = req
            .query
            .as_deref()
            .ok_or_else(|| Error::InvalidInput("hybrid search requires a query".into()))?;

        let semantic = self.semantic(collection_id, query, k_prime, req.filter.as_ref()).await?;
        let keyword_terms: Vec<String> = if req.keywords.is_empty() {
            query.split_whitespace().map(str::to_string).collect()
        } else {
            req.keywords.clone()
        };
        let keyword = self.keyword(collection_id, &keyword_terms, k_prime).await?;

        let sem_norm = min_max_normalize(semantic.iter().map(|r| r.score));
        let kw_norm = min_max_normalize(keyword.iter().map(|r| r.score));

        use std::collections::HashMap;
        let mut combined: HashMap<Uuid, (Chunk, f32, f32)> = HashMap::new();

        for (result, norm) in semantic.into_iter().zip(sem_norm) {
            combined
                .entry(result.chunk.id)
                .and_modify(|e| e.1 = e.1.max(norm))
                .or_insert((result.chunk.clone(), norm, 0.0));
        }
        for (result, norm) in keyword.into_iter().zip(kw_norm) {
            combined
                .entry(result.chunk.id)
                .and_modify(|e| e.2 = e.2.max(norm))
                .or_insert((result.chunk.clone(), 0.0, norm));
        }

        let mut out: Vec<SearchResult> = combined
            .into_values()
            .map(|(chunk, sem, kw)| {
                let score = weight * sem + (1.0 - weight) * kw;
                SearchResult { chunk, score }
            })
            .collect();
        out.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal).then(a.chunk.id.cmp(&b.chunk.id)));
        out.truncate(k);
        Ok(out)
    }
}

/// Min-max normalization into `[0, 1]`. A constant (or empty/singleton)
/// input set normalizes to all-`1.0` rather than dividing by zero.
fn min_max_normalize(scores: impl Iterator<Item = f32> + Clone) -> Vec<f32> {
    let values: Vec<f32> = scores.collect();
    if values.is_empty() {
        return values;
    }
    let min = values.iter().cloned().fold(f32::INFINITY, f32::min);
    let max = values.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    if (max - min).abs() < f32::EPSILON {
        return values.iter().map(|_| 1.0).collect();
    }
    values.iter().map(|v| (v - min) / (max - min)).collect()
}

/// A result "matches" `filter` if every key present in `filter` equals the
/// corresponding value in the chunk's metadata object.
fn metadata_matches(metadata: &Json, filter: &Json) -> bool {
    let (Json::Object(metadata), Json::Object(filter)) = (metadata, filter) else {
        return false;
    };
    filter.iter().all(|(k, v)| metadata.get(k) == Some(v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_spreads_scores_into_unit_range() {
        let out = min_max_normalize(vec![1.0, 2.0, 3.0].into_iter());
        assert_eq!(out, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn normalize_constant_scores_all_one() {
        let out = min_max_normalize(vec![5.0, 5.0].into_iter());
        assert_eq!(out, vec![1.0, 1.0]);
    }

    #[test]
    fn normalize_empty_is_empty() {
        assert!(min_max_normalize(std::iter::empty()).is_empty());
    }

    #[test]
    fn metadata_filter_requires_subset_match() {
        let metadata = serde_json::json!({"chunk_index": 1, "lang": "en"});
        assert!(metadata_matches(&metadata, &serde_json::json!({"lang": "en"})));
        assert!(!metadata_matches(&metadata, &serde_json::json!({"lang": "fr"})));
    }
}
