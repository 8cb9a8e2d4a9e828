//! Collection & Document Store.
//!
//! Owns collections, documents, and chunks, and layers search (semantic,
//! keyword, hybrid), context expansion, and consumer-facing formatting on
//! top of the row stores in `cp-db`.

pub mod context;
pub mod embedder;
pub mod format;
pub mod http_embedder;
pub mod search;
pub mod store;

pub use context::{expand_context, ContextOptions};
pub use embedder::Embedder;
pub use format::{format_for_llm, group_by_document, DocumentBlock};
pub use http_embedder::HttpEmbedder;
pub use search::{SearchMode, SearchRequest, SearchResult, SearchService};
pub use store::{ChunkInput, CollectionWriter, UpsertDocument};
