//! Write path: `upsert`.

use std::sync::Arc;

use cp_db::{ChunkStore, DocumentStore};
use cp_domain::types::{Chunk, Document, ResourceKind};
use cp_domain::{Actor, Error, Result};
use cp_permissions::PermissionEngine;
use serde_json::Value as Json;
use uuid::Uuid;

/// One document plus its already-chunked-and-embedded pieces, as handed
/// down from the ingestion pipeline after conversion and embedding.
pub struct UpsertDocument {
    /// When present, updates the existing document in place instead of
    /// inserting a new row.
    pub document_id: Option<Uuid>,
    pub content: String,
    pub metadata: Json,
    pub chunks: Vec<ChunkInput>,
}

pub struct ChunkInput {
    pub content: String,
    pub embedding_vector: Vec<f32>,
    pub metadata: Json,
}

pub struct CollectionWriter {
    documents: Arc<DocumentStore>,
    chunks: Arc<ChunkStore>,
    permissions: Arc<PermissionEngine>,
}

impl CollectionWriter {
    pub fn new(documents: Arc<DocumentStore>, chunks: Arc<ChunkStore>, permissions: Arc<PermissionEngine>) -> Self {
        Self {
            documents,
            chunks,
            permissions,
        }
    }

    /// Requires `editor` or `owner` on the collection. Inserts (or
    /// updates) the document, inserts its chunks, then backfills each new
    /// chunk's own id and `collection_id` into its metadata column.
    pub async fn upsert(&self, actor: &Actor, collection_id: Uuid, input: UpsertDocument) -> Result<(Document, Vec<Chunk>)> {
        let target = collection_id.to_string();
        if !self
            .permissions
            .can_access(actor, ResourceKind::Collection, &target, "editor")
            .await?
        {
            return Err(Error::Forbidden(format!("no editor access to collection {collection_id}")));
        }

        let document = match input.document_id {
            Some(id) => {
                self.documents.update_content(id, &input.content, &input.metadata).await?;
                self.documents.get(id).await?
            }
            None => self.documents.create(collection_id, &input.content, &input.metadata).await?,
        };

        let mut written = Vec::with_capacity(input.chunks.len());
        for chunk_input in input.chunks {
            let chunk = Chunk {
                id: Uuid::nil(),
                document_id: Some(document.id),
                collection_id,
                content: chunk_input.content,
                embedding_vector: chunk_input.embedding_vector,
                metadata: chunk_input.metadata,
            };
            let inserted = self.chunks.insert(&chunk).await?;

            let mut metadata = inserted.metadata.clone();
            if let Json::Object(ref mut map) = metadata {
                map.insert("id".to_string(), Json::String(inserted.id.to_string()));
                map.insert("collection_id".to_string(), Json::String(collection_id.to_string()));
            }
            self.chunks.update_metadata(inserted.id, &metadata).await?;

            written.push(Chunk { metadata, ..inserted });
        }

        Ok((document, written))
    }
}
