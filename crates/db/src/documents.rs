use chrono::{DateTime, Utc};
use cp_domain::types::Document;
use cp_domain::Result;
use serde_json::Value as Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::map_sqlx_err;
use crate::pool::Db;

#[derive(FromRow)]
struct DocumentRow {
    id: Uuid,
    collection_id: Uuid,
    content: String,
    metadata: Json,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DocumentRow> for Document {
    fn from(row: DocumentRow) -> Self {
        Document {
            id: row.id,
            collection_id: row.collection_id,
            content: row.content,
            metadata: row.metadata,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const DOCUMENT_COLUMNS: &str = "id, collection_id, content, metadata, created_at, updated_at";

pub struct DocumentStore {
    db: Db,
}

impl DocumentStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn create(&self, collection_id: Uuid, content: &str, metadata: &Json) -> Result<Document> {
        let row: DocumentRow = sqlx::query_as(&format!(
            "INSERT INTO documents (collection_id, content, metadata) VALUES ($1, $2, $3)
             RETURNING {DOCUMENT_COLUMNS}"
        ))
        .bind(collection_id)
        .bind(content)
        .bind(metadata)
        .fetch_one(&self.db)
        .await
        .map_err(map_sqlx_err)?;
        Ok(row.into())
    }

    pub async fn get(&self, id: Uuid) -> Result<Document> {
        let row: DocumentRow =
            sqlx::query_as(&format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = $1"))
                .bind(id)
                .fetch_one(&self.db)
                .await
                .map_err(map_sqlx_err)?;
        Ok(row.into())
    }

    pub async fn list_by_collection(&self, collection_id: Uuid) -> Result<Vec<Document>> {
        let rows: Vec<DocumentRow> = sqlx::query_as(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE collection_id = $1 ORDER BY created_at"
        ))
        .bind(collection_id)
        .fetch_all(&self.db)
        .await
        .map_err(map_sqlx_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Used by the ingestion pipeline's duplicate-detection pass
    /// to find a prior document by its content hash within
    /// the same collection.
    pub async fn find_by_content_hash(&self, collection_id: Uuid, content_hash: &str) -> Result<Option<Document>> {
        let row: Option<DocumentRow> = sqlx::query_as(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents
             WHERE collection_id = $1 AND metadata->>'content_hash' = $2
             LIMIT 1"
        ))
        .bind(collection_id)
        .bind(content_hash)
        .fetch_optional(&self.db)
        .await
        .map_err(map_sqlx_err)?;
        Ok(row.map(Into::into))
    }

    pub async fn update_content(&self, id: Uuid, content: &str, metadata: &Json) -> Result<()> {
        sqlx::query("UPDATE documents SET content = $1, metadata = $2, updated_at = now() WHERE id = $3")
            .bind(content)
            .bind(metadata)
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }

    /// Deleting a document leaves its chunks in place with `document_id`
    /// nulled by the foreign key's `ON DELETE SET NULL` -- no cascading chunk delete here.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }
}
