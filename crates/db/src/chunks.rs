use cp_domain::types::Chunk;
use cp_domain::Result;
use serde_json::Value as Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::map_sqlx_err;
use crate::pool::Db;

#[derive(FromRow)]
struct ChunkRow {
    id: Uuid,
    document_id: Option<Uuid>,
    collection_id: Uuid,
    content: String,
    embedding_vector: Vec<f32>,
    metadata: Json,
}

impl From<ChunkRow> for Chunk {
    fn from(row: ChunkRow) -> Self {
        Chunk {
            id: row.id,
            document_id: row.document_id,
            collection_id: row.collection_id,
            content: row.content,
            embedding_vector: row.embedding_vector,
            metadata: row.metadata,
        }
    }
}

const CHUNK_COLUMNS: &str = "id, document_id, collection_id, content, embedding_vector, metadata";

pub struct ChunkStore {
    db: Db,
}

impl ChunkStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn insert(&self, chunk: &Chunk) -> Result<Chunk> {
        let row: ChunkRow = sqlx::query_as(&format!(
            "INSERT INTO chunks (document_id, collection_id, content, embedding_vector, metadata)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {CHUNK_COLUMNS}"
        ))
        .bind(chunk.document_id)
        .bind(chunk.collection_id)
        .bind(&chunk.content)
        .bind(&chunk.embedding_vector)
        .bind(&chunk.metadata)
        .fetch_one(&self.db)
        .await
        .map_err(map_sqlx_err)?;
        Ok(row.into())
    }

    pub async fn insert_batch(&self, chunks: &[Chunk]) -> Result<Vec<Chunk>> {
        let mut out = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            out.push(self.insert(chunk).await?);
        }
        Ok(out)
    }

    pub async fn list_by_document(&self, document_id: Uuid) -> Result<Vec<Chunk>> {
        let rows: Vec<ChunkRow> = sqlx::query_as(&format!(
            "SELECT {CHUNK_COLUMNS} FROM chunks WHERE document_id = $1
             ORDER BY (metadata->>'chunk_index')::int NULLS LAST"
        ))
        .bind(document_id)
        .fetch_all(&self.db)
        .await
        .map_err(map_sqlx_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn list_by_collection(&self, collection_id: Uuid) -> Result<Vec<Chunk>> {
        let rows: Vec<ChunkRow> = sqlx::query_as(&format!(
            "SELECT {CHUNK_COLUMNS} FROM chunks WHERE collection_id = $1"
        ))
        .bind(collection_id)
        .fetch_all(&self.db)
        .await
        .map_err(map_sqlx_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Postgres full-text search over chunk content, scoped to a
    /// collection, used by the keyword half of hybrid search.
    ///
    /// Each keyword becomes its own `tsquery` term -- a phrase (contains
    /// whitespace) uses `phraseto_tsquery` for an exact match, a single
    /// token is prefix-matched via `to_tsquery('word:*')` -- and the terms
    /// are combined with the tsquery OR operator (`||`), matching the
    /// "multiple keywords combined with OR" rule.
    pub async fn search_keyword(&self, collection_id: Uuid, keywords: &[String], limit: i64) -> Result<Vec<(Chunk, f32)>> {
        #[derive(FromRow)]
        struct ScoredRow {
            id: Uuid,
            document_id: Option<Uuid>,
            collection_id: Uuid,
            content: String,
            embedding_vector: Vec<f32>,
            metadata: Json,
            rank: f32,
        }

        if keywords.is_empty() {
            return Ok(Vec::new());
        }

        let mut terms = Vec::with_capacity(keywords.len());
        for (i, kw) in keywords.iter().enumerate() {
            let placeholder = i + 2; // $1 is collection_id
            if kw.trim().contains(char::is_whitespace) {
                terms.push(format!("phraseto_tsquery('english', ${placeholder})"));
            } else {
                terms.push(format!("to_tsquery('english', ${placeholder} || ':*')"));
            }
        }
        let tsquery_expr = terms.join(" || ");
        let limit_placeholder = keywords.len() + 2;

        let sql = format!(
            "SELECT id, document_id, collection_id, content, embedding_vector, metadata,
                    ts_rank(to_tsvector('english', content), ({tsquery_expr})) AS rank
             FROM chunks
             WHERE collection_id = $1
               AND to_tsvector('english', content) @@ ({tsquery_expr})
             ORDER BY rank DESC
             LIMIT ${limit_placeholder}"
        );

        let mut q = sqlx::query_as::<_, ScoredRow>(&sql).bind(collection_id);
        for kw in keywords {
            q = q.bind(kw.trim().to_string());
        }
        q = q.bind(limit);

        let rows: Vec<ScoredRow> = q.fetch_all(&self.db).await.map_err(map_sqlx_err)?;

        Ok(rows
            .into_iter()
            .map(|r| {
                (
                    Chunk {
                        id: r.id,
                        document_id: r.document_id,
                        collection_id: r.collection_id,
                        content: r.content,
                        embedding_vector: r.embedding_vector,
                        metadata: r.metadata,
                    },
                    r.rank,
                )
            })
            .collect())
    }

    /// Backfill a chunk's own id/collection_id into its metadata after
    /// insert, so downstream consumers of `metadata` never need a join
    /// back to the row itself.
    pub async fn update_metadata(&self, id: Uuid, metadata: &Json) -> Result<()> {
        sqlx::query("UPDATE chunks SET metadata = $1 WHERE id = $2")
            .bind(metadata)
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<Chunk> {
        let row: ChunkRow = sqlx::query_as(&format!("SELECT {CHUNK_COLUMNS} FROM chunks WHERE id = $1"))
            .bind(id)
            .fetch_one(&self.db)
            .await
            .map_err(map_sqlx_err)?;
        Ok(row.into())
    }

    pub async fn delete_by_document(&self, document_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM chunks WHERE document_id = $1")
            .bind(document_id)
            .execute(&self.db)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }
}
