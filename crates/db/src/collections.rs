use cp_domain::types::Collection;
use cp_domain::Result;
use serde_json::Value as Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::map_sqlx_err;
use crate::pool::Db;

#[derive(FromRow)]
struct CollectionRow {
    id: Uuid,
    name: String,
    metadata: Json,
    owner_id: Uuid,
    table_id: String,
}

impl From<CollectionRow> for Collection {
    fn from(row: CollectionRow) -> Self {
        Collection {
            id: row.id,
            name: row.name,
            metadata: row.metadata,
            owner_id: row.owner_id,
            table_id: row.table_id,
        }
    }
}

const COLLECTION_COLUMNS: &str = "id, name, metadata, owner_id, table_id";

pub struct CollectionStore {
    db: Db,
}

impl CollectionStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn create(&self, name: &str, metadata: &Json, owner_id: Uuid, table_id: &str) -> Result<Collection> {
        let row: CollectionRow = sqlx::query_as(&format!(
            "INSERT INTO collections (name, metadata, owner_id, table_id) VALUES ($1, $2, $3, $4)
             RETURNING {COLLECTION_COLUMNS}"
        ))
        .bind(name)
        .bind(metadata)
        .bind(owner_id)
        .bind(table_id)
        .fetch_one(&self.db)
        .await
        .map_err(map_sqlx_err)?;
        Ok(row.into())
    }

    pub async fn get(&self, id: Uuid) -> Result<Collection> {
        let row: CollectionRow =
            sqlx::query_as(&format!("SELECT {COLLECTION_COLUMNS} FROM collections WHERE id = $1"))
                .bind(id)
                .fetch_one(&self.db)
                .await
                .map_err(map_sqlx_err)?;
        Ok(row.into())
    }

    pub async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<Collection>> {
        let rows: Vec<CollectionRow> = sqlx::query_as(&format!(
            "SELECT {COLLECTION_COLUMNS} FROM collections WHERE owner_id = $1 ORDER BY name"
        ))
        .bind(owner_id)
        .fetch_all(&self.db)
        .await
        .map_err(map_sqlx_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM collections WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }
}
