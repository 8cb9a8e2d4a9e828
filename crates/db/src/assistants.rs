use cp_domain::types::{Assistant, AssistantSchemas, AssistantVersion};
use cp_domain::Result;
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::map_sqlx_err;
use crate::pool::Db;

#[derive(FromRow)]
struct AssistantRow {
    assistant_id: Uuid,
    graph_id: String,
    name: String,
    description: Option<String>,
    config: serde_json::Value,
    metadata: serde_json::Value,
    context: serde_json::Value,
    version: i32,
    tags: Vec<String>,
    langgraph_created_at: chrono::DateTime<chrono::Utc>,
    langgraph_updated_at: chrono::DateTime<chrono::Utc>,
    mirror_hash: String,
    last_seen_at: chrono::DateTime<chrono::Utc>,
}

impl From<AssistantRow> for Assistant {
    fn from(row: AssistantRow) -> Self {
        Assistant {
            assistant_id: row.assistant_id,
            graph_id: row.graph_id,
            name: row.name,
            description: row.description,
            config: row.config,
            metadata: row.metadata,
            context: row.context,
            version: row.version,
            tags: row.tags,
            langgraph_created_at: row.langgraph_created_at,
            langgraph_updated_at: row.langgraph_updated_at,
            mirror_hash: row.mirror_hash,
            last_seen_at: row.last_seen_at,
        }
    }
}

const ASSISTANT_COLUMNS: &str = "assistant_id, graph_id, name, description, config, metadata, context, version, tags, langgraph_created_at, langgraph_updated_at, mirror_hash, last_seen_at";

pub struct AssistantStore {
    db: Db,
}

impl AssistantStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn upsert(&self, a: &Assistant) -> Result<()> {
        sqlx::query(
            "INSERT INTO assistants (assistant_id, graph_id, name, description, config, metadata, context, version, tags, langgraph_created_at, langgraph_updated_at, mirror_hash, last_seen_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
             ON CONFLICT (assistant_id) DO UPDATE SET
                 graph_id = EXCLUDED.graph_id,
                 name = EXCLUDED.name,
                 description = EXCLUDED.description,
                 config = EXCLUDED.config,
                 metadata = EXCLUDED.metadata,
                 context = EXCLUDED.context,
                 version = EXCLUDED.version,
                 tags = EXCLUDED.tags,
                 langgraph_created_at = EXCLUDED.langgraph_created_at,
                 langgraph_updated_at = EXCLUDED.langgraph_updated_at,
                 mirror_hash = EXCLUDED.mirror_hash,
                 last_seen_at = EXCLUDED.last_seen_at",
        )
        .bind(a.assistant_id)
        .bind(&a.graph_id)
        .bind(&a.name)
        .bind(&a.description)
        .bind(&a.config)
        .bind(&a.metadata)
        .bind(&a.context)
        .bind(a.version)
        .bind(&a.tags)
        .bind(a.langgraph_created_at)
        .bind(a.langgraph_updated_at)
        .bind(&a.mirror_hash)
        .bind(a.last_seen_at)
        .execute(&self.db)
        .await
        .map_err(map_sqlx_err)?;
        Ok(())
    }

    pub async fn get(&self, assistant_id: Uuid) -> Result<Assistant> {
        let row: AssistantRow = sqlx::query_as(&format!(
            "SELECT {ASSISTANT_COLUMNS} FROM assistants WHERE assistant_id = $1"
        ))
        .bind(assistant_id)
        .fetch_one(&self.db)
        .await
        .map_err(map_sqlx_err)?;
        Ok(row.into())
    }

    /// All assistants for a graph, including the hidden graph-template
    /// assistant -- callers filter with `Assistant::is_graph_template`.
    pub async fn list_by_graph(&self, graph_id: &str) -> Result<Vec<Assistant>> {
        let rows: Vec<AssistantRow> = sqlx::query_as(&format!(
            "SELECT {ASSISTANT_COLUMNS} FROM assistants WHERE graph_id = $1 ORDER BY name"
        ))
        .bind(graph_id)
        .fetch_all(&self.db)
        .await
        .map_err(map_sqlx_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn delete(&self, assistant_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM assistants WHERE assistant_id = $1")
            .bind(assistant_id)
            .execute(&self.db)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }

    pub async fn put_schemas(&self, schemas: &AssistantSchemas) -> Result<()> {
        sqlx::query(
            "INSERT INTO assistant_schemas (assistant_id, input_schema, config_schema, state_schema, schema_hash)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (assistant_id) DO UPDATE SET
                 input_schema = EXCLUDED.input_schema,
                 config_schema = EXCLUDED.config_schema,
                 state_schema = EXCLUDED.state_schema,
                 schema_hash = EXCLUDED.schema_hash",
        )
        .bind(schemas.assistant_id)
        .bind(&schemas.input_schema)
        .bind(&schemas.config_schema)
        .bind(&schemas.state_schema)
        .bind(&schemas.schema_hash)
        .execute(&self.db)
        .await
        .map_err(map_sqlx_err)?;
        Ok(())
    }

    pub async fn get_schemas(&self, assistant_id: Uuid) -> Result<Option<AssistantSchemas>> {
        let row: Option<AssistantSchemasRow> = sqlx::query_as(
            "SELECT assistant_id, input_schema, config_schema, state_schema, schema_hash
             FROM assistant_schemas WHERE assistant_id = $1",
        )
        .bind(assistant_id)
        .fetch_optional(&self.db)
        .await
        .map_err(map_sqlx_err)?;
        Ok(row.map(Into::into))
    }
}

#[derive(FromRow)]
struct AssistantSchemasRow {
    assistant_id: Uuid,
    input_schema: serde_json::Value,
    config_schema: serde_json::Value,
    state_schema: serde_json::Value,
    schema_hash: String,
}

impl From<AssistantSchemasRow> for AssistantSchemas {
    fn from(row: AssistantSchemasRow) -> Self {
        AssistantSchemas {
            assistant_id: row.assistant_id,
            input_schema: row.input_schema,
            config_schema: row.config_schema,
            state_schema: row.state_schema,
            schema_hash: row.schema_hash,
        }
    }
}

pub struct AssistantVersionStore {
    db: Db,
}

impl AssistantVersionStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Append-only: callers must compute `version` as `latest + 1`
    /// themselves.
    pub async fn append(&self, v: &AssistantVersion) -> Result<()> {
        sqlx::query(
            "INSERT INTO assistant_versions (assistant_id, version, name, description, config, metadata, tags, langgraph_created_at, commit_message, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(v.assistant_id)
        .bind(v.version)
        .bind(&v.name)
        .bind(&v.description)
        .bind(&v.config)
        .bind(&v.metadata)
        .bind(&v.tags)
        .bind(v.langgraph_created_at)
        .bind(&v.commit_message)
        .bind(v.created_by)
        .execute(&self.db)
        .await
        .map_err(map_sqlx_err)?;
        Ok(())
    }

    pub async fn list(&self, assistant_id: Uuid) -> Result<Vec<AssistantVersion>> {
        let rows: Vec<AssistantVersionRow> = sqlx::query_as(
            "SELECT assistant_id, version, name, description, config, metadata, tags, langgraph_created_at, commit_message, created_by
             FROM assistant_versions WHERE assistant_id = $1 ORDER BY version DESC",
        )
        .bind(assistant_id)
        .fetch_all(&self.db)
        .await
        .map_err(map_sqlx_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn get(&self, assistant_id: Uuid, version: i32) -> Result<AssistantVersion> {
        let row: AssistantVersionRow = sqlx::query_as(
            "SELECT assistant_id, version, name, description, config, metadata, tags, langgraph_created_at, commit_message, created_by
             FROM assistant_versions WHERE assistant_id = $1 AND version = $2",
        )
        .bind(assistant_id)
        .bind(version)
        .fetch_one(&self.db)
        .await
        .map_err(map_sqlx_err)?;
        Ok(row.into())
    }

    pub async fn latest_version(&self, assistant_id: Uuid) -> Result<i32> {
        let max: Option<i32> = sqlx::query_scalar(
            "SELECT MAX(version) FROM assistant_versions WHERE assistant_id = $1",
        )
        .bind(assistant_id)
        .fetch_one(&self.db)
        .await
        .map_err(map_sqlx_err)?;
        Ok(max.unwrap_or(0))
    }
}

#[derive(FromRow)]
struct AssistantVersionRow {
    assistant_id: Uuid,
    version: i32,
    name: String,
    description: Option<String>,
    config: serde_json::Value,
    metadata: serde_json::Value,
    tags: Vec<String>,
    langgraph_created_at: chrono::DateTime<chrono::Utc>,
    commit_message: Option<String>,
    created_by: Option<Uuid>,
}

impl From<AssistantVersionRow> for AssistantVersion {
    fn from(row: AssistantVersionRow) -> Self {
        AssistantVersion {
            assistant_id: row.assistant_id,
            version: row.version,
            name: row.name,
            description: row.description,
            config: row.config,
            metadata: row.metadata,
            tags: row.tags,
            langgraph_created_at: row.langgraph_created_at,
            commit_message: row.commit_message,
            created_by: row.created_by,
        }
    }
}
