use chrono::Utc;
use cp_domain::types::Graph;
use cp_domain::Result;
use sqlx::FromRow;

use crate::error::map_sqlx_err;
use crate::pool::Db;

#[derive(FromRow)]
struct GraphRow {
    graph_id: String,
    name: String,
    description: Option<String>,
    assistants_count: i64,
    schema_accessible: bool,
    mirror_hash: String,
    last_seen_at: chrono::DateTime<Utc>,
    active: bool,
}

impl From<GraphRow> for Graph {
    fn from(row: GraphRow) -> Self {
        Graph {
            graph_id: row.graph_id,
            name: row.name,
            description: row.description,
            assistants_count: row.assistants_count,
            schema_accessible: row.schema_accessible,
            mirror_hash: row.mirror_hash,
            last_seen_at: row.last_seen_at,
            active: row.active,
        }
    }
}

const GRAPH_COLUMNS: &str =
    "graph_id, name, description, assistants_count, schema_accessible, mirror_hash, last_seen_at, active";

pub struct GraphStore {
    db: Db,
}

impl GraphStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Insert or refresh a graph row as seen from the upstream engine
    /// during a mirror sync pass.
    pub async fn upsert(&self, graph: &Graph) -> Result<()> {
        sqlx::query(
            "INSERT INTO graphs (graph_id, name, description, assistants_count, schema_accessible, mirror_hash, last_seen_at, active)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             ON CONFLICT (graph_id) DO UPDATE SET
                 name = EXCLUDED.name,
                 description = EXCLUDED.description,
                 assistants_count = EXCLUDED.assistants_count,
                 schema_accessible = EXCLUDED.schema_accessible,
                 mirror_hash = EXCLUDED.mirror_hash,
                 last_seen_at = EXCLUDED.last_seen_at,
                 active = EXCLUDED.active",
        )
        .bind(&graph.graph_id)
        .bind(&graph.name)
        .bind(&graph.description)
        .bind(graph.assistants_count)
        .bind(graph.schema_accessible)
        .bind(&graph.mirror_hash)
        .bind(graph.last_seen_at)
        .bind(graph.active)
        .execute(&self.db)
        .await
        .map_err(map_sqlx_err)?;
        Ok(())
    }

    pub async fn get(&self, graph_id: &str) -> Result<Graph> {
        let row: GraphRow = sqlx::query_as(&format!("SELECT {GRAPH_COLUMNS} FROM graphs WHERE graph_id = $1"))
            .bind(graph_id)
            .fetch_one(&self.db)
            .await
            .map_err(map_sqlx_err)?;
        Ok(row.into())
    }

    pub async fn list_active(&self) -> Result<Vec<Graph>> {
        let rows: Vec<GraphRow> = sqlx::query_as(&format!(
            "SELECT {GRAPH_COLUMNS} FROM graphs WHERE active ORDER BY name"
        ))
        .fetch_all(&self.db)
        .await
        .map_err(map_sqlx_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Mark a graph inactive when the mirror sweep no longer sees it
    /// upstream within the configured grace period.
    pub async fn mark_inactive(&self, graph_id: &str) -> Result<()> {
        sqlx::query("UPDATE graphs SET active = false WHERE graph_id = $1")
            .bind(graph_id)
            .execute(&self.db)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }

    /// Cascades to the graph's assistants, their schemas, versions, and
    /// permission rows via the foreign keys' `ON DELETE CASCADE`.
    pub async fn delete(&self, graph_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM graphs WHERE graph_id = $1")
            .bind(graph_id)
            .execute(&self.db)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }

    pub async fn touch_last_seen(&self, graph_id: &str) -> Result<()> {
        sqlx::query("UPDATE graphs SET last_seen_at = $1, active = true WHERE graph_id = $2")
            .bind(Utc::now())
            .bind(graph_id)
            .execute(&self.db)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }
}
