//! Mirror sync: pulls upstream Graph/Assistant/Schema state into the local
//! read-optimized copy, bumping `CacheState` counters only when something
//! actually changed.

use std::sync::Arc;

use chrono::{Duration, Utc};
use cp_db::{AssistantStore, CacheStateStore, GraphStore};
use cp_domain::hashing::{assistant_mirror_hash, sha256_hex};
use cp_domain::types::{extract_tags, Assistant, AssistantSchemas, Graph};
use cp_domain::Result;
use uuid::Uuid;

use crate::upstream::{AssistantSearchQuery, UpstreamAssistant, UpstreamEngine};

#[derive(Debug, Default)]
pub struct SyncSummary {
    pub updated: usize,
    pub unchanged: usize,
    pub errors: Vec<(String, String)>,
}

pub struct MirrorSyncService {
    graphs: Arc<GraphStore>,
    assistants: Arc<AssistantStore>,
    cache: Arc<CacheStateStore>,
    upstream: Arc<dyn UpstreamEngine>,
    grace_days: i64,
    page_size: usize,
}

impl MirrorSyncService {
    pub fn new(
        graphs: Arc<GraphStore>,
        assistants: Arc<AssistantStore>,
        cache: Arc<CacheStateStore>,
        upstream: Arc<dyn UpstreamEngine>,
        grace_days: i64,
        page_size: usize,
    ) -> Self {
        Self {
            graphs,
            assistants,
            cache,
            upstream,
            grace_days,
            page_size,
        }
    }

    /// Targeted sync: re-pull a single assistant by id.
    pub async fn sync_one(&self, assistant_id: Uuid) -> Result<bool> {
        let upstream = self.upstream.get_assistant(assistant_id).await?;
        self.apply_assistant(upstream).await
    }

    /// Upsert `u` iff its mirror hash differs from what's stored; returns
    /// whether a write happened. Exposed so `VersionService::restore` can
    /// apply the upstream response from its own PATCH without a second
    /// round trip.
    pub async fn apply_assistant(&self, u: UpstreamAssistant) -> Result<bool> {
        let hash = assistant_mirror_hash(
            &u.name,
            &u.config,
            &u.metadata,
            u.description.as_deref(),
            &u.context,
            u.version,
            u.created_at,
            u.updated_at,
        );

        let unchanged = matches!(self.assistants.get(u.assistant_id).await, Ok(existing) if existing.mirror_hash == hash);
        if unchanged {
            self.graphs.touch_last_seen(&u.graph_id).await?;
            return Ok(false);
        }

        let domain_assistant = Assistant {
            assistant_id: u.assistant_id,
            graph_id: u.graph_id.clone(),
            name: u.name,
            description: u.description,
            tags: extract_tags(&u.metadata),
            config: u.config,
            metadata: u.metadata,
            context: u.context,
            version: u.version,
            langgraph_created_at: u.created_at,
            langgraph_updated_at: u.updated_at,
            mirror_hash: hash,
            last_seen_at: Utc::now(),
        };
        self.assistants.upsert(&domain_assistant).await?;
        self.cache.bump_assistants().await?;
        self.sync_schemas(domain_assistant.assistant_id).await?;
        self.graphs.touch_last_seen(&domain_assistant.graph_id).await?;
        Ok(true)
    }

    async fn sync_schemas(&self, assistant_id: Uuid) -> Result<()> {
        let schemas = self.upstream.get_assistant_schemas(assistant_id).await?;
        let combined = format!("{}{}{}", schemas.input_schema, schemas.config_schema, schemas.state_schema);
        let hash = sha256_hex(combined.as_bytes());

        let existing = self.assistants.get_schemas(assistant_id).await?;
        if existing.as_ref().map(|s| s.schema_hash.as_str()) == Some(hash.as_str()) {
            return Ok(());
        }

        self.assistants
            .put_schemas(&AssistantSchemas {
                assistant_id,
                input_schema: schemas.input_schema,
                config_schema: schemas.config_schema,
                state_schema: schemas.state_schema,
                schema_hash: hash,
            })
            .await?;
        self.cache.bump_schemas().await?;
        Ok(())
    }

    /// Per-graph sync: pages through `search_assistants` for `graph_id`
    /// until a short page signals the end, then refreshes the graph row's
    /// `assistants_count` and `last_seen_at`.
    pub async fn sync_graph(&self, graph_id: &str) -> Result<SyncSummary> {
        let mut summary = SyncSummary::default();
        let mut offset = 0u32;

        loop {
            let query = AssistantSearchQuery {
                graph_id: Some(graph_id.to_string()),
                limit: Some(self.page_size as u32),
                offset: Some(offset),
            };
            let page = self.upstream.search_assistants(&query).await?;
            let page_len = page.len();

            for assistant in page {
                let assistant_id = assistant.assistant_id;
                match self.apply_assistant(assistant).await {
                    Ok(true) => summary.updated += 1,
                    Ok(false) => summary.unchanged += 1,
                    Err(e) => summary.errors.push((assistant_id.to_string(), e.to_string())),
                }
            }

            if page_len < self.page_size {
                break;
            }
            offset += self.page_size as u32;
        }

        self.refresh_graph_aggregates(graph_id).await?;
        Ok(summary)
    }

    /// Refreshes `assistants_count`/`last_seen_at`/`active` for `graph_id`
    /// from the assistants currently mirrored for it, inserting the graph
    /// row if this is the first time it's been seen.
    async fn refresh_graph_aggregates(&self, graph_id: &str) -> Result<()> {
        let count = self.assistants.list_by_graph(graph_id).await?.len() as i64;
        match self.graphs.get(graph_id).await {
            Ok(mut graph) => {
                graph.assistants_count = count;
                graph.last_seen_at = Utc::now();
                graph.active = true;
                self.graphs.upsert(&graph).await?;
            }
            Err(_) => {
                let graph = Graph {
                    graph_id: graph_id.to_string(),
                    name: graph_id.to_string(),
                    description: None,
                    assistants_count: count,
                    schema_accessible: true,
                    mirror_hash: String::new(),
                    last_seen_at: Utc::now(),
                    active: true,
                };
                self.graphs.upsert(&graph).await?;
                self.cache.bump_graphs().await?;
            }
        }
        Ok(())
    }

    /// Full sync: re-pulls every graph already known to the mirror. New
    /// graphs are discovered by an explicit `sync_graph` call (e.g. from
    /// an admin endpoint) since upstream exposes no graph listing in this
    /// system's external interface.
    pub async fn full_sync(&self) -> Result<SyncSummary> {
        let mut summary = SyncSummary::default();
        for graph in self.graphs.list_active().await? {
            let graph_summary = self.sync_graph(&graph.graph_id).await?;
            summary.updated += graph_summary.updated;
            summary.unchanged += graph_summary.unchanged;
            summary.errors.extend(graph_summary.errors);
        }
        Ok(summary)
    }

    /// Global incremental sync: pages the upstream assistant listing with
    /// no `graph_id` filter, independent of graphs already known to the
    /// mirror, so a brand-new upstream graph is discovered as soon as one
    /// of its assistants is seen. Stops once `limit` assistants have been
    /// examined or upstream returns a short page.
    pub async fn sync_incremental(&self, limit: usize) -> Result<SyncSummary> {
        let mut summary = SyncSummary::default();
        let mut touched_graphs = std::collections::HashSet::new();
        let mut offset = 0u32;
        let mut seen = 0usize;

        while seen < limit {
            let page_limit = self.page_size.min(limit - seen).max(1);
            let query = AssistantSearchQuery {
                graph_id: None,
                limit: Some(page_limit as u32),
                offset: Some(offset),
            };
            let page = self.upstream.search_assistants(&query).await?;
            let page_len = page.len();

            for assistant in page {
                let assistant_id = assistant.assistant_id;
                let graph_id = assistant.graph_id.clone();
                match self.apply_assistant(assistant).await {
                    Ok(true) => summary.updated += 1,
                    Ok(false) => summary.unchanged += 1,
                    Err(e) => summary.errors.push((assistant_id.to_string(), e.to_string())),
                }
                touched_graphs.insert(graph_id);
            }

            seen += page_len;
            offset += page_len as u32;
            if page_len < page_limit {
                break;
            }
        }

        for graph_id in touched_graphs {
            self.refresh_graph_aggregates(&graph_id).await?;
        }
        Ok(summary)
    }

    /// Deletes assistants whose `last_seen_at` is past the grace horizon,
    /// deletes graphs left with no assistants that are themselves past the
    /// horizon, and marks graphs with only some assistants expired as
    /// inactive. Assistant deletion cascades to that assistant's schemas
    /// and version rows at the database level, so no orphan schema row can
    /// outlive its assistant.
    pub async fn cleanup_stale_mirrors(&self) -> Result<usize> {
        let cutoff = Utc::now() - Duration::days(self.grace_days);
        let mut cleaned = 0;

        for graph in self.graphs.list_active().await? {
            let assistants = self.assistants.list_by_graph(&graph.graph_id).await?;
            let last_seen: Vec<chrono::DateTime<Utc>> = assistants.iter().map(|a| a.last_seen_at).collect();
            let plan = plan_graph_cleanup(graph.last_seen_at, &last_seen, cutoff);

            for &index in &plan.stale_assistants {
                self.assistants.delete(assistants[index].assistant_id).await?;
                cleaned += 1;
            }

            match plan.graph_action {
                GraphCleanupAction::Skip => {}
                GraphCleanupAction::Delete => {
                    self.graphs.delete(&graph.graph_id).await?;
                    cleaned += 1;
                }
                GraphCleanupAction::MarkInactive => {
                    self.graphs.mark_inactive(&graph.graph_id).await?;
                    cleaned += 1;
                }
            }
        }

        if cleaned > 0 {
            self.cache.bump_assistants().await?;
            self.cache.bump_graphs().await?;
        }
        Ok(cleaned)
    }
}

#[derive(Debug, PartialEq, Eq)]
enum GraphCleanupAction {
    /// The graph itself was seen recently enough to leave untouched, even
    /// though some of its assistants were stale and already deleted above.
    Skip,
    Delete,
    MarkInactive,
}

#[derive(Debug, PartialEq, Eq)]
struct GraphCleanupPlan {
    stale_assistants: Vec<usize>,
    graph_action: GraphCleanupAction,
}

/// Pure planning step for `cleanup_stale_mirrors`: which assistants (by
/// index into the caller's list) are past the grace horizon, and what to
/// do with the graph row itself. Stale assistants are always slated for
/// deletion regardless of the graph's own freshness; the graph-level
/// action only applies once the graph itself is past the horizon.
fn plan_graph_cleanup(
    graph_last_seen_at: chrono::DateTime<Utc>,
    assistant_last_seen_ats: &[chrono::DateTime<Utc>],
    cutoff: chrono::DateTime<Utc>,
) -> GraphCleanupPlan {
    let stale_assistants: Vec<usize> = assistant_last_seen_ats
        .iter()
        .enumerate()
        .filter(|(_, t)| **t < cutoff)
        .map(|(i, _)| i)
        .collect();

    if graph_last_seen_at >= cutoff {
        return GraphCleanupPlan {
            stale_assistants,
            graph_action: GraphCleanupAction::Skip,
        };
    }

    let remaining = assistant_last_seen_ats.len() - stale_assistants.len();
    let graph_action = if remaining == 0 {
        GraphCleanupAction::Delete
    } else {
        GraphCleanupAction::MarkInactive
    };
    GraphCleanupPlan {
        stale_assistants,
        graph_action,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hours_ago(h: i64) -> chrono::DateTime<Utc> {
        Utc::now() - Duration::hours(h)
    }

    #[test]
    fn skips_graph_seen_within_grace() {
        let cutoff = hours_ago(24);
        let plan = plan_graph_cleanup(hours_ago(1), &[hours_ago(48)], cutoff);
        assert_eq!(plan.stale_assistants, vec![0]);
        assert_eq!(plan.graph_action, GraphCleanupAction::Skip);
    }

    #[test]
    fn deletes_graph_with_no_remaining_assistants() {
        let cutoff = hours_ago(24);
        let plan = plan_graph_cleanup(hours_ago(48), &[hours_ago(48), hours_ago(72)], cutoff);
        assert_eq!(plan.stale_assistants, vec![0, 1]);
        assert_eq!(plan.graph_action, GraphCleanupAction::Delete);
    }

    #[test]
    fn marks_inactive_when_some_assistants_remain() {
        let cutoff = hours_ago(24);
        let plan = plan_graph_cleanup(hours_ago(48), &[hours_ago(48), hours_ago(1)], cutoff);
        assert_eq!(plan.stale_assistants, vec![0]);
        assert_eq!(plan.graph_action, GraphCleanupAction::MarkInactive);
    }

    #[test]
    fn empty_graph_past_horizon_is_deleted() {
        let cutoff = hours_ago(24);
        let plan = plan_graph_cleanup(hours_ago(48), &[], cutoff);
        assert!(plan.stale_assistants.is_empty());
        assert_eq!(plan.graph_action, GraphCleanupAction::Delete);
    }
}
