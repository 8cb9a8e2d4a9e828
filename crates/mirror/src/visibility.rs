//! Hides the distinguished "graph template" assistant from user-facing
//! listings -- it exists only to carry graph-level schemas and should
//! never appear as a selectable assistant.

use cp_domain::types::Assistant;

pub fn user_facing(assistants: Vec<Assistant>) -> Vec<Assistant> {
    assistants.into_iter().filter(|a| !a.is_graph_template()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn assistant(created_by: Option<&str>) -> Assistant {
        Assistant {
            assistant_id: Uuid::new_v4(),
            graph_id: "g".to_string(),
            name: "a".to_string(),
            description: None,
            config: json!({}),
            metadata: json!({"created_by": created_by}),
            context: json!({}),
            version: 1,
            tags: vec![],
            langgraph_created_at: Utc::now(),
            langgraph_updated_at: Utc::now(),
            mirror_hash: "h".to_string(),
            last_seen_at: Utc::now(),
        }
    }

    #[test]
    fn filters_out_the_template_assistant() {
        let assistants = vec![assistant(Some("system")), assistant(Some("user-123"))];
        let visible = user_facing(assistants);
        assert_eq!(visible.len(), 1);
    }
}
