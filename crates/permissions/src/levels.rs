//! Level parsing and ordering helpers shared by the permission engine and
//! the public-permission materializer. Each resource kind has its own
//! ordered level set.

use cp_domain::types::{AssistantLevel, CollectionLevel, GraphLevel, ResourceKind};
use cp_domain::{Error, Result};

pub fn parse_level(kind: ResourceKind, level: &str) -> Result<i32> {
    match kind {
        ResourceKind::Graph => match level {
            "access" => Ok(GraphLevel::Access as i32),
            "admin" => Ok(GraphLevel::Admin as i32),
            other => Err(Error::InvalidInput(format!("unknown graph level: {other}"))),
        },
        ResourceKind::Assistant => match level {
            "viewer" => Ok(AssistantLevel::Viewer as i32),
            "editor" => Ok(AssistantLevel::Editor as i32),
            "owner" => Ok(AssistantLevel::Owner as i32),
            other => Err(Error::InvalidInput(format!("unknown assistant level: {other}"))),
        },
        ResourceKind::Collection => match level {
            "viewer" => Ok(CollectionLevel::Viewer as i32),
            "editor" => Ok(CollectionLevel::Editor as i32),
            "owner" => Ok(CollectionLevel::Owner as i32),
            other => Err(Error::InvalidInput(format!("unknown collection level: {other}"))),
        },
    }
}

/// Whether `have` satisfies (is at or above) `want`, within the ordering
/// for `kind`. Returns an error if either string isn't a valid level.
pub fn satisfies(kind: ResourceKind, have: &str, want: &str) -> Result<bool> {
    Ok(parse_level(kind, have)? >= parse_level(kind, want)?)
}

/// The level required to manage (grant/revoke/list) permissions on a
/// target of this kind -- `admin` for graphs, `owner` for assistants and
/// collections.
pub fn manage_level(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Graph => "admin",
        ResourceKind::Assistant => "owner",
        ResourceKind::Collection => "owner",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_level_rejects_unknown_strings() {
        assert!(parse_level(ResourceKind::Graph, "owner").is_err());
        assert!(parse_level(ResourceKind::Assistant, "admin").is_err());
    }

    #[test]
    fn satisfies_orders_graph_levels() {
        assert!(satisfies(ResourceKind::Graph, "admin", "access").unwrap());
        assert!(!satisfies(ResourceKind::Graph, "access", "admin").unwrap());
        assert!(satisfies(ResourceKind::Graph, "access", "access").unwrap());
    }

    #[test]
    fn satisfies_orders_assistant_levels() {
        assert!(satisfies(ResourceKind::Assistant, "owner", "viewer").unwrap());
        assert!(satisfies(ResourceKind::Assistant, "editor", "viewer").unwrap());
        assert!(!satisfies(ResourceKind::Assistant, "viewer", "editor").unwrap());
    }

    #[test]
    fn satisfies_propagates_parse_errors() {
        assert!(satisfies(ResourceKind::Collection, "bogus", "viewer").is_err());
    }

    #[test]
    fn manage_level_is_admin_for_graphs_and_owner_elsewhere() {
        assert_eq!(manage_level(ResourceKind::Graph), "admin");
        assert_eq!(manage_level(ResourceKind::Assistant), "owner");
        assert_eq!(manage_level(ResourceKind::Collection), "owner");
    }
}
