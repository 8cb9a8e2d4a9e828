//! Content hashing helpers shared by the ingestion pipeline (duplicate
//! detection) and the engine mirror (change detection).

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// SHA-256 of canonicalized bytes, hex-encoded. Used for document content
/// hashing and in-batch duplicate detection.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    hex::encode(digest)
}

/// Compute an assistant's mirror hash from the fields the mirror tracks
/// for change detection:
/// `sha256(name || config || metadata || description || context || version
/// || created_at || updated_at)`.
pub fn assistant_mirror_hash(
    name: &str,
    config: &serde_json::Value,
    metadata: &serde_json::Value,
    description: Option<&str>,
    context: &serde_json::Value,
    version: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update(config.to_string().as_bytes());
    hasher.update(metadata.to_string().as_bytes());
    hasher.update(description.unwrap_or("").as_bytes());
    hasher.update(context.to_string().as_bytes());
    hasher.update(version.to_le_bytes());
    hasher.update(created_at.to_rfc3339().as_bytes());
    hasher.update(updated_at.to_rfc3339().as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sha256_is_deterministic() {
        assert_eq!(sha256_hex(b"hello"), sha256_hex(b"hello"));
        assert_ne!(sha256_hex(b"hello"), sha256_hex(b"world"));
    }

    #[test]
    fn mirror_hash_changes_with_any_tracked_field() {
        let now = Utc::now();
        let base = assistant_mirror_hash(
            "name",
            &json!({"k": 1}),
            &json!({}),
            Some("desc"),
            &json!({}),
            1,
            now,
            now,
        );
        let changed_config = assistant_mirror_hash(
            "name",
            &json!({"k": 2}),
            &json!({}),
            Some("desc"),
            &json!({}),
            1,
            now,
            now,
        );
        let changed_version = assistant_mirror_hash(
            "name",
            &json!({"k": 1}),
            &json!({}),
            Some("desc"),
            &json!({}),
            2,
            now,
            now,
        );
        assert_ne!(base, changed_config);
        assert_ne!(base, changed_version);
    }

    #[test]
    fn mirror_hash_stable_when_nothing_changes() {
        let now = Utc::now();
        let h1 = assistant_mirror_hash("n", &json!({}), &json!({}), None, &json!({}), 1, now, now);
        let h2 = assistant_mirror_hash("n", &json!({}), &json!({}), None, &json!({}), 1, now, now);
        assert_eq!(h1, h2);
    }
}
