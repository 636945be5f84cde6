use serde_json::Value;
use sha2::{Digest, Sha256};

/// Content hash of a canonicalised JSON payload, truncated to 16 hex chars.
///
/// Canonicalisation means object keys sorted recursively — `serde_json::Value`
/// already orders map keys via `BTreeMap` when the `preserve_order` feature is
/// off, so `to_string` on a re-parsed value is stable.
pub fn content_hash(payload: &Value) -> String {
    let canonical = serde_json::to_vec(payload).expect("Value serialization cannot fail");
    let digest = Sha256::digest(&canonical);
    hex::encode(digest)[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn same_payload_same_hash() {
        let a = json!({"name": "Oriam", "lat": 55.9});
        let b = json!({"lat": 55.9, "name": "Oriam"});
        assert_eq!(content_hash(&a), content_hash(&b));
    }

    #[test]
    fn hash_is_sixteen_hex_chars() {
        let h = content_hash(&json!({"x": 1}));
        assert_eq!(h.len(), 16);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn different_payload_different_hash() {
        let a = json!({"name": "Oriam"});
        let b = json!({"name": "Craigmillar"});
        assert_ne!(content_hash(&a), content_hash(&b));
    }
}
