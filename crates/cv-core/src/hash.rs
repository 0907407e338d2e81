//! Content hashing primitives shared by the FileLedger, the Embedding
//! Cache, and HierarchicalSummary `content_hash` fields.

use sha2::{Digest, Sha256};

/// Collapse runs of whitespace and trim, so trivial formatting changes
/// don't invalidate cached embeddings (spec §4.4).
pub fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `sha256(normalize(text) ⨁ model_id)` — the embedding cache key (spec §4.4).
pub fn embedding_cache_key(text: &str, model_id: &str) -> String {
    let normalized = normalize(text);
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    hasher.update([0u8]); // the "⨁" separator
    hasher.update(model_id.as_bytes());
    hex(&hasher.finalize())
}

/// Plain content hash, used by the FileLedger and summary `content_hash`.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex(&hasher.finalize())
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_whitespace() {
        assert_eq!(normalize("  a   b\tc\n"), "a b c");
    }

    #[test]
    fn embedding_key_invariant_under_formatting() {
        let a = embedding_cache_key("fn f() {\n    g();\n}", "model-a");
        let b = embedding_cache_key("fn f() {     g();   }", "model-a");
        assert_eq!(a, b);
    }

    #[test]
    fn embedding_key_differs_by_model() {
        let a = embedding_cache_key("same text", "model-a");
        let b = embedding_cache_key("same text", "model-b");
        assert_ne!(a, b);
    }

    #[test]
    fn content_hash_is_deterministic() {
        assert_eq!(content_hash(b"hello"), content_hash(b"hello"));
        assert_ne!(content_hash(b"hello"), content_hash(b"world"));
    }
}
