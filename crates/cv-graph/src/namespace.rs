//! Per-repo isolation (spec §4.3). Two constructors over the same `repo_id`
//! must resolve to the same namespace so concurrent syncs of distinct repos
//! never collide.

/// `cv_<repoId>` when a repo id is given, otherwise a shared default graph.
pub fn repo_namespace(repo_id: Option<&str>) -> String {
    match repo_id {
        Some(id) if !id.is_empty() => format!("cv_{id}"),
        _ => "cv_default".to_string(),
    }
}

/// `<repoId>_<kind>` — mirrored by the Vector Store's collection naming.
pub fn collection_name(repo_id: Option<&str>, kind: &str) -> String {
    match repo_id {
        Some(id) if !id.is_empty() => format!("{id}_{kind}"),
        _ => format!("default_{kind}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_repo_id_always_resolves_to_same_namespace() {
        assert_eq!(repo_namespace(Some("acme")), repo_namespace(Some("acme")));
        assert_eq!(repo_namespace(Some("acme")), "cv_acme");
    }

    #[test]
    fn missing_repo_id_falls_back_to_shared_default() {
        assert_eq!(repo_namespace(None), "cv_default");
    }

    #[test]
    fn collection_naming_follows_repo_kind_convention() {
        assert_eq!(collection_name(Some("acme"), "code_chunks"), "acme_code_chunks");
        assert_eq!(collection_name(None, "code_chunks"), "default_code_chunks");
    }
}
