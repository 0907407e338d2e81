//! Read-only resource URIs (spec §4.9, §6): `cv://context/auto`,
//! `cv://graph/summary`, `cv://status`. Listing returns
//! `{uri, name, mimeType, description}`; reads return
//! `{contents:[{uri, mimeType, text}]}`.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ResourceDescriptor {
    pub uri: &'static str,
    pub name: &'static str,
    #[serde(rename = "mimeType")]
    pub mime_type: &'static str,
    pub description: &'static str,
}

pub const RESOURCES: &[ResourceDescriptor] = &[
    ResourceDescriptor {
        uri: "cv://context/auto",
        name: "auto-context",
        mime_type: "text/markdown",
        description: "Context manifold assembled for the current session's last query",
    },
    ResourceDescriptor {
        uri: "cv://graph/summary",
        name: "graph-summary",
        mime_type: "application/json",
        description: "Aggregate graph store counts (files, symbols, modules, commits, edges)",
    },
    ResourceDescriptor {
        uri: "cv://status",
        name: "status",
        mime_type: "application/json",
        description: "Infra supervisor and ledger health snapshot",
    },
];

pub fn find(uri: &str) -> Option<&'static ResourceDescriptor> {
    RESOURCES.iter().find(|r| r.uri == uri)
}

#[derive(Debug, Clone, Serialize)]
pub struct ResourceContents {
    pub uri: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_resource_is_listed() {
        assert!(find("cv://status").is_some());
    }

    #[test]
    fn unknown_resource_is_absent() {
        assert!(find("cv://nope").is_none());
    }
}
