//! Static tool descriptors and argument validation (spec §4.9: "Validates
//! required argument keys; returns a structured error otherwise").

use cv_core::{CvError, Result};
use serde_json::Value;

use crate::tool::ToolDescriptor;

pub const TOOLS: &[ToolDescriptor] = &[
    ToolDescriptor { name: "search", description: "Semantic search over code/docs chunks", required_args: &["query"] },
    ToolDescriptor { name: "explain", description: "Explain a symbol: signature, callers, callees, summary", required_args: &["symbol"] },
    ToolDescriptor { name: "graph", description: "Ad-hoc graph operations (stats, get_file, get_symbol, get_edges)", required_args: &["op"] },
    ToolDescriptor { name: "sync", description: "Run a delta-sync tick over the working tree", required_args: &["root"] },
    ToolDescriptor { name: "traversal", description: "Start or navigate a traversal session", required_args: &["action"] },
    ToolDescriptor { name: "manifold", description: "Assemble a nine-dimension context packet for a query", required_args: &["query"] },
    ToolDescriptor { name: "docs", description: "Authored metadata log operations (append, get, list)", required_args: &["op"] },
    ToolDescriptor { name: "session", description: "List or inspect traversal sessions", required_args: &["op"] },
    ToolDescriptor { name: "summarize", description: "Generate or refresh L1-L4 hierarchical summaries", required_args: &["op"] },
];

pub fn find(name: &str) -> Option<&'static ToolDescriptor> {
    TOOLS.iter().find(|t| t.name == name)
}

/// Rejects unknown tools and missing required argument keys.
pub fn validate(name: &str, arguments: &Value) -> Result<&'static ToolDescriptor> {
    let descriptor = find(name).ok_or_else(|| CvError::validation(format!("unknown tool '{name}'")))?;
    let obj = arguments.as_object();
    for key in descriptor.required_args {
        let present = obj.map(|o| o.contains_key(*key)).unwrap_or(false);
        if !present {
            return Err(CvError::validation(format!("tool '{name}' missing required argument '{key}'")));
        }
    }
    Ok(descriptor)
}

/// Path-like argument guard, grounded on the same traversal-safety check
/// `dk-engine::tool_ops::validate_path` applies to file arguments.
pub fn validate_relative_path(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(CvError::validation("path must not be empty"));
    }
    if path.starts_with('/') || path.starts_with('\\') {
        return Err(CvError::validation("path must be relative"));
    }
    if path.contains('\0') {
        return Err(CvError::validation("path contains a null byte"));
    }
    for component in path.split(['/', '\\']) {
        if component == ".." {
            return Err(CvError::validation("path contains '..' traversal"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn validate_rejects_unknown_tool() {
        assert!(validate("nope", &json!({})).is_err());
    }

    #[test]
    fn validate_rejects_missing_required_arg() {
        let err = validate("search", &json!({})).unwrap_err();
        assert_eq!(err.kind, cv_core::ErrorKind::Validation);
    }

    #[test]
    fn validate_accepts_present_required_arg() {
        assert!(validate("search", &json!({"query": "foo"})).is_ok());
    }

    #[test]
    fn summarize_tool_is_registered_with_op_required() {
        assert!(validate("summarize", &json!({})).is_err());
        assert!(validate("summarize", &json!({"op": "repo"})).is_ok());
    }

    #[test]
    fn relative_path_guard_rejects_traversal() {
        assert!(validate_relative_path("../etc/passwd").is_err());
        assert!(validate_relative_path("/etc/passwd").is_err());
        assert!(validate_relative_path("src/lib.rs").is_ok());
    }
}
