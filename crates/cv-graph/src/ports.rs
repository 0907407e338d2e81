//! `GraphStore` (spec §4.3): the typed operations every graph backend
//! implements. Grounded on `codegraph-storage::domain::ChunkStore` (async
//! trait over a content-addressable store) and `dk-engine::graph::VectorSearch`
//! (graceful no-op degradation).

use async_trait::async_trait;
use cv_core::model::{
    CommitNode, DocumentNode, FileNode, ModuleNode, SessionKnowledgeNode, SymbolNode,
};
use cv_core::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeType {
    Imports,
    Defines,
    Calls,
    Inherits,
    Modifies,
    Touches,
    About,
    Follows,
}

impl EdgeType {
    pub fn label(&self) -> &'static str {
        match self {
            EdgeType::Imports => "IMPORTS",
            EdgeType::Defines => "DEFINES",
            EdgeType::Calls => "CALLS",
            EdgeType::Inherits => "INHERITS",
            EdgeType::Modifies => "MODIFIES",
            EdgeType::Touches => "TOUCHES",
            EdgeType::About => "ABOUT",
            EdgeType::Follows => "FOLLOWS",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphStats {
    pub file_count: u64,
    pub symbol_count: u64,
    pub module_count: u64,
    pub commit_count: u64,
    pub document_count: u64,
    pub edge_count: u64,
}

/// A single returned row from an ad-hoc `query()` call, as loosely-typed JSON.
pub type QueryRow = serde_json::Map<String, serde_json::Value>;

/// One matched edge from `get_edges` — endpoint keys plus edge properties.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub from: String,
    pub to: String,
    pub properties: serde_json::Value,
}

#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn upsert_file(&self, node: &FileNode) -> Result<()>;
    async fn upsert_symbol(&self, node: &SymbolNode) -> Result<()>;
    async fn upsert_module(&self, node: &ModuleNode) -> Result<()>;
    async fn upsert_commit(&self, node: &CommitNode) -> Result<()>;
    async fn upsert_document(&self, node: &DocumentNode) -> Result<()>;
    async fn upsert_session_knowledge(&self, node: &SessionKnowledgeNode) -> Result<()>;

    /// MERGE semantics keyed on (from_key, to_key, edge type) — idempotent.
    async fn create_edge(
        &self,
        edge_type: EdgeType,
        from_key: &str,
        to_key: &str,
        properties: serde_json::Value,
    ) -> Result<()>;

    async fn get_file(&self, path: &str) -> Result<Option<FileNode>>;
    async fn get_symbol(&self, qualified_name: &str) -> Result<Option<SymbolNode>>;
    async fn get_module(&self, path: &str) -> Result<Option<ModuleNode>>;
    async fn get_commit(&self, sha: &str) -> Result<Option<CommitNode>>;
    async fn get_document(&self, path: &str) -> Result<Option<DocumentNode>>;
    async fn get_symbols_by_file(&self, path: &str) -> Result<Vec<SymbolNode>>;
    /// Files whose path starts with `prefix` — used by the Traversal Engine
    /// to list a module's sibling files.
    async fn list_files_under(&self, prefix: &str) -> Result<Vec<FileNode>>;

    /// Deletes a file node along with any edges that would otherwise be
    /// left dangling (DEFINES/IMPORTS touching it).
    async fn delete_file(&self, path: &str) -> Result<()>;
    async fn delete_symbol(&self, qualified_name: &str) -> Result<()>;

    /// Typed edge lookup (used by the Traversal Engine for callers/callees
    /// and import neighbors) — `from`/`to` are optional filters, at least
    /// one must be provided by convention.
    async fn get_edges(&self, edge_type: EdgeType, from: Option<&str>, to: Option<&str>) -> Result<Vec<EdgeRecord>>;

    /// Escape hatch for ad-hoc traversals. `params` are substituted
    /// client-side with single-quote escaping; callers must never forward
    /// raw user input without validation.
    async fn query(&self, expr: &str, params: &HashMap<String, serde_json::Value>) -> Result<Vec<QueryRow>>;

    async fn get_stats(&self) -> Result<GraphStats>;
    async fn clear(&self) -> Result<()>;
    async fn close(&self) -> Result<()>;
}
