//! In-memory `GraphStore` test double. Mirrors `dk-engine::storage::LocalStore`'s
//! role: a dependency-free stand-in so upstream crates (sync engine,
//! traversal, manifold) can be unit tested without a live FalkorDB.

use crate::ports::{EdgeType, GraphStats, GraphStore, QueryRow};
use async_trait::async_trait;
use cv_core::model::{
    CommitNode, DocumentNode, FileNode, ModuleNode, SessionKnowledgeNode, SymbolNode,
};
use cv_core::Result;
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EdgeKey {
    edge_type: String,
    from: String,
    to: String,
}

#[derive(Default)]
struct Store {
    files: HashMap<String, FileNode>,
    symbols: HashMap<String, SymbolNode>,
    modules: HashMap<String, ModuleNode>,
    commits: HashMap<String, CommitNode>,
    documents: HashMap<String, DocumentNode>,
    session_knowledge: HashMap<String, SessionKnowledgeNode>,
    edges: HashMap<EdgeKey, serde_json::Value>,
}

pub struct InMemoryGraphStore {
    store: RwLock<Store>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self {
            store: RwLock::new(Store::default()),
        }
    }
}

impl Default for InMemoryGraphStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn upsert_file(&self, node: &FileNode) -> Result<()> {
        self.store.write().files.insert(node.path.clone(), node.clone());
        Ok(())
    }

    async fn upsert_symbol(&self, node: &SymbolNode) -> Result<()> {
        self.store.write().symbols.insert(node.qualified_name.clone(), node.clone());
        Ok(())
    }

    async fn upsert_module(&self, node: &ModuleNode) -> Result<()> {
        self.store.write().modules.insert(node.path.clone(), node.clone());
        Ok(())
    }

    async fn upsert_commit(&self, node: &CommitNode) -> Result<()> {
        self.store.write().commits.insert(node.sha.clone(), node.clone());
        Ok(())
    }

    async fn upsert_document(&self, node: &DocumentNode) -> Result<()> {
        self.store.write().documents.insert(node.path.clone(), node.clone());
        Ok(())
    }

    async fn upsert_session_knowledge(&self, node: &SessionKnowledgeNode) -> Result<()> {
        self.store.write().session_knowledge.insert(node.key(), node.clone());
        Ok(())
    }

    async fn create_edge(
        &self,
        edge_type: EdgeType,
        from_key: &str,
        to_key: &str,
        properties: serde_json::Value,
    ) -> Result<()> {
        let key = EdgeKey {
            edge_type: edge_type.label().to_string(),
            from: from_key.to_string(),
            to: to_key.to_string(),
        };
        self.store.write().edges.insert(key, properties);
        Ok(())
    }

    async fn get_file(&self, path: &str) -> Result<Option<FileNode>> {
        Ok(self.store.read().files.get(path).cloned())
    }

    async fn get_symbol(&self, qualified_name: &str) -> Result<Option<SymbolNode>> {
        Ok(self.store.read().symbols.get(qualified_name).cloned())
    }

    async fn get_module(&self, path: &str) -> Result<Option<ModuleNode>> {
        Ok(self.store.read().modules.get(path).cloned())
    }

    async fn get_commit(&self, sha: &str) -> Result<Option<CommitNode>> {
        Ok(self.store.read().commits.get(sha).cloned())
    }

    async fn get_document(&self, path: &str) -> Result<Option<DocumentNode>> {
        Ok(self.store.read().documents.get(path).cloned())
    }

    async fn get_symbols_by_file(&self, path: &str) -> Result<Vec<SymbolNode>> {
        Ok(self
            .store
            .read()
            .symbols
            .values()
            .filter(|s| s.file == path)
            .cloned()
            .collect())
    }

    async fn list_files_under(&self, prefix: &str) -> Result<Vec<FileNode>> {
        Ok(self
            .store
            .read()
            .files
            .values()
            .filter(|f| f.path.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn delete_file(&self, path: &str) -> Result<()> {
        let mut store = self.store.write();
        store.files.remove(path);
        let dependent_symbols: Vec<String> = store
            .symbols
            .values()
            .filter(|s| s.file == path)
            .map(|s| s.qualified_name.clone())
            .collect();
        for qn in &dependent_symbols {
            store.symbols.remove(qn);
        }
        store
            .edges
            .retain(|k, _| k.from != path && k.to != path && !dependent_symbols.contains(&k.from) && !dependent_symbols.contains(&k.to));
        Ok(())
    }

    async fn delete_symbol(&self, qualified_name: &str) -> Result<()> {
        let mut store = self.store.write();
        store.symbols.remove(qualified_name);
        store.edges.retain(|k, _| k.from != qualified_name && k.to != qualified_name);
        Ok(())
    }

    async fn get_edges(&self, edge_type: EdgeType, from: Option<&str>, to: Option<&str>) -> Result<Vec<crate::ports::EdgeRecord>> {
        let label = edge_type.label();
        Ok(self
            .store
            .read()
            .edges
            .iter()
            .filter(|(k, _)| {
                k.edge_type == label
                    && from.map(|f| k.from == f).unwrap_or(true)
                    && to.map(|t| k.to == t).unwrap_or(true)
            })
            .map(|(k, props)| crate::ports::EdgeRecord {
                from: k.from.clone(),
                to: k.to.clone(),
                properties: props.clone(),
            })
            .collect())
    }

    async fn query(&self, _expr: &str, _params: &HashMap<String, serde_json::Value>) -> Result<Vec<QueryRow>> {
        // The escape-hatch query language is backend-specific (Cypher); the
        // in-memory double only serves the typed operations above.
        Ok(Vec::new())
    }

    async fn get_stats(&self) -> Result<GraphStats> {
        let store = self.store.read();
        Ok(GraphStats {
            file_count: store.files.len() as u64,
            symbol_count: store.symbols.len() as u64,
            module_count: store.modules.len() as u64,
            commit_count: store.commits.len() as u64,
            document_count: store.documents.len() as u64,
            edge_count: store.edges.len() as u64,
        })
    }

    async fn clear(&self) -> Result<()> {
        *self.store.write() = Store::default();
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use cv_core::model::Visibility;

    fn sample_file() -> FileNode {
        FileNode {
            path: "src/a.ts".into(),
            language: "typescript".into(),
            git_hash: "deadbeef".into(),
            size: 10,
            lines_of_code: 1,
            complexity: 1,
            last_modified: Utc::now(),
        }
    }

    #[tokio::test]
    async fn upsert_is_idempotent_by_key() {
        let store = InMemoryGraphStore::new();
        store.upsert_file(&sample_file()).await.unwrap();
        store.upsert_file(&sample_file()).await.unwrap();
        let stats = store.get_stats().await.unwrap();
        assert_eq!(stats.file_count, 1);
    }

    #[tokio::test]
    async fn delete_file_removes_dangling_edges() {
        let store = InMemoryGraphStore::new();
        store.upsert_file(&sample_file()).await.unwrap();
        store
            .create_edge(EdgeType::Defines, "src/a.ts", "src/a.ts:f", serde_json::json!({}))
            .await
            .unwrap();
        store.delete_file("src/a.ts").await.unwrap();
        let stats = store.get_stats().await.unwrap();
        assert_eq!(stats.file_count, 0);
        assert_eq!(stats.edge_count, 0);
    }

    #[tokio::test]
    async fn delete_file_cascades_to_dependent_symbols() {
        let store = InMemoryGraphStore::new();
        store.upsert_file(&sample_file()).await.unwrap();
        let sym = SymbolNode {
            qualified_name: "src/a.ts:f".into(),
            name: "f".into(),
            kind: cv_core::model::SymbolKind::Function,
            file: "src/a.ts".into(),
            start_line: 1,
            end_line: 2,
            signature: "function f()".into(),
            docstring: None,
            visibility: cv_core::model::Visibility::Public,
            is_async: false,
            is_static: false,
            complexity: 1,
            vector_ids: vec![],
        };
        store.upsert_symbol(&sym).await.unwrap();
        store
            .create_edge(EdgeType::Defines, "src/a.ts", "src/a.ts:f", serde_json::json!({}))
            .await
            .unwrap();
        let before = store.get_symbols_by_file("src/a.ts").await.unwrap();
        assert_eq!(before.len(), 1);
        store.delete_file("src/a.ts").await.unwrap();
        let stats = store.get_stats().await.unwrap();
        assert_eq!(stats.file_count, 0);
        assert_eq!(stats.symbol_count, 0);
        assert_eq!(stats.edge_count, 0);
    }

    #[tokio::test]
    async fn list_files_under_matches_path_prefix() {
        let store = InMemoryGraphStore::new();
        store.upsert_file(&sample_file()).await.unwrap();
        let mut other = sample_file();
        other.path = "lib/b.ts".into();
        store.upsert_file(&other).await.unwrap();

        let files = store.list_files_under("src/").await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "src/a.ts");
    }

    #[tokio::test]
    async fn get_edges_filters_by_type_and_endpoint() {
        let store = InMemoryGraphStore::new();
        store
            .create_edge(EdgeType::Calls, "a.rs:f", "a.rs:g", serde_json::json!({"line": 3}))
            .await
            .unwrap();
        store
            .create_edge(EdgeType::Calls, "a.rs:f", "a.rs:h", serde_json::json!({"line": 4}))
            .await
            .unwrap();
        store
            .create_edge(EdgeType::Imports, "a.rs", "b.rs", serde_json::json!({}))
            .await
            .unwrap();

        let callees = store.get_edges(EdgeType::Calls, Some("a.rs:f"), None).await.unwrap();
        assert_eq!(callees.len(), 2);

        let callers = store.get_edges(EdgeType::Calls, None, Some("a.rs:g")).await.unwrap();
        assert_eq!(callers.len(), 1);
        assert_eq!(callers[0].from, "a.rs:f");
    }

    #[tokio::test]
    async fn get_symbol_roundtrips() {
        let store = InMemoryGraphStore::new();
        let sym = SymbolNode {
            qualified_name: "a.rs:f".into(),
            name: "f".into(),
            kind: cv_core::model::SymbolKind::Function,
            file: "a.rs".into(),
            start_line: 1,
            end_line: 2,
            signature: "fn f()".into(),
            docstring: None,
            visibility: Visibility::Public,
            is_async: false,
            is_static: false,
            complexity: 1,
            vector_ids: vec![],
        };
        store.upsert_symbol(&sym).await.unwrap();
        let fetched = store.get_symbol("a.rs:f").await.unwrap();
        assert!(fetched.is_some());
    }
}
