//! FalkorDB-backed `GraphStore`. FalkorDB speaks the RedisGraph protocol —
//! `GRAPH.QUERY <graph> <cypher>` over a normal RESP connection — so we ride
//! the `redis` crate's async `ConnectionManager` the same way `dk-engine`
//! rides it for its graph backend, rather than a bespoke Cypher driver.

use crate::ports::{EdgeType, GraphStats, GraphStore, QueryRow};
use crate::query::{literal, set_clause, substitute};
use async_trait::async_trait;
use cv_core::model::{
    CommitNode, DocumentNode, FileNode, ModuleNode, SessionKnowledgeNode, SymbolNode,
};
use cv_core::{CvError, Result};
use redis::aio::ConnectionManager;
use redis::{Value as RedisValue};
use serde_json::{json, Value as JsonValue};
use std::collections::HashMap;
use tokio::sync::Mutex;

pub struct FalkorGraphStore {
    graph_name: String,
    conn: Mutex<ConnectionManager>,
}

impl FalkorGraphStore {
    pub async fn connect(url: &str, repo_id: Option<&str>) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| CvError::graph(format!("invalid FalkorDB url: {e}")).with_source(e))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| CvError::graph(format!("failed to connect to FalkorDB: {e}")).with_source(e))?;
        let store = Self {
            graph_name: crate::namespace::repo_namespace(repo_id),
            conn: Mutex::new(conn),
        };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn run(&self, cypher: String) -> Result<Vec<Vec<RedisValue>>> {
        tracing::debug!(graph = %self.graph_name, cypher = %cypher, "GRAPH.QUERY");
        let mut conn = self.conn.lock().await;
        let reply: RedisValue = redis::cmd("GRAPH.QUERY")
            .arg(&self.graph_name)
            .arg(&cypher)
            .query_async(&mut *conn)
            .await
            .map_err(|e| CvError::graph(format!("GRAPH.QUERY failed: {e}")).with_source(e))?;
        Ok(parse_result_set(reply))
    }

    /// Index creation is idempotent — an "already indexed" error is swallowed.
    async fn ensure_indexes(&self) -> Result<()> {
        let statements = [
            "CREATE INDEX FOR (f:File) ON (f.path, f.language, f.git_hash)",
            "CREATE INDEX FOR (s:Symbol) ON (s.name, s.qualified_name, s.file, s.kind)",
            "CREATE INDEX FOR (m:Module) ON (m.path, m.name)",
            "CREATE INDEX FOR (c:Commit) ON (c.sha, c.author, c.timestamp)",
        ];
        for stmt in statements {
            if let Err(err) = self.run(stmt.to_string()).await {
                tracing::debug!(%err, "index creation skipped (likely already exists)");
            }
        }
        Ok(())
    }

    /// `props` gets a redundant `key` field alongside the label-specific key
    /// (`path`, `qualified_name`, `sha`, ...) so `create_edge` can match
    /// either endpoint by a single property name regardless of label.
    async fn merge_node(&self, label: &str, key_field: &str, key_value: &JsonValue, props: &serde_json::Map<String, JsonValue>) -> Result<()> {
        let mut props = props.clone();
        props.insert("key".to_string(), key_value.clone());
        let cypher = format!(
            "MERGE (n:{label} {{{key_field}: {}}}) SET {}",
            literal(key_value),
            set_clause("n", &props)
        );
        self.run(cypher).await?;
        Ok(())
    }

    async fn get_node(&self, label: &str, key_field: &str, key_value: &str) -> Result<Option<JsonValue>> {
        let cypher = format!(
            "MATCH (n:{label} {{{key_field}: {}}}) RETURN n",
            literal(&json!(key_value))
        );
        let rows = self.run(cypher).await?;
        Ok(rows.into_iter().next().and_then(|row| row.into_iter().next().map(redis_value_to_json)))
    }
}

#[async_trait]
impl GraphStore for FalkorGraphStore {
    async fn upsert_file(&self, node: &FileNode) -> Result<()> {
        let props = as_object(node)?;
        self.merge_node("File", "path", &json!(node.path), &props).await
    }

    async fn upsert_symbol(&self, node: &SymbolNode) -> Result<()> {
        let props = as_object(node)?;
        self.merge_node("Symbol", "qualified_name", &json!(node.qualified_name), &props).await
    }

    async fn upsert_module(&self, node: &ModuleNode) -> Result<()> {
        let props = as_object(node)?;
        self.merge_node("Module", "path", &json!(node.path), &props).await
    }

    async fn upsert_commit(&self, node: &CommitNode) -> Result<()> {
        let props = as_object(node)?;
        self.merge_node("Commit", "sha", &json!(node.sha), &props).await
    }

    async fn upsert_document(&self, node: &DocumentNode) -> Result<()> {
        let props = as_object(node)?;
        self.merge_node("Document", "path", &json!(node.path), &props).await
    }

    async fn upsert_session_knowledge(&self, node: &SessionKnowledgeNode) -> Result<()> {
        let key = node.key();
        let props = as_object(node)?;
        self.merge_node("SessionKnowledge", "key", &json!(key), &props).await
    }

    async fn create_edge(
        &self,
        edge_type: EdgeType,
        from_key: &str,
        to_key: &str,
        properties: JsonValue,
    ) -> Result<()> {
        let props = properties.as_object().cloned().unwrap_or_default();
        let set = if props.is_empty() {
            String::new()
        } else {
            format!(" SET {}", set_clause("r", &props))
        };
        let cypher = format!(
            "MATCH (a {{key: {from}}}), (b {{key: {to}}}) MERGE (a)-[r:{label}]->(b){set}",
            from = literal(&json!(from_key)),
            to = literal(&json!(to_key)),
            label = edge_type.label(),
        );
        self.run(cypher).await?;
        Ok(())
    }

    async fn get_file(&self, path: &str) -> Result<Option<FileNode>> {
        Ok(self.get_node("File", "path", path).await?.and_then(|v| serde_json::from_value(v).ok()))
    }

    async fn get_symbol(&self, qualified_name: &str) -> Result<Option<SymbolNode>> {
        Ok(self
            .get_node("Symbol", "qualified_name", qualified_name)
            .await?
            .and_then(|v| serde_json::from_value(v).ok()))
    }

    async fn get_module(&self, path: &str) -> Result<Option<ModuleNode>> {
        Ok(self.get_node("Module", "path", path).await?.and_then(|v| serde_json::from_value(v).ok()))
    }

    async fn get_commit(&self, sha: &str) -> Result<Option<CommitNode>> {
        Ok(self.get_node("Commit", "sha", sha).await?.and_then(|v| serde_json::from_value(v).ok()))
    }

    async fn get_document(&self, path: &str) -> Result<Option<DocumentNode>> {
        Ok(self.get_node("Document", "path", path).await?.and_then(|v| serde_json::from_value(v).ok()))
    }

    async fn get_symbols_by_file(&self, path: &str) -> Result<Vec<SymbolNode>> {
        let cypher = format!(
            "MATCH (s:Symbol {{file: {}}}) RETURN s",
            literal(&json!(path))
        );
        let rows = self.run(cypher).await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.into_iter().next())
            .map(redis_value_to_json)
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect())
    }

    async fn list_files_under(&self, prefix: &str) -> Result<Vec<FileNode>> {
        let cypher = format!(
            "MATCH (f:File) WHERE f.path STARTS WITH {} RETURN f",
            literal(&json!(prefix))
        );
        let rows = self.run(cypher).await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.into_iter().next())
            .map(redis_value_to_json)
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect())
    }

    async fn delete_file(&self, path: &str) -> Result<()> {
        let cypher = format!(
            "MATCH (f:File {{path: {path}}}) \
             OPTIONAL MATCH (s:Symbol {{file: {path}}}) \
             DETACH DELETE f, s",
            path = literal(&json!(path))
        );
        self.run(cypher).await?;
        Ok(())
    }

    async fn delete_symbol(&self, qualified_name: &str) -> Result<()> {
        let cypher = format!(
            "MATCH (s:Symbol {{qualified_name: {}}}) DETACH DELETE s",
            literal(&json!(qualified_name))
        );
        self.run(cypher).await?;
        Ok(())
    }

    async fn get_edges(&self, edge_type: EdgeType, from: Option<&str>, to: Option<&str>) -> Result<Vec<crate::ports::EdgeRecord>> {
        let mut wheres = Vec::new();
        if let Some(f) = from {
            wheres.push(format!("a.key = {}", literal(&json!(f))));
        }
        if let Some(t) = to {
            wheres.push(format!("b.key = {}", literal(&json!(t))));
        }
        let where_clause = if wheres.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", wheres.join(" AND "))
        };
        let cypher = format!(
            "MATCH (a)-[r:{label}]->(b){where_clause} RETURN a.key, b.key, properties(r)",
            label = edge_type.label()
        );
        let rows = self.run(cypher).await?;
        Ok(rows
            .into_iter()
            .filter_map(|mut row| {
                if row.len() < 3 {
                    return None;
                }
                let properties = redis_value_to_json(row.remove(2));
                let to_key = redis_value_to_json(row.remove(1));
                let from_key = redis_value_to_json(row.remove(0));
                Some(crate::ports::EdgeRecord {
                    from: from_key.as_str()?.to_string(),
                    to: to_key.as_str()?.to_string(),
                    properties,
                })
            })
            .collect())
    }

    async fn query(&self, expr: &str, params: &HashMap<String, JsonValue>) -> Result<Vec<QueryRow>> {
        let cypher = substitute(expr, params);
        let rows = self.run(cypher).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let mut obj = serde_json::Map::new();
                for (i, cell) in row.into_iter().enumerate() {
                    obj.insert(format!("col{i}"), redis_value_to_json(cell));
                }
                obj
            })
            .collect())
    }

    async fn get_stats(&self) -> Result<GraphStats> {
        let cypher = "MATCH (f:File) WITH count(f) AS files \
             MATCH (s:Symbol) WITH files, count(s) AS symbols \
             MATCH (m:Module) WITH files, symbols, count(m) AS modules \
             MATCH (c:Commit) WITH files, symbols, modules, count(c) AS commits \
             MATCH (d:Document) WITH files, symbols, modules, commits, count(d) AS documents \
             MATCH ()-[r]->() RETURN files, symbols, modules, commits, documents, count(r) AS edges";
        let rows = self.run(cypher.to_string()).await.unwrap_or_default();
        let row = rows.into_iter().next().unwrap_or_default();
        let nums: Vec<u64> = row.iter().map(|v| redis_value_to_u64(v)).collect();
        Ok(GraphStats {
            file_count: nums.first().copied().unwrap_or(0),
            symbol_count: nums.get(1).copied().unwrap_or(0),
            module_count: nums.get(2).copied().unwrap_or(0),
            commit_count: nums.get(3).copied().unwrap_or(0),
            document_count: nums.get(4).copied().unwrap_or(0),
            edge_count: nums.get(5).copied().unwrap_or(0),
        })
    }

    async fn clear(&self) -> Result<()> {
        self.run("MATCH (n) DETACH DELETE n".to_string()).await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

fn as_object<T: serde::Serialize>(value: &T) -> Result<serde_json::Map<String, JsonValue>> {
    match serde_json::to_value(value).map_err(CvError::from)? {
        JsonValue::Object(map) => Ok(map),
        _ => Ok(serde_json::Map::new()),
    }
}

fn redis_value_to_json(value: RedisValue) -> JsonValue {
    match value {
        RedisValue::Nil => JsonValue::Null,
        RedisValue::Int(i) => json!(i),
        RedisValue::Double(f) => json!(f),
        RedisValue::Boolean(b) => json!(b),
        RedisValue::BulkString(bytes) => {
            let s = String::from_utf8_lossy(&bytes).to_string();
            serde_json::from_str(&s).unwrap_or(JsonValue::String(s))
        }
        RedisValue::Array(items) | RedisValue::Set(items) => {
            JsonValue::Array(items.into_iter().map(redis_value_to_json).collect())
        }
        RedisValue::Map(pairs) => {
            let mut obj = serde_json::Map::new();
            for (k, v) in pairs {
                if let JsonValue::String(key) = redis_value_to_json(k) {
                    obj.insert(key, redis_value_to_json(v));
                }
            }
            JsonValue::Object(obj)
        }
        _ => JsonValue::Null,
    }
}

fn redis_value_to_u64(value: &RedisValue) -> u64 {
    match value {
        RedisValue::Int(i) => (*i).max(0) as u64,
        RedisValue::BulkString(bytes) => String::from_utf8_lossy(bytes).parse().unwrap_or(0),
        _ => 0,
    }
}

/// FalkorDB's GRAPH.QUERY reply is `[header, rows, stats]`; we only need rows.
fn parse_result_set(reply: RedisValue) -> Vec<Vec<RedisValue>> {
    if let RedisValue::Array(mut top) = reply {
        if top.len() >= 2 {
            if let RedisValue::Array(rows) = top.remove(1) {
                return rows
                    .into_iter()
                    .filter_map(|row| match row {
                        RedisValue::Array(cells) => Some(cells),
                        _ => None,
                    })
                    .collect();
            }
        }
    }
    Vec::new()
}
