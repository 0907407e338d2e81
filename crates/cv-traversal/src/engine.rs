//! Traversal Engine (spec §4.6): session-based navigation over the graph,
//! assembling a bounded context packet at each stop. Grounded on
//! `dk-engine::tool_ops`'s pattern of a stateful engine wrapping typed
//! store operations behind a handful of verb methods.

use std::sync::Arc;

use chrono::Utc;
use cv_core::model::{HierarchicalSummary, SummaryLevel};
use cv_core::{CvError, Result};
use cv_graph::{EdgeType, GraphStore};
use cv_vector::VectorStore;

use crate::domain::{Direction, Position, Session, Target, TraversalContextResult};
use crate::source::{extract_lines, SourceProvider};
use crate::store::SessionStore;

const DEFAULT_SESSION_TTL_SECS: i64 = 3600;
const DEFAULT_MAX_LIST_ITEMS: usize = 50;

pub struct TraversalEngine {
    graph: Arc<dyn GraphStore>,
    vector: Arc<dyn VectorStore>,
    source: Arc<dyn SourceProvider>,
    sessions: SessionStore,
    session_ttl: chrono::Duration,
    max_list_items: usize,
}

impl TraversalEngine {
    pub fn new(
        graph: Arc<dyn GraphStore>,
        vector: Arc<dyn VectorStore>,
        source: Arc<dyn SourceProvider>,
        sessions_dir: impl Into<std::path::PathBuf>,
    ) -> Self {
        Self {
            graph,
            vector,
            source,
            sessions: SessionStore::new(sessions_dir),
            session_ttl: chrono::Duration::seconds(DEFAULT_SESSION_TTL_SECS),
            max_list_items: DEFAULT_MAX_LIST_ITEMS,
        }
    }

    pub fn with_ttl(mut self, ttl: chrono::Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn with_max_list_items(mut self, max: usize) -> Self {
        self.max_list_items = max;
        self
    }

    /// Starts a new session at the given target (or repo root if empty).
    pub async fn start(&self, target: Target) -> Result<(Session, TraversalContextResult)> {
        let position = self.resolve_jump(&target).await?;
        let now = Utc::now();
        let session = Session {
            id: uuid::Uuid::new_v4().to_string(),
            position: position.clone(),
            history: vec![position.clone()],
            created_at: now,
            last_activity: now,
        };
        self.sessions.save(&session).await?;
        let context = self.assemble_context(&position).await?;
        Ok((session, context))
    }

    pub async fn navigate(
        &self,
        session_id: &str,
        direction: Direction,
        target: Option<Target>,
    ) -> Result<(Session, TraversalContextResult)> {
        let mut session = self
            .sessions
            .load(session_id)
            .await?
            .ok_or_else(|| CvError::validation(format!("unknown session: {session_id}")))?;

        if session.is_expired(self.session_ttl) {
            self.sessions.delete(session_id).await?;
            return Err(CvError::validation(format!("session expired: {session_id}")));
        }

        let target = target.unwrap_or_default();
        let next = match direction {
            Direction::In => self.navigate_in(&session.position, &target).await?,
            Direction::Out => self.navigate_out(&session.position).await?,
            Direction::Lateral => self.navigate_lateral(&session.position, &target).await?,
            Direction::Jump => self.resolve_jump(&target).await?,
            Direction::Stay => {
                let mut pos = session.position.clone();
                pos.timestamp = Utc::now();
                pos
            }
        };

        session.position = next.clone();
        session.history.push(next.clone());
        session.last_activity = Utc::now();
        self.sessions.save(&session).await?;

        let context = self.assemble_context(&next).await?;
        Ok((session, context))
    }

    async fn navigate_in(&self, current: &Position, target: &Target) -> Result<Position> {
        let mut next = current.clone();
        match current.depth {
            0 => {
                next.module = target.module.clone().or_else(|| current.module.clone());
                next.depth = 1;
            }
            1 => {
                let file = match &target.file {
                    Some(f) => f.clone(),
                    None => {
                        let prefix = current.module.clone().unwrap_or_default();
                        let files = self.graph.list_files_under(&prefix).await?;
                        match files.into_iter().next() {
                            Some(f) => f.path,
                            None => return Ok(current.clone()),
                        }
                    }
                };
                next.file = Some(file);
                next.depth = 2;
            }
            2 => {
                let symbol = match &target.symbol {
                    Some(s) => s.clone(),
                    None => {
                        let file = current.file.clone().unwrap_or_default();
                        let symbols = self.graph.get_symbols_by_file(&file).await?;
                        match symbols.into_iter().next() {
                            Some(s) => s.qualified_name,
                            None => return Ok(current.clone()),
                        }
                    }
                };
                next.symbol = Some(symbol);
                next.depth = 3;
            }
            _ => return Ok(current.clone()),
        }
        next.timestamp = Utc::now();
        Ok(next)
    }

    async fn navigate_out(&self, current: &Position) -> Result<Position> {
        let mut next = current.clone();
        match current.depth {
            3 => {
                next.symbol = None;
                next.depth = 2;
            }
            2 => {
                if next.module.is_none() {
                    next.module = current.file.as_deref().map(parent_directory);
                }
                next.file = None;
                next.depth = 1;
            }
            1 => {
                next.module = None;
                next.depth = 0;
            }
            _ => {}
        }
        next.timestamp = Utc::now();
        Ok(next)
    }

    async fn navigate_lateral(&self, current: &Position, target: &Target) -> Result<Position> {
        let mut next = current.clone();
        match current.depth {
            3 => {
                if let Some(symbol) = &target.symbol {
                    next.symbol = Some(symbol.clone());
                } else if let Some(file) = &current.file {
                    let symbols = self.graph.get_symbols_by_file(file).await?;
                    if let Some(sibling) = symbols
                        .into_iter()
                        .map(|s| s.qualified_name)
                        .find(|qn| Some(qn.as_str()) != current.symbol.as_deref())
                    {
                        next.symbol = Some(sibling);
                    }
                }
            }
            2 => {
                if let Some(file) = &target.file {
                    next.file = Some(file.clone());
                } else {
                    let prefix = current.module.clone().unwrap_or_default();
                    let siblings = self.graph.list_files_under(&prefix).await?;
                    if let Some(sibling) = siblings
                        .into_iter()
                        .map(|f| f.path)
                        .find(|p| Some(p.as_str()) != current.file.as_deref())
                    {
                        next.file = Some(sibling);
                    }
                }
            }
            _ => {
                if let Some(module) = &target.module {
                    next.module = Some(module.clone());
                }
            }
        }
        next.timestamp = Utc::now();
        Ok(next)
    }

    async fn resolve_jump(&self, target: &Target) -> Result<Position> {
        let depth = if target.symbol.is_some() {
            3
        } else if target.file.is_some() {
            2
        } else if target.module.is_some() {
            1
        } else {
            0
        };
        Ok(Position {
            module: target.module.clone(),
            file: target.file.clone(),
            symbol: target.symbol.clone(),
            depth,
            timestamp: Utc::now(),
        })
    }

    async fn assemble_context(&self, position: &Position) -> Result<TraversalContextResult> {
        let mut ctx = TraversalContextResult {
            position: position.clone(),
            ..Default::default()
        };

        let summary_id = match position.depth {
            3 => position
                .symbol
                .as_ref()
                .map(|qn| HierarchicalSummary::make_id(SummaryLevel::Symbol, qn)),
            2 => position
                .file
                .as_ref()
                .map(|f| HierarchicalSummary::make_id(SummaryLevel::File, f)),
            1 => position
                .module
                .as_ref()
                .map(|m| HierarchicalSummary::make_id(SummaryLevel::Directory, m)),
            _ => Some(HierarchicalSummary::make_id(SummaryLevel::Repo, "repo")),
        };
        if let Some(id) = summary_id {
            if let Some(value) = self.vector.get_summary(&id).await? {
                ctx.summary = value
                    .get("summary")
                    .and_then(|s| s.as_str())
                    .unwrap_or_default()
                    .to_string();
            }
        }
        if ctx.summary.is_empty() {
            ctx.summary = "no summary available yet".to_string();
        }

        match position.depth {
            3 => {
                let qn = position.symbol.clone().unwrap_or_default();
                if let (Some(file), Some(symbol)) = (&position.file, self.graph.get_symbol(&qn).await?) {
                    if let Some(text) = self.source.read_file(file).await? {
                        ctx.code = Some(extract_lines(&text, symbol.start_line, symbol.end_line));
                    }
                }
                ctx.callers = self
                    .graph
                    .get_edges(EdgeType::Calls, None, Some(&qn))
                    .await?
                    .into_iter()
                    .map(|e| e.from)
                    .take(self.max_list_items)
                    .collect();
                ctx.callees = self
                    .graph
                    .get_edges(EdgeType::Calls, Some(&qn), None)
                    .await?
                    .into_iter()
                    .map(|e| e.to)
                    .take(self.max_list_items)
                    .collect();
            }
            2 => {
                let file = position.file.clone().unwrap_or_default();
                if let Some(text) = self.source.read_file(&file).await? {
                    ctx.code = Some(text);
                }
                ctx.symbols = self
                    .graph
                    .get_symbols_by_file(&file)
                    .await?
                    .into_iter()
                    .map(|s| s.qualified_name)
                    .take(self.max_list_items)
                    .collect();
                ctx.imports = self
                    .graph
                    .get_edges(EdgeType::Imports, Some(&file), None)
                    .await?
                    .into_iter()
                    .map(|e| e.to)
                    .take(self.max_list_items)
                    .collect();
            }
            1 => {
                let prefix = position.module.clone().unwrap_or_default();
                ctx.files = self
                    .graph
                    .list_files_under(&prefix)
                    .await?
                    .into_iter()
                    .map(|f| f.path)
                    .take(self.max_list_items)
                    .collect();
            }
            _ => {
                ctx.files = self
                    .graph
                    .list_files_under("")
                    .await?
                    .into_iter()
                    .map(|f| f.path)
                    .take(self.max_list_items)
                    .collect();
            }
        }

        ctx.navigation_hints = navigation_hints(position, &ctx);
        Ok(ctx)
    }
}

fn parent_directory(path: &str) -> String {
    match path.rfind('/') {
        Some(idx) => path[..idx].to_string(),
        None => String::new(),
    }
}

fn navigation_hints(position: &Position, ctx: &TraversalContextResult) -> Vec<String> {
    let mut hints = Vec::new();
    match position.depth {
        0 => hints.push(format!("in module=<one of {} files' module>", ctx.files.len())),
        1 => {
            if let Some(first) = ctx.files.first() {
                hints.push(format!("in file={first}"));
            }
            hints.push("out".to_string());
        }
        2 => {
            if let Some(first) = ctx.symbols.first() {
                hints.push(format!("in symbol={first}"));
            }
            hints.push("lateral".to_string());
            hints.push("out".to_string());
        }
        3 => {
            if let Some(callee) = ctx.callees.first() {
                hints.push(format!("jump symbol={callee}"));
            }
            hints.push("lateral".to_string());
            hints.push("out".to_string());
        }
        _ => {}
    }
    hints
}

#[cfg(test)]
mod tests {
    use super::*;
    use cv_core::model::{FileNode, SymbolKind, SymbolNode, Visibility};
    use cv_graph::InMemoryGraphStore;
    use cv_vector::InMemoryVectorStore;

    struct StaticSource;

    #[async_trait::async_trait]
    impl SourceProvider for StaticSource {
        async fn read_file(&self, path: &str) -> Result<Option<String>> {
            if path == "src/a.ts" {
                Ok(Some("line1\nfunction f() {\n  g();\n}\nline5\n".to_string()))
            } else {
                Ok(None)
            }
        }
    }

    async fn seeded_graph() -> Arc<InMemoryGraphStore> {
        let graph = Arc::new(InMemoryGraphStore::new());
        graph
            .upsert_file(&FileNode {
                path: "src/a.ts".into(),
                language: "typescript".into(),
                git_hash: "abc".into(),
                size: 40,
                lines_of_code: 5,
                complexity: 1,
                last_modified: Utc::now(),
            })
            .await
            .unwrap();
        graph
            .upsert_symbol(&SymbolNode {
                qualified_name: "src/a.ts:f".into(),
                name: "f".into(),
                kind: SymbolKind::Function,
                file: "src/a.ts".into(),
                start_line: 2,
                end_line: 4,
                signature: "function f()".into(),
                docstring: None,
                visibility: Visibility::Public,
                is_async: false,
                is_static: false,
                complexity: 1,
                vector_ids: vec![],
            })
            .await
            .unwrap();
        graph
            .create_edge(EdgeType::Calls, "src/a.ts:f", "src/a.ts:g", serde_json::json!({}))
            .await
            .unwrap();
        graph
    }

    fn engine(graph: Arc<InMemoryGraphStore>, dir: &std::path::Path) -> TraversalEngine {
        TraversalEngine::new(
            graph,
            Arc::new(InMemoryVectorStore::new()),
            Arc::new(StaticSource),
            dir.join("sessions"),
        )
    }

    #[tokio::test]
    async fn navigate_unknown_session_errors() {
        let dir = tempfile::tempdir().unwrap();
        let graph = seeded_graph().await;
        let engine = engine(graph, dir.path());
        let result = engine.navigate("missing", Direction::Stay, None).await;
        assert!(result.is_err());
    }
}
