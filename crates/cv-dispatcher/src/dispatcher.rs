//! Tool Dispatcher façade (spec §4.9): resolves a tool name to one of the
//! core services (search, explain, graph, sync, traversal, manifold, docs,
//! session), runs it with per-call timing and structured logging, and
//! collapses every outcome — success or backend error — into a
//! `ToolResult`. Grounded on `dk-engine::tool_ops`'s pattern of a single
//! engine façade fronting several stores behind named verb methods.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use cv_authored::AuthoredLog;
use cv_core::model::{AuthoredEntry, AuthoredPayload};
use cv_core::ports::AiProvider;
use cv_core::{CvError, Result};
use cv_graph::{EdgeType, GraphStore};
use cv_manifold::{ContextManifold, OutputFormat, Weights};
use cv_summarize::{input::SymbolInput, FileSummaryInput, Summarizer};
use cv_sync::{default_parallelism, SyncEngine, SyncMode};
use cv_traversal::{Direction, SessionStore, SourceProvider, Target, TraversalEngine};
use cv_vector::{SearchFilter, VectorStore, COLLECTION_CODE_CHUNKS};
use serde_json::{json, Value};

use crate::registry::{self, validate_relative_path};
use crate::resources::{self, ResourceContents};
use crate::tool::ToolResult;

/// Upper bound on any single tool call (spec §5: "cancellation observed at
/// every suspension point"). Grounded on the teacher's per-stage
/// `timeout_ms` in `codegraph-orchestration::orchestrator`.
const TOOL_TIMEOUT: Duration = Duration::from_secs(120);

pub struct Dispatcher {
    graph: Arc<dyn GraphStore>,
    vector: Arc<dyn VectorStore>,
    ai: Arc<dyn AiProvider>,
    sync: Arc<SyncEngine>,
    traversal: Arc<TraversalEngine>,
    manifold: Arc<ContextManifold>,
    authored: Arc<AuthoredLog>,
    summarizer: Summarizer,
    source: Arc<dyn SourceProvider>,
    sessions: SessionStore,
    repo_root: PathBuf,
    ledger_path: PathBuf,
}

impl Dispatcher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        graph: Arc<dyn GraphStore>,
        vector: Arc<dyn VectorStore>,
        ai: Arc<dyn AiProvider>,
        sync: Arc<SyncEngine>,
        traversal: Arc<TraversalEngine>,
        manifold: Arc<ContextManifold>,
        authored: Arc<AuthoredLog>,
        repo_root: impl Into<PathBuf>,
    ) -> Self {
        let repo_root = repo_root.into();
        Self {
            summarizer: Summarizer::new(ai.clone(), vector.clone()),
            source: Arc::new(cv_traversal::FsSourceProvider::new(repo_root.clone())),
            graph,
            vector,
            ai,
            sync,
            traversal,
            manifold,
            authored,
            sessions: SessionStore::new(cv_traversal::default_sessions_dir(&repo_root)),
            ledger_path: repo_root.join(".cv").join("file_ledger.json"),
            repo_root,
        }
    }

    pub fn list_tools(&self) -> &'static [crate::tool::ToolDescriptor] {
        registry::TOOLS
    }

    pub fn list_resources(&self) -> &'static [resources::ResourceDescriptor] {
        resources::RESOURCES
    }

    /// Validates, dispatches, times, and logs one tool invocation. Never
    /// propagates an error to the caller: backend failures and
    /// cancellation both surface as `isError = true` (spec §4.9, §5).
    #[tracing::instrument(skip(self, arguments), fields(tool = name))]
    pub async fn call_tool(&self, name: &str, arguments: Value) -> ToolResult {
        let started = Instant::now();
        let cancel = CancellationToken::new();
        let outcome = tokio::select! {
            outcome = self.dispatch_validated(name, &arguments) => outcome,
            _ = tokio::time::sleep(TOOL_TIMEOUT) => {
                cancel.cancel();
                Err(CvError::validation(format!("tool '{name}' exceeded {}s timeout", TOOL_TIMEOUT.as_secs())))
            }
        };
        let elapsed_ms = started.elapsed().as_millis();
        match outcome {
            Ok(result) => {
                tracing::info!(tool = name, elapsed_ms, "tool call succeeded");
                result
            }
            Err(e) if cancel.is_cancelled() => {
                tracing::warn!(tool = name, elapsed_ms, "tool call cancelled on timeout");
                ToolResult::cancelled(e.message)
            }
            Err(e) => {
                tracing::warn!(tool = name, elapsed_ms, kind = %e.kind, message = %e.message, "tool call failed");
                ToolResult::error(format!("[{}] {}", e.kind, e.message))
            }
        }
    }

    async fn dispatch_validated(&self, name: &str, arguments: &Value) -> Result<ToolResult> {
        match registry::validate(name, arguments) {
            Ok(_) => self.dispatch(name, arguments).await,
            Err(e) => Err(e),
        }
    }

    async fn dispatch(&self, name: &str, arguments: &Value) -> Result<ToolResult> {
        match name {
            "search" => self.handle_search(arguments).await,
            "explain" => self.handle_explain(arguments).await,
            "graph" => self.handle_graph(arguments).await,
            "sync" => self.handle_sync(arguments).await,
            "traversal" => self.handle_traversal(arguments).await,
            "manifold" => self.handle_manifold(arguments).await,
            "docs" => self.handle_docs(arguments).await,
            "session" => self.handle_session(arguments).await,
            "summarize" => self.handle_summarize(arguments).await,
            other => Err(CvError::validation(format!("unknown tool '{other}'"))),
        }
    }

    pub async fn read_resource(&self, uri: &str) -> Result<ResourceContents> {
        let descriptor = resources::find(uri).ok_or_else(|| CvError::validation(format!("unknown resource '{uri}'")))?;
        let text = match uri {
            "cv://graph/summary" => {
                let stats = self.graph.get_stats().await?;
                serde_json::to_string_pretty(&stats).map_err(CvError::from)?
            }
            "cv://status" => {
                let stats = self.graph.get_stats().await?;
                let sessions = self.sessions.list_active(chrono::Duration::hours(1)).await?;
                serde_json::to_string_pretty(&json!({
                    "graph": stats,
                    "active_sessions": sessions.len(),
                    "authored_entries": self.authored.len(),
                }))
                .map_err(CvError::from)?
            }
            "cv://context/auto" => {
                // No explicit "current session" is tracked at the dispatcher
                // layer; an empty query yields a repo-wide packet dominated
                // by the structural/summary dimensions.
                let result = self.manifold.assemble("", 4096, Weights::default(), OutputFormat::Markdown).await?;
                result.rendered
            }
            _ => unreachable!("resources::find guarantees a known uri"),
        };
        Ok(ResourceContents { uri: uri.to_string(), mime_type: descriptor.mime_type.to_string(), text })
    }

    async fn handle_search(&self, args: &Value) -> Result<ToolResult> {
        let query = args["query"].as_str().ok_or_else(|| CvError::validation("query must be a string"))?;
        let k = args.get("k").and_then(Value::as_u64).unwrap_or(10) as usize;
        let mut vectors = self.ai.embed(&[query.to_string()]).await?;
        let vector = vectors.pop().ok_or_else(|| CvError::embedding("embed returned no vector for query"))?;
        let hits = self.vector.search(COLLECTION_CODE_CHUNKS, &vector, k, &SearchFilter::new()).await?;
        Ok(ToolResult::json(json!(hits)))
    }

    async fn handle_explain(&self, args: &Value) -> Result<ToolResult> {
        let symbol = args["symbol"].as_str().ok_or_else(|| CvError::validation("symbol must be a string"))?;
        let node = self.graph.get_symbol(symbol).await?;
        let Some(node) = node else {
            return Ok(ToolResult::error(format!("symbol '{symbol}' not found")));
        };
        let callers = self.graph.get_edges(EdgeType::Calls, None, Some(symbol)).await?;
        let callees = self.graph.get_edges(EdgeType::Calls, Some(symbol), None).await?;
        let summary_id = cv_core::model::HierarchicalSummary::make_id(cv_core::model::SummaryLevel::Symbol, symbol);
        let summary = self.vector.get_summary(&summary_id).await?;
        Ok(ToolResult::json(json!({
            "symbol": node,
            "callers": callers.into_iter().map(|e| e.from).collect::<Vec<_>>(),
            "callees": callees.into_iter().map(|e| e.to).collect::<Vec<_>>(),
            "summary": summary,
        })))
    }

    async fn handle_graph(&self, args: &Value) -> Result<ToolResult> {
        let op = args["op"].as_str().ok_or_else(|| CvError::validation("op must be a string"))?;
        let result = match op {
            "stats" => json!(self.graph.get_stats().await?),
            "get_file" => {
                let path = arg_str(args, "path")?;
                validate_relative_path(path)?;
                json!(self.graph.get_file(path).await?)
            }
            "get_symbol" => json!(self.graph.get_symbol(arg_str(args, "qualified_name")?).await?),
            "list_files_under" => json!(self.graph.list_files_under(args.get("prefix").and_then(Value::as_str).unwrap_or("")).await?),
            "get_edges" => {
                let edge_type = parse_edge_type(arg_str(args, "edge_type")?)?;
                let from = args.get("from").and_then(Value::as_str);
                let to = args.get("to").and_then(Value::as_str);
                json!(self.graph.get_edges(edge_type, from, to).await?)
            }
            other => return Err(CvError::validation(format!("unknown graph op '{other}'"))),
        };
        Ok(ToolResult::json(result))
    }

    async fn handle_sync(&self, args: &Value) -> Result<ToolResult> {
        let root = arg_str(args, "root")?;
        let mode = match args.get("mode").and_then(Value::as_str) {
            Some("full") => SyncMode::Full,
            _ => SyncMode::Incremental,
        };
        let parallelism = args.get("parallelism").and_then(Value::as_u64).map(|v| v as usize).unwrap_or_else(default_parallelism);
        let cancel = CancellationToken::new();
        let stats = self
            .sync
            .sync(std::path::Path::new(root), &self.ledger_path, mode, parallelism, &cancel)
            .await?;
        Ok(ToolResult::json(json!(stats)))
    }

    async fn handle_traversal(&self, args: &Value) -> Result<ToolResult> {
        let action = arg_str(args, "action")?;
        let target = Target {
            module: args.get("module").and_then(Value::as_str).map(String::from),
            file: args.get("file").and_then(Value::as_str).map(String::from),
            symbol: args.get("symbol").and_then(Value::as_str).map(String::from),
        };
        let (session, context) = match action {
            "start" => self.traversal.start(target).await?,
            "navigate" => {
                let session_id = arg_str(args, "session_id")?;
                let direction = parse_direction(arg_str(args, "direction")?)?;
                let has_target = target.module.is_some() || target.file.is_some() || target.symbol.is_some();
                self.traversal.navigate(session_id, direction, has_target.then_some(target)).await?
            }
            other => return Err(CvError::validation(format!("unknown traversal action '{other}'"))),
        };
        Ok(ToolResult::json(json!({"session": session, "context": context})))
    }

    async fn handle_manifold(&self, args: &Value) -> Result<ToolResult> {
        let query = arg_str(args, "query")?;
        let budget = args.get("budget").and_then(Value::as_u64).unwrap_or(4096) as usize;
        let format = match args.get("format").and_then(Value::as_str) {
            Some("xml") => OutputFormat::Xml,
            Some("json") => OutputFormat::Json,
            _ => OutputFormat::Markdown,
        };
        let result = self.manifold.assemble(query, budget, Weights::default(), format).await?;
        Ok(ToolResult::text(result.rendered))
    }

    async fn handle_docs(&self, args: &Value) -> Result<ToolResult> {
        let op = arg_str(args, "op")?;
        let result = match op {
            "list" => json!(self.authored.list()),
            "get" => json!(self.authored.get(arg_str(args, "id")?)),
            "list_by_path" => json!(self.authored.list_by_path(arg_str(args, "path")?)),
            "append" => {
                let note = arg_str(args, "note")?;
                let target = arg_str(args, "target")?;
                let entry = AuthoredEntry {
                    id: uuid::Uuid::new_v4().to_string(),
                    path: args.get("path").and_then(Value::as_str).map(String::from),
                    created_at: chrono::Utc::now(),
                    updated_at: chrono::Utc::now(),
                    created_by: args.get("created_by").and_then(Value::as_str).map(String::from),
                    git_commit: None,
                    payload: AuthoredPayload::Annotation { target: target.to_string(), note: note.to_string() },
                };
                let id = entry.id.clone();
                self.authored.append(entry).await?;
                json!({"id": id})
            }
            other => return Err(CvError::validation(format!("unknown docs op '{other}'"))),
        };
        Ok(ToolResult::json(result))
    }

    async fn handle_session(&self, args: &Value) -> Result<ToolResult> {
        let op = arg_str(args, "op")?;
        let result = match op {
            "list" => {
                let sessions = self.sessions.list_active(chrono::Duration::hours(1)).await?;
                json!(sessions)
            }
            "get" => json!(self.sessions.load(arg_str(args, "session_id")?).await?),
            other => return Err(CvError::validation(format!("unknown session op '{other}'"))),
        };
        Ok(ToolResult::json(result))
    }

    async fn handle_summarize(&self, args: &Value) -> Result<ToolResult> {
        let op = arg_str(args, "op")?;
        let result = match op {
            "file" => {
                let path = arg_str(args, "path")?;
                validate_relative_path(path)?;
                let input = self.build_file_summary_input(path).await?;
                let summary = self.summarizer.summarize_file(&input).await?;
                json!({"l1": summary.l1, "l2": summary.l2, "l2_changed": summary.l2_changed})
            }
            "directory" => {
                let path = arg_str(args, "path")?;
                json!(self.summarizer.summarize_directory(path).await?)
            }
            "repo" => json!(self.summarizer.summarize_repo().await?),
            other => return Err(CvError::validation(format!("unknown summarize op '{other}'"))),
        };
        Ok(ToolResult::json(result))
    }

    /// Assembles the Summarizer's decoupled input shape from the graph and
    /// working tree, keeping `cv-summarize` free of a `cv-parser` dependency.
    async fn build_file_summary_input(&self, path: &str) -> Result<FileSummaryInput> {
        let symbols = self.graph.get_symbols_by_file(path).await?;
        let imports = self
            .graph
            .get_edges(EdgeType::Imports, Some(path), None)
            .await?
            .into_iter()
            .map(|e| e.to)
            .collect();
        let source = self.source.read_file(path).await?.unwrap_or_default();
        let symbols = symbols
            .into_iter()
            .map(|s| SymbolInput {
                qualified_name: s.qualified_name,
                name: s.name,
                kind_label: s.kind.as_str().to_string(),
                is_summarizable: s.kind.is_summarizable_unit(),
                signature: s.signature,
                docstring: s.docstring,
                body_excerpt: cv_traversal::source::extract_lines(&source, s.start_line, s.end_line),
            })
            .collect();
        Ok(FileSummaryInput { path: path.to_string(), imports, symbols })
    }
}

fn arg_str<'a>(args: &'a Value, key: &str) -> Result<&'a str> {
    args.get(key).and_then(Value::as_str).ok_or_else(|| CvError::validation(format!("argument '{key}' must be a string")))
}

fn parse_direction(s: &str) -> Result<Direction> {
    match s {
        "in" => Ok(Direction::In),
        "out" => Ok(Direction::Out),
        "lateral" => Ok(Direction::Lateral),
        "jump" => Ok(Direction::Jump),
        "stay" => Ok(Direction::Stay),
        other => Err(CvError::validation(format!("unknown direction '{other}'"))),
    }
}

fn parse_edge_type(s: &str) -> Result<EdgeType> {
    match s {
        "imports" => Ok(EdgeType::Imports),
        "defines" => Ok(EdgeType::Defines),
        "calls" => Ok(EdgeType::Calls),
        "inherits" => Ok(EdgeType::Inherits),
        "modifies" => Ok(EdgeType::Modifies),
        "touches" => Ok(EdgeType::Touches),
        "about" => Ok(EdgeType::About),
        "follows" => Ok(EdgeType::Follows),
        other => Err(CvError::validation(format!("unknown edge type '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cv_core::config::Config;
    use cv_graph::InMemoryGraphStore;
    use cv_vector::InMemoryVectorStore;
    use serde_json::json;

    struct FixedAi;

    #[async_trait::async_trait]
    impl AiProvider for FixedAi {
        async fn complete(&self, _prompt: &str, _max_tokens: u32, _temperature: f32) -> Result<String> {
            Ok("ok".to_string())
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![0.1, 0.2, 0.3]).collect())
        }
        fn model_id(&self) -> &str {
            "fixed"
        }
    }

    async fn build_dispatcher(dir: &std::path::Path) -> Dispatcher {
        let graph: Arc<dyn GraphStore> = Arc::new(InMemoryGraphStore::new());
        let vector: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
        let ai: Arc<dyn AiProvider> = Arc::new(FixedAi);
        let cache = Arc::new(cv_vector::EmbeddingCache::new());
        let sync = Arc::new(SyncEngine::new(graph.clone(), vector.clone(), cache, ai.clone(), Config::default()));
        let source: Arc<dyn cv_traversal::SourceProvider> = Arc::new(cv_traversal::FsSourceProvider::new(dir.to_path_buf()));
        let traversal = Arc::new(TraversalEngine::new(graph.clone(), vector.clone(), source, dir.join("sessions")));
        let manifold = Arc::new(ContextManifold::new(graph.clone(), vector.clone(), ai.clone(), dir.to_path_buf()));
        let authored = Arc::new(AuthoredLog::load(dir.join("authored.jsonl")).await.unwrap());
        Dispatcher::new(graph, vector, ai, sync, traversal, manifold, authored, dir.to_path_buf())
    }

    #[tokio::test]
    async fn unknown_tool_is_flagged_as_error() {
        let dir = tempfile::tempdir().unwrap();
        let dispatcher = build_dispatcher(dir.path()).await;
        let result = dispatcher.call_tool("nonexistent", json!({})).await;
        assert!(result.is_error);
    }

    #[tokio::test]
    async fn missing_required_argument_is_flagged_as_error() {
        let dir = tempfile::tempdir().unwrap();
        let dispatcher = build_dispatcher(dir.path()).await;
        let result = dispatcher.call_tool("search", json!({})).await;
        assert!(result.is_error);
    }

    #[tokio::test]
    async fn docs_append_then_list_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let dispatcher = build_dispatcher(dir.path()).await;
        let appended = dispatcher.call_tool("docs", json!({"op": "append", "target": "README.md", "note": "looks good"})).await;
        assert!(!appended.is_error);
        let listed = dispatcher.call_tool("docs", json!({"op": "list"})).await;
        assert!(!listed.is_error);
    }

    #[tokio::test]
    async fn graph_stats_resource_reads_back_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let dispatcher = build_dispatcher(dir.path()).await;
        let contents = dispatcher.read_resource("cv://graph/summary").await.unwrap();
        assert_eq!(contents.mime_type, "application/json");
        assert!(contents.text.contains("file_count"));
    }

    #[tokio::test]
    async fn summarize_file_produces_l1_and_l2_from_graph_symbols() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("lib.rs"), "fn f() {}\n").unwrap();
        let dispatcher = build_dispatcher(dir.path()).await;
        dispatcher
            .graph
            .upsert_symbol(&cv_core::model::SymbolNode {
                qualified_name: "lib.rs:f".into(),
                name: "f".into(),
                kind: cv_core::model::SymbolKind::Function,
                file: "lib.rs".into(),
                start_line: 1,
                end_line: 1,
                signature: "fn f()".into(),
                docstring: None,
                visibility: cv_core::model::Visibility::Public,
                is_async: false,
                is_static: false,
                complexity: 1,
                vector_ids: Vec::new(),
            })
            .await
            .unwrap();
        let result = dispatcher.call_tool("summarize", json!({"op": "file", "path": "lib.rs"})).await;
        assert!(!result.is_error);
    }

    #[tokio::test]
    async fn summarize_unknown_op_is_flagged_as_error() {
        let dir = tempfile::tempdir().unwrap();
        let dispatcher = build_dispatcher(dir.path()).await;
        let result = dispatcher.call_tool("summarize", json!({"op": "nope"})).await;
        assert!(result.is_error);
    }
}
