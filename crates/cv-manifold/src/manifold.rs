//! Context Manifold (spec §4.7): nine lightweight dimension states,
//! scored per query and assembled under a byte budget. Grounded on
//! `dk-engine::tool_ops`'s pattern of a façade over several stores, with
//! scoring/rendering kept as plain synchronous helpers.

use std::path::PathBuf;
use std::sync::Arc;

use cv_core::model::HUB_SYMBOL_THRESHOLD;
use cv_core::ports::{AiProvider, GitPlatform};
use cv_core::{CvError, Result};
use cv_graph::{EdgeType, GraphStore};
use cv_traversal::SessionStore;
use cv_vector::{SearchFilter, VectorStore, COLLECTION_CODE_CHUNKS};

use crate::dimension::{Dimension, DimensionScore};
use crate::format::{self, OutputFormat};
use crate::git_signals;
use crate::risk;
use crate::state;
use crate::weights::Weights;

const DEFAULT_COMMIT_WINDOW: usize = 200;
const DEFAULT_SESSION_TTL_SECS: i64 = 3600;

pub struct ContextManifold {
    graph: Arc<dyn GraphStore>,
    vector: Arc<dyn VectorStore>,
    ai: Arc<dyn AiProvider>,
    sessions: SessionStore,
    session_ttl: chrono::Duration,
    requirements: Option<Arc<dyn GitPlatform>>,
    repo_root: PathBuf,
    state_path: PathBuf,
    hub_threshold: u32,
    commit_window: usize,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ContextResult {
    pub rendered: String,
    pub format: OutputFormat,
    pub total_bytes: usize,
    pub fallback: bool,
    pub dimensions: Vec<DimensionScore>,
    pub dimensions_used: Vec<String>,
}

impl ContextManifold {
    pub fn new(
        graph: Arc<dyn GraphStore>,
        vector: Arc<dyn VectorStore>,
        ai: Arc<dyn AiProvider>,
        repo_root: impl Into<PathBuf>,
    ) -> Self {
        let repo_root = repo_root.into();
        Self {
            graph,
            vector,
            ai,
            sessions: SessionStore::new(cv_traversal::default_sessions_dir(&repo_root)),
            session_ttl: chrono::Duration::seconds(DEFAULT_SESSION_TTL_SECS),
            requirements: None,
            state_path: state::default_state_path(&repo_root),
            hub_threshold: HUB_SYMBOL_THRESHOLD,
            commit_window: DEFAULT_COMMIT_WINDOW,
            repo_root,
        }
    }

    pub fn with_requirements_client(mut self, client: Arc<dyn GitPlatform>) -> Self {
        self.requirements = Some(client);
        self
    }

    pub async fn assemble(
        &self,
        query: &str,
        budget: usize,
        weights: Weights,
        format: OutputFormat,
    ) -> Result<ContextResult> {
        let mut manifold_state = state::load(&self.state_path).await.unwrap_or_default();

        let computed: Vec<(Dimension, Result<(f32, Vec<String>, String)>)> = vec![
            (Dimension::Structural, self.score_structural(query).await),
            (Dimension::Semantic, self.score_semantic(query).await),
            (Dimension::Temporal, self.score_temporal(query).await),
            (Dimension::Requirements, self.score_requirements(query).await),
            (Dimension::Summary, self.score_summary().await),
            (Dimension::Navigational, self.score_navigational().await),
            (Dimension::Session, self.score_session().await),
            (Dimension::Intent, self.score_intent(query).await),
            (Dimension::Impact, self.score_impact().await),
        ];

        if computed.iter().any(|(_, r)| r.is_err()) {
            return self.fallback(query, budget, format).await;
        }

        let scored: Vec<(Dimension, f32, Vec<String>, String)> = computed
            .into_iter()
            .map(|(dim, r)| {
                let (score, refs, fragment) = r.expect("checked above");
                (dim, score, refs, fragment)
            })
            .collect();

        let weighted_total: f32 = scored.iter().map(|(dim, score, _, _)| weights.get(*dim) * score).sum();

        let mut dimensions = Vec::with_capacity(scored.len());
        for (dim, score, refs, fragment) in scored {
            let share = if weighted_total > 0.0 {
                (weights.get(dim) * score) / weighted_total
            } else {
                0.0
            };
            let byte_budget = (budget as f32 * share).floor() as usize;
            let fragment = truncate_bytes(&fragment, byte_budget);
            manifold_state.record(dim, score, refs.clone());
            dimensions.push(DimensionScore {
                dimension: dim,
                score,
                refs,
                fragment,
                byte_budget,
            });
        }

        let _ = state::save(&self.state_path, &manifold_state).await;

        let dimensions_used = dimensions
            .iter()
            .filter(|d| d.score > 0.0)
            .map(|d| d.dimension.as_str().to_string())
            .collect();
        let rendered = format::render(&dimensions, format);
        let total_bytes = rendered.len();

        Ok(ContextResult {
            rendered,
            format,
            total_bytes,
            fallback: false,
            dimensions,
            dimensions_used,
        })
    }

    async fn fallback(&self, query: &str, budget: usize, format: OutputFormat) -> Result<ContextResult> {
        let (score, refs, fragment) = self
            .score_semantic(query)
            .await
            .unwrap_or((0.0, Vec::new(), "semantic search unavailable".to_string()));
        let fragment = truncate_bytes(&fragment, budget);
        let dims = vec![DimensionScore {
            dimension: Dimension::Semantic,
            score,
            refs,
            fragment,
            byte_budget: budget,
        }];
        let rendered = format::render(&dims, format);
        let total_bytes = rendered.len();
        Ok(ContextResult {
            rendered,
            format,
            total_bytes,
            fallback: true,
            dimensions_used: vec!["semantic".to_string()],
            dimensions: dims,
        })
    }

    async fn score_structural(&self, query: &str) -> Result<(f32, Vec<String>, String)> {
        let stats = self.graph.get_stats().await?;
        let edges = self.graph.get_edges(EdgeType::Calls, None, None).await?;
        let mut degree: std::collections::HashMap<String, u32> = std::collections::HashMap::new();
        for e in &edges {
            *degree.entry(e.from.clone()).or_insert(0) += 1;
            *degree.entry(e.to.clone()).or_insert(0) += 1;
        }
        let hubs: Vec<String> = degree
            .into_iter()
            .filter(|(_, d)| *d >= self.hub_threshold)
            .map(|(name, _)| name)
            .collect();

        let score = overlap_score(query, &hubs).max(if stats.symbol_count > 0 { 0.3 } else { 0.0 });
        let fragment = format!(
            "{} files, {} symbols, {} edges, {} hub symbols",
            stats.file_count,
            stats.symbol_count,
            stats.edge_count,
            hubs.len()
        );
        Ok((score, hubs, fragment))
    }

    async fn score_semantic(&self, query: &str) -> Result<(f32, Vec<String>, String)> {
        if query.trim().is_empty() {
            return Ok((0.0, Vec::new(), "no query text".to_string()));
        }
        let vector = self
            .ai
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .unwrap_or_default();
        let hits = self
            .vector
            .search(COLLECTION_CODE_CHUNKS, &vector, 5, &SearchFilter::new())
            .await?;
        let score = hits.iter().map(|h| h.score).fold(0.0_f32, f32::max).clamp(0.0, 1.0);
        let refs: Vec<String> = hits.iter().map(|h| h.id.clone()).collect();
        let fragment = if hits.is_empty() {
            "no semantic matches".to_string()
        } else {
            format!("{} semantic matches: {}", hits.len(), refs.join(", "))
        };
        Ok((score, refs, fragment))
    }

    async fn score_temporal(&self, query: &str) -> Result<(f32, Vec<String>, String)> {
        let repo_root = self.repo_root.clone();
        let window = self.commit_window;
        let hot = tokio::task::spawn_blocking(move || git_signals::hot_files(&repo_root, window, 5))
            .await
            .map_err(|e| CvError::io(e.to_string()))??;
        let refs: Vec<String> = hot.iter().map(|(path, _)| path.clone()).collect();
        let score = overlap_score(query, &refs).max(if hot.is_empty() { 0.0 } else { 0.2 });
        let fragment = if hot.is_empty() {
            "no commit history available".to_string()
        } else {
            format!(
                "hot files: {}",
                hot.iter().map(|(p, n)| format!("{p} ({n})")).collect::<Vec<_>>().join(", ")
            )
        };
        Ok((score, refs, fragment))
    }

    async fn score_requirements(&self, query: &str) -> Result<(f32, Vec<String>, String)> {
        match &self.requirements {
            None => Ok((0.0, Vec::new(), "no requirements platform configured".to_string())),
            Some(client) => match client.fetch_text(query).await? {
                Some(text) => Ok((0.6, vec![query.to_string()], text)),
                None => Ok((0.0, Vec::new(), "no matching requirement found".to_string())),
            },
        }
    }

    async fn score_summary(&self) -> Result<(f32, Vec<String>, String)> {
        let id = cv_core::model::HierarchicalSummary::make_id(cv_core::model::SummaryLevel::Repo, "repo");
        match self.vector.get_summary(&id).await? {
            Some(value) => {
                let text = value.get("summary").and_then(|s| s.as_str()).unwrap_or_default();
                Ok((0.5, vec![id], text.to_string()))
            }
            None => Ok((0.0, Vec::new(), "no repo summary generated yet".to_string())),
        }
    }

    async fn score_navigational(&self) -> Result<(f32, Vec<String>, String)> {
        let active = self.sessions.list_active(self.session_ttl).await?;
        let score = (active.len() as f32 / 5.0).min(1.0);
        let refs: Vec<String> = active.iter().map(|s| s.id.clone()).collect();
        let fragment = format!("{} active traversal session(s)", active.len());
        Ok((score, refs, fragment))
    }

    async fn score_session(&self) -> Result<(f32, Vec<String>, String)> {
        let repo_root = self.repo_root.clone();
        let status = tokio::task::spawn_blocking(move || git_signals::working_tree_status(&repo_root))
            .await
            .map_err(|e| CvError::io(e.to_string()))??;
        let mut refs = status.modified.clone();
        refs.extend(status.staged.clone());
        refs.extend(status.untracked.clone());
        let score = if status.is_dirty() { 1.0 } else { 0.0 };
        let fragment = if status.is_dirty() {
            format!(
                "modified: [{}], staged: [{}], untracked: [{}]",
                status.modified.join(", "),
                status.staged.join(", "),
                status.untracked.join(", ")
            )
        } else {
            "working tree clean".to_string()
        };
        Ok((score, refs, fragment))
    }

    async fn score_intent(&self, query: &str) -> Result<(f32, Vec<String>, String)> {
        let repo_root = self.repo_root.clone();
        let (branch, commits) = tokio::task::spawn_blocking(move || {
            let branch = git_signals::branch_name(&repo_root)?;
            let commits = git_signals::recent_commits(&repo_root, 10)?;
            Ok::<_, CvError>((branch, commits))
        })
        .await
        .map_err(|e| CvError::io(e.to_string()))??;

        let subjects: Vec<String> = commits.iter().map(|c| c.subject.clone()).collect();
        let mut score = if branch.is_some() { 0.3 } else { 0.0 };
        score = score.max(overlap_score(query, &subjects));

        let types: Vec<String> = commits
            .iter()
            .filter_map(|c| c.commit_type.clone())
            .collect::<std::collections::HashSet<_>>()
            .into_iter()
            .collect();
        let fragment = format!(
            "branch: {}, recent commit types: [{}]",
            branch.as_deref().unwrap_or("(detached)"),
            types.join(", ")
        );
        Ok((score, types, fragment))
    }

    async fn score_impact(&self) -> Result<(f32, Vec<String>, String)> {
        let repo_root = self.repo_root.clone();
        let status = tokio::task::spawn_blocking(move || git_signals::working_tree_status(&repo_root))
            .await
            .map_err(|e| CvError::io(e.to_string()))??;

        let mut changed_files = status.modified.clone();
        changed_files.extend(status.staged.clone());
        changed_files.sort();
        changed_files.dedup();

        if changed_files.is_empty() {
            return Ok((0.0, Vec::new(), "no changed files".to_string()));
        }

        let hub_threshold = self.hub_threshold;
        let mut entries = Vec::new();
        let mut refs = Vec::new();
        let mut max_risk = risk::RiskBucket::Low;
        for file in &changed_files {
            for symbol in self.graph.get_symbols_by_file(file).await? {
                let callers = self
                    .graph
                    .get_edges(EdgeType::Calls, None, Some(&symbol.qualified_name))
                    .await?;
                let callees = self
                    .graph
                    .get_edges(EdgeType::Calls, Some(&symbol.qualified_name), None)
                    .await?;
                let fan_out = callers.len() as u32;
                let touches_hub = (callers.len() + callees.len()) as u32 >= hub_threshold;
                let bucket = risk::bucket(fan_out, touches_hub);
                if matches!(
                    (max_risk, bucket),
                    (risk::RiskBucket::Low, risk::RiskBucket::Medium | risk::RiskBucket::High)
                        | (risk::RiskBucket::Medium, risk::RiskBucket::High)
                ) {
                    max_risk = bucket;
                }
                refs.push(symbol.qualified_name.clone());
                entries.push(format!("{} (fan-out {}, {})", symbol.qualified_name, fan_out, bucket.as_str()));
            }
        }

        let score = match max_risk {
            risk::RiskBucket::Low => 0.2,
            risk::RiskBucket::Medium => 0.6,
            risk::RiskBucket::High => 1.0,
        };
        let fragment = if entries.is_empty() {
            format!("changed files with no graph symbols yet: {}", changed_files.join(", "))
        } else {
            format!("impacted symbols: {}", entries.join(", "))
        };
        Ok((score, refs, fragment))
    }
}

fn overlap_score(query: &str, corpus: &[String]) -> f32 {
    let query_tokens: Vec<String> = query.to_lowercase().split_whitespace().map(str::to_string).collect();
    if query_tokens.is_empty() || corpus.is_empty() {
        return 0.0;
    }
    let corpus_text = corpus.join(" ").to_lowercase();
    let hits = query_tokens.iter().filter(|t| corpus_text.contains(t.as_str())).count();
    (hits as f32 / query_tokens.len() as f32).clamp(0.0, 1.0)
}

fn truncate_bytes(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cv_core::model::{FileNode, SymbolKind, SymbolNode, Visibility};
    use cv_graph::InMemoryGraphStore;
    use cv_vector::InMemoryVectorStore;
    use std::process::Command;

    struct FixedAiProvider;

    #[async_trait]
    impl AiProvider for FixedAiProvider {
        async fn complete(&self, prompt: &str, _max_tokens: u32, _temperature: f32) -> Result<String> {
            Ok(format!("summary-of({})", prompt.len()))
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }
        fn model_id(&self) -> &str {
            "fixed-test-model"
        }
    }

    fn init_repo_with_modified_file() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let run = |args: &[&str]| {
            let status = Command::new("git").args(args).current_dir(dir.path()).status().unwrap();
            assert!(status.success());
        };
        run(&["init", "-q"]);
        run(&["config", "user.email", "test@example.com"]);
        run(&["config", "user.name", "Test"]);
        std::fs::write(dir.path().join("a.rs"), "fn f() {}\n").unwrap();
        run(&["add", "a.rs"]);
        run(&["commit", "-q", "-m", "feat: add f"]);
        std::fs::write(dir.path().join("a.rs"), "fn f() { g(); }\n").unwrap();
        dir
    }

    #[tokio::test]
    async fn dirty_tree_gives_session_dimension_positive_score_with_file_listed() {
        let dir = init_repo_with_modified_file();
        let manifold = ContextManifold::new(
            Arc::new(InMemoryGraphStore::new()),
            Arc::new(InMemoryVectorStore::new()),
            Arc::new(FixedAiProvider),
            dir.path(),
        );

        let result = manifold
            .assemble("", 4096, Weights::default(), OutputFormat::Markdown)
            .await
            .unwrap();

        assert!(!result.fallback);
        assert!(result.dimensions_used.contains(&"session".to_string()));
        let session_dim = result
            .dimensions
            .iter()
            .find(|d| d.dimension.as_str() == "session")
            .unwrap();
        assert!(session_dim.score > 0.0);
        assert!(session_dim.fragment.contains("a.rs"));
        assert!(result.rendered.contains("a.rs"));
    }

    #[tokio::test]
    async fn clean_tree_gives_zero_session_score() {
        let dir = tempfile::tempdir().unwrap();
        let status = Command::new("git").args(["init", "-q"]).current_dir(dir.path()).status().unwrap();
        assert!(status.success());
        let manifold = ContextManifold::new(
            Arc::new(InMemoryGraphStore::new()),
            Arc::new(InMemoryVectorStore::new()),
            Arc::new(FixedAiProvider),
            dir.path(),
        );
        let result = manifold
            .assemble("", 4096, Weights::default(), OutputFormat::Json)
            .await
            .unwrap();
        let session_dim = result
            .dimensions
            .iter()
            .find(|d| d.dimension.as_str() == "session")
            .unwrap();
        assert_eq!(session_dim.score, 0.0);
    }

    #[tokio::test]
    async fn structural_dimension_reports_hub_symbols() {
        let dir = tempfile::tempdir().unwrap();
        Command::new("git").args(["init", "-q"]).current_dir(dir.path()).status().unwrap();
        let graph = Arc::new(InMemoryGraphStore::new());
        graph
            .upsert_file(&FileNode {
                path: "a.rs".into(),
                language: "rust".into(),
                git_hash: "x".into(),
                size: 1,
                lines_of_code: 1,
                complexity: 1,
                last_modified: chrono::Utc::now(),
            })
            .await
            .unwrap();
        graph
            .upsert_symbol(&SymbolNode {
                qualified_name: "a.rs:f".into(),
                name: "f".into(),
                kind: SymbolKind::Function,
                file: "a.rs".into(),
                start_line: 1,
                end_line: 1,
                signature: "fn f()".into(),
                docstring: None,
                visibility: Visibility::Public,
                is_async: false,
                is_static: false,
                complexity: 1,
                vector_ids: vec![],
            })
            .await
            .unwrap();
        let manifold = ContextManifold::new(graph, Arc::new(InMemoryVectorStore::new()), Arc::new(FixedAiProvider), dir.path());
        let result = manifold
            .assemble("", 4096, Weights::default(), OutputFormat::Json)
            .await
            .unwrap();
        let structural = result
            .dimensions
            .iter()
            .find(|d| d.dimension.as_str() == "structural")
            .unwrap();
        assert!(structural.fragment.contains("1 files"));
    }
}
