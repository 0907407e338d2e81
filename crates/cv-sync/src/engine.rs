//! Delta-Sync Engine (spec §4.2): walks the tree, diffs against the
//! `FileLedger`, and routes added/modified/deleted paths through
//! parse -> graph upsert -> vector upsert, respecting the
//! delete-before-add-or-modify ordering guarantee per path.

use crate::ledger::FileLedger;
use crate::lower::{lower_document, lower_source};
use crate::stats::{SyncMode, SyncStats};
use crate::walker::{walk_tree, WalkedFile, WalkedKind};
use cv_core::config::Config;
use cv_core::hash::content_hash;
use cv_core::model::TrackedFileType;
use cv_core::ports::AiProvider;
use cv_core::Result;
use cv_graph::{EdgeType, GraphStore};
use cv_vector::{EmbeddingCache, VectorStore, COLLECTION_CODE_CHUNKS, COLLECTION_DOCUMENT_CHUNKS};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

pub struct SyncEngine {
    graph: Arc<dyn GraphStore>,
    vector: Arc<dyn VectorStore>,
    cache: Arc<EmbeddingCache>,
    ai_provider: Arc<dyn AiProvider>,
    parser: cv_parser::Parser,
    config: Config,
}

/// Per-file lowering results accumulated during the add/modify phase, kept
/// around so a second pass can resolve cross-file CALLS/IMPORTS edges once
/// every file in this tick has been upserted.
struct ProcessedFile {
    path: String,
    language: String,
    symbols_by_name: HashMap<String, String>,
    pending_calls: Vec<(String, String, u32, bool)>,
    imports: Vec<cv_parser::domain::ParsedImport>,
}

/// Default worker-pool size for a sync tick (spec §4.2: "default = number of CPUs").
pub fn default_parallelism() -> usize {
    num_cpus::get()
}

impl SyncEngine {
    pub fn new(
        graph: Arc<dyn GraphStore>,
        vector: Arc<dyn VectorStore>,
        cache: Arc<EmbeddingCache>,
        ai_provider: Arc<dyn AiProvider>,
        config: Config,
    ) -> Self {
        Self {
            graph,
            vector,
            cache,
            ai_provider,
            parser: cv_parser::Parser::new(),
            config,
        }
    }

    pub async fn sync(
        &self,
        root: &Path,
        ledger_path: &Path,
        mode: SyncMode,
        parallelism: usize,
        cancel: &CancellationToken,
    ) -> Result<SyncStats> {
        let mut stats = SyncStats::default();
        let mut ledger = if mode == SyncMode::Full {
            FileLedger::new()
        } else {
            FileLedger::load(ledger_path).await?
        };
        let previous_ledger = FileLedger::load(ledger_path).await?;

        let walked = walk_tree(root, &self.config.sync.exclude_patterns)?;
        let walked_by_path: HashMap<String, &WalkedFile> =
            walked.iter().map(|f| (f.relative_path.clone(), f)).collect();

        let deleted_paths: Vec<String> = previous_ledger
            .tracked_paths()
            .filter(|p| !walked_by_path.contains_key(*p))
            .cloned()
            .collect();

        // Phase 1: deletes complete before any add/modify for the same tick.
        for path in &deleted_paths {
            if cancel.is_cancelled() {
                return Ok(stats);
            }
            match self.process_delete(path).await {
                Ok(()) => {
                    ledger.remove(path);
                    stats.deleted += 1;
                }
                Err(err) => stats.record_error(path.clone(), err.to_string()),
            }
        }

        // Phase 2: classify and process added/modified/unchanged concurrently.
        let semaphore = Arc::new(Semaphore::new(parallelism.max(1)));
        let processed: Arc<Mutex<Vec<ProcessedFile>>> = Arc::new(Mutex::new(Vec::new()));
        let ledger = Arc::new(Mutex::new(ledger));
        let stats = Arc::new(Mutex::new(stats));

        let mut handles = Vec::new();
        for file in walked {
            if cancel.is_cancelled() {
                break;
            }
            let bytes = match tokio::fs::read(&file.absolute_path).await {
                Ok(b) => b,
                Err(err) => {
                    stats.lock().record_error(file.relative_path.clone(), err.to_string());
                    continue;
                }
            };
            let hash = content_hash(&bytes);
            let prev_hash = previous_ledger.get(&file.relative_path).map(|e| e.content_hash.clone());
            let unchanged = mode != SyncMode::Full && mode != SyncMode::Force && prev_hash.as_deref() == Some(hash.as_str());

            if unchanged {
                stats.lock().unchanged += 1;
                continue;
            }
            let is_modified = prev_hash.is_some();

            let permit = tokio::select! {
                permit = semaphore.clone().acquire_owned() => permit.expect("semaphore not closed"),
                _ = cancel.cancelled() => break,
            };
            let graph = self.graph.clone();
            let vector = self.vector.clone();
            let cache = self.cache.clone();
            let ai_provider = self.ai_provider.clone();
            let parser = &self.parser;
            let max_file_size = self.config.max_file_size as usize;
            let ledger = ledger.clone();
            let stats = stats.clone();
            let processed = processed.clone();

            let outcome = parser.parse(&file.relative_path, &bytes, max_file_size);
            let handle = async move {
                let _permit = permit;
                let result = Self::process_one(
                    &file,
                    &hash,
                    bytes.len() as u64,
                    outcome,
                    is_modified,
                    graph,
                    vector,
                    cache,
                    ai_provider,
                )
                .await;
                match result {
                    Ok(Some(pf)) => {
                        processed.lock().push(pf);
                        let mut ledger = ledger.lock();
                        let file_type = match file.kind {
                            WalkedKind::Code => TrackedFileType::Code,
                            WalkedKind::Document => TrackedFileType::Document,
                        };
                        ledger.record(file.relative_path.clone(), hash.clone(), bytes.len() as u64, file_type);
                        let mut stats = stats.lock();
                        if is_modified {
                            stats.modified += 1;
                        } else {
                            stats.added += 1;
                        }
                    }
                    Ok(None) => {
                        // Rejected (binary/oversized/unsupported) — not an error.
                    }
                    Err(err) => {
                        stats.lock().record_error(file.relative_path.clone(), err.to_string());
                    }
                }
            };
            handles.push(tokio::spawn(handle));
        }
        for handle in handles {
            let _ = handle.await;
        }

        if cancel.is_cancelled() {
            // A cancelled tick must leave the ledger untouched rather than
            // persisting a partially-processed walk.
            return Ok(Arc::try_unwrap(stats).map(Mutex::into_inner).unwrap_or_default());
        }

        // Phase 3: resolve cross-file CALLS/IMPORTS edges now that every
        // symbol defined this tick is known.
        let processed = Arc::try_unwrap(processed).map(Mutex::into_inner).unwrap_or_default();
        self.resolve_edges(&processed).await;

        let ledger = Arc::try_unwrap(ledger).map(Mutex::into_inner).unwrap_or_default();
        ledger.save(ledger_path).await?;

        let mut stats = Arc::try_unwrap(stats).map(Mutex::into_inner).unwrap_or_default();

        // Best-effort: `root` may not be a Git working tree at all.
        match crate::commits::ingest_commits(&self.graph, root, crate::commits::DEFAULT_COMMIT_DEPTH).await {
            Ok(n) => stats.commits_ingested = n,
            Err(e) => tracing::debug!(error = %e, "commit ingestion skipped"),
        }

        Ok(stats)
    }

    async fn process_delete(&self, path: &str) -> Result<()> {
        let code_ids: Vec<String> = self
            .graph
            .get_symbols_by_file(path)
            .await?
            .into_iter()
            .flat_map(|s| s.vector_ids)
            .collect();
        let doc_ids = self
            .graph
            .get_document(path)
            .await?
            .map(|d| d.chunk_ids)
            .unwrap_or_default();

        self.graph.delete_file(path).await?;

        if !code_ids.is_empty() {
            self.vector.delete_points(COLLECTION_CODE_CHUNKS, &code_ids).await.ok();
        }
        if !doc_ids.is_empty() {
            self.vector.delete_points(COLLECTION_DOCUMENT_CHUNKS, &doc_ids).await.ok();
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn process_one(
        file: &WalkedFile,
        hash: &str,
        size: u64,
        outcome: Result<cv_parser::ParseOutcome>,
        is_modified: bool,
        graph: Arc<dyn GraphStore>,
        vector: Arc<dyn VectorStore>,
        cache: Arc<EmbeddingCache>,
        ai_provider: Arc<dyn AiProvider>,
    ) -> Result<Option<ProcessedFile>> {
        let outcome = outcome?;
        match outcome {
            cv_parser::ParseOutcome::Rejected { reason } => {
                tracing::debug!(path = %file.relative_path, %reason, "file rejected by parser");
                Ok(None)
            }
            cv_parser::ParseOutcome::Source(parsed) => {
                let previous_symbols = if is_modified {
                    graph.get_symbols_by_file(&file.relative_path).await?
                } else {
                    Vec::new()
                };

                let lowered = lower_source(&file.relative_path, hash, size, &parsed);
                graph.upsert_file(&lowered.file).await?;

                let mut symbols_by_name = HashMap::new();
                let mut current_names: HashSet<&str> = HashSet::new();
                for symbol in &lowered.symbols {
                    current_names.insert(symbol.qualified_name.as_str());
                    symbols_by_name.insert(symbol.name.clone(), symbol.qualified_name.clone());
                    graph.upsert_symbol(symbol).await?;
                    graph
                        .create_edge(
                            EdgeType::Defines,
                            &file.relative_path,
                            &symbol.qualified_name,
                            serde_json::json!({ "line": symbol.start_line }),
                        )
                        .await?;
                }

                // A shrunk file may drop symbols that survived the previous
                // tick; they must be removed from the graph and their vector
                // chunks swept, not just left stranded (spec §9 iii).
                let mut removed_chunk_ids = Vec::new();
                for old in &previous_symbols {
                    if !current_names.contains(old.qualified_name.as_str()) {
                        graph.delete_symbol(&old.qualified_name).await?;
                        removed_chunk_ids.extend(old.vector_ids.iter().cloned());
                    }
                }
                if !removed_chunk_ids.is_empty() {
                    vector.delete_points(COLLECTION_CODE_CHUNKS, &removed_chunk_ids).await.ok();
                }

                embed_and_upsert_chunks(
                    &cache,
                    &ai_provider,
                    &vector,
                    COLLECTION_CODE_CHUNKS,
                    lowered.chunks.iter().map(|c| (c.id.clone(), c.text.clone())).collect(),
                    &file.relative_path,
                    &lowered.file.language,
                )
                .await?;

                Ok(Some(ProcessedFile {
                    path: file.relative_path.clone(),
                    language: lowered.file.language.clone(),
                    symbols_by_name,
                    pending_calls: lowered.pending_calls,
                    imports: lowered.imports,
                }))
            }
            cv_parser::ParseOutcome::Document(doc) => {
                let lowered = lower_document(&file.relative_path, &doc);
                graph.upsert_document(&lowered.document).await?;

                embed_and_upsert_chunks(
                    &cache,
                    &ai_provider,
                    &vector,
                    COLLECTION_DOCUMENT_CHUNKS,
                    lowered.chunks.iter().map(|c| (c.id.clone(), c.text.clone())).collect(),
                    &file.relative_path,
                    "markdown",
                )
                .await?;

                Ok(Some(ProcessedFile {
                    path: file.relative_path.clone(),
                    language: "markdown".to_string(),
                    symbols_by_name: HashMap::new(),
                    pending_calls: Vec::new(),
                    imports: Vec::new(),
                }))
            }
        }
    }

    async fn resolve_edges(&self, processed: &[ProcessedFile]) {
        let mut global_index: HashMap<String, String> = HashMap::new();
        for pf in processed {
            for (name, qualified) in &pf.symbols_by_name {
                global_index.entry(name.clone()).or_insert_with(|| qualified.clone());
            }
        }

        for pf in processed {
            for (caller, callee_name, line, is_conditional) in &pf.pending_calls {
                if let Some(callee) = global_index.get(callee_name) {
                    if callee == caller {
                        continue;
                    }
                    let _ = self
                        .graph
                        .create_edge(
                            EdgeType::Calls,
                            caller,
                            callee,
                            serde_json::json!({ "line": line, "call_count": 1, "is_conditional": is_conditional }),
                        )
                        .await;
                }
            }

            for import in &pf.imports {
                if import.is_external {
                    continue;
                }
                let resolved = resolve_relative_import(&pf.path, &import.source, &pf.language);
                if processed.iter().any(|p| p.path == resolved) {
                    let _ = self
                        .graph
                        .create_edge(
                            EdgeType::Imports,
                            &pf.path,
                            &resolved,
                            serde_json::json!({
                                "line": import.line,
                                "imported_symbols": import.imported_symbols,
                            }),
                        )
                        .await;
                }
            }
        }
    }
}

fn resolve_relative_import(from_path: &str, import_source: &str, language: &str) -> String {
    let dir = from_path.rsplit_once('/').map(|(d, _)| d).unwrap_or("");
    let joined = if dir.is_empty() {
        import_source.trim_start_matches("./").to_string()
    } else {
        format!("{dir}/{}", import_source.trim_start_matches("./"))
    };
    let ext = match language {
        "typescript" => "ts",
        "python" => "py",
        "go" => "go",
        _ => "rs",
    };
    if joined.ends_with(&format!(".{ext}")) {
        joined
    } else {
        format!("{joined}.{ext}")
    }
}

async fn embed_and_upsert_chunks(
    cache: &EmbeddingCache,
    ai_provider: &Arc<dyn AiProvider>,
    vector: &Arc<dyn VectorStore>,
    collection: &str,
    chunks: Vec<(String, String)>,
    path: &str,
    language: &str,
) -> Result<()> {
    if chunks.is_empty() {
        return Ok(());
    }
    let texts: Vec<String> = chunks.iter().map(|(_, t)| t.clone()).collect();
    let (mut cached, missing) = cache.get_batch(&texts, ai_provider.model_id());

    if !missing.is_empty() {
        let embeddings = ai_provider.embed(&missing).await?;
        let fresh: Vec<(String, Vec<f32>)> = missing.into_iter().zip(embeddings).collect();
        cache.set_batch(fresh.clone(), ai_provider.model_id()).await?;
        for (text, vector) in fresh {
            cached.insert(text, vector);
        }
    }

    for (id, text) in &chunks {
        if let Some(vector_values) = cached.get(text) {
            vector
                .upsert(
                    collection,
                    id,
                    vector_values.clone(),
                    serde_json::json!({ "file": path, "language": language }),
                )
                .await?;
        }
    }
    Ok(())
}
