//! Sync-tick scenarios (spec §4.2, §8): a full walk of a small repo, a
//! repeat tick that sees no changes, and a tick that observes a deletion.

use cv_core::config::Config;
use cv_core::ports::AiProvider;
use cv_core::Result;
use cv_graph::{GraphStore, InMemoryGraphStore};
use cv_sync::{SyncEngine, SyncMode};
use cv_vector::{EmbeddingCache, InMemoryVectorStore};
use std::fs;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

struct FakeAiProvider;

#[async_trait::async_trait]
impl AiProvider for FakeAiProvider {
    async fn complete(&self, _prompt: &str, _max_tokens: u32, _temperature: f32) -> Result<String> {
        Ok(String::new())
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
    }
    fn model_id(&self) -> &str {
        "fake-model"
    }
}

fn engine() -> (SyncEngine, Arc<InMemoryGraphStore>) {
    let graph = Arc::new(InMemoryGraphStore::new());
    let engine = SyncEngine::new(
        graph.clone(),
        Arc::new(InMemoryVectorStore::new()),
        Arc::new(EmbeddingCache::new()),
        Arc::new(FakeAiProvider),
        Config::default(),
    );
    (engine, graph)
}

#[tokio::test]
async fn fresh_sync_on_three_file_repo_produces_expected_graph() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("README.md"), "# R\n## S\ntext\n").unwrap();
    fs::create_dir_all(dir.path().join("src")).unwrap();
    fs::write(dir.path().join("src/a.ts"), "export function f() { g(); }").unwrap();
    fs::write(dir.path().join("src/b.ts"), "import {f} from './a'; export function g(){}").unwrap();

    let (engine, graph) = engine();
    let ledger_path = dir.path().join(".cv-ledger.json");
    let stats = engine
        .sync(dir.path(), &ledger_path, SyncMode::Full, 2, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(stats.added, 3);
    assert!(stats.errors.is_empty());

    let a_symbol = graph.get_symbol("src/a.ts:f").await.unwrap();
    let b_symbol = graph.get_symbol("src/b.ts:g").await.unwrap();
    assert!(a_symbol.is_some());
    assert!(b_symbol.is_some());

    let graph_stats = graph.get_stats().await.unwrap();
    assert_eq!(graph_stats.file_count, 2);
    assert_eq!(graph_stats.symbol_count, 2);
    // DEFINES x2 + IMPORTS x1 + CALLS x1 = 4
    assert_eq!(graph_stats.edge_count, 4);
}

#[tokio::test]
async fn second_sync_with_unchanged_files_reports_unchanged_not_modified() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.rs"), "pub fn f() {}").unwrap();
    let (engine, _graph) = engine();
    let ledger_path = dir.path().join(".cv-ledger.json");
    engine.sync(dir.path(), &ledger_path, SyncMode::Incremental, 2, &CancellationToken::new()).await.unwrap();
    let stats = engine.sync(dir.path(), &ledger_path, SyncMode::Incremental, 2, &CancellationToken::new()).await.unwrap();
    assert_eq!(stats.unchanged, 1);
    assert_eq!(stats.added, 0);
}

#[tokio::test]
async fn deleting_a_file_between_syncs_removes_it_from_the_graph() {
    let dir = tempfile::tempdir().unwrap();
    let file_path = dir.path().join("a.rs");
    fs::write(&file_path, "pub fn f() {}").unwrap();
    let (engine, graph) = engine();
    let ledger_path = dir.path().join(".cv-ledger.json");
    engine.sync(dir.path(), &ledger_path, SyncMode::Incremental, 2, &CancellationToken::new()).await.unwrap();

    fs::remove_file(&file_path).unwrap();
    let stats = engine.sync(dir.path(), &ledger_path, SyncMode::Incremental, 2, &CancellationToken::new()).await.unwrap();
    assert_eq!(stats.deleted, 1);
    assert!(graph.get_file("a.rs").await.unwrap().is_none());
}

#[tokio::test]
async fn shrinking_a_file_drops_its_removed_symbols() {
    let dir = tempfile::tempdir().unwrap();
    let file_path = dir.path().join("a.rs");
    fs::write(&file_path, "pub fn f() {}\npub fn g() {}").unwrap();
    let (engine, graph) = engine();
    let ledger_path = dir.path().join(".cv-ledger.json");
    engine.sync(dir.path(), &ledger_path, SyncMode::Incremental, 2, &CancellationToken::new()).await.unwrap();
    assert!(graph.get_symbol("a.rs:g").await.unwrap().is_some());

    fs::write(&file_path, "pub fn f() {}").unwrap();
    engine.sync(dir.path(), &ledger_path, SyncMode::Incremental, 2, &CancellationToken::new()).await.unwrap();

    assert!(graph.get_symbol("a.rs:f").await.unwrap().is_some());
    assert!(graph.get_symbol("a.rs:g").await.unwrap().is_none());
}

#[tokio::test]
async fn a_sync_cancelled_before_it_starts_leaves_the_ledger_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.rs"), "pub fn f() {}").unwrap();
    let (engine, _graph) = engine();
    let ledger_path = dir.path().join(".cv-ledger.json");

    let cancel = CancellationToken::new();
    cancel.cancel();
    let stats = engine.sync(dir.path(), &ledger_path, SyncMode::Full, 2, &cancel).await.unwrap();

    assert_eq!(stats.added, 0);
    assert!(!ledger_path.exists());
}
