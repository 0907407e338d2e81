//! ContextVault server process entrypoint (spec §6): loads `.cv/` state,
//! wires the real backends, and serves the Tool Dispatcher over stdio.
//! Grounded on `dk-server::main`'s clap + tracing-subscriber + engine-then-serve
//! shape, minus the gRPC transport the teacher uses (cv-dispatcher's
//! line-framed stdio stands in for it — see `cv_dispatcher::lib` doc comment).

mod layout;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use cv_core::config::Config;
use cv_core::ports::AiProvider;
use cv_dispatcher::Dispatcher;
use cv_graph::{FalkorGraphStore, GraphStore};
use cv_manifold::ContextManifold;
use cv_sync::SyncEngine;
use cv_traversal::{FsSourceProvider, TraversalEngine};
use cv_vector::{EmbeddingCache, OllamaAiProvider, QdrantVectorStore, VectorStore};
use tracing_subscriber::EnvFilter;

use layout::Layout;

#[derive(Parser)]
#[command(name = "cv-server", about = "ContextVault — AI-native code intelligence layer")]
struct Cli {
    /// Working tree root to index and serve context for
    #[arg(long, env = "CV_REPO_ROOT", default_value = ".")]
    repo_root: PathBuf,

    /// Start the graph/vector/embedding backends via Docker if not reachable
    #[arg(long)]
    autostart_infra: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cv=info")))
        .init();

    let cli = Cli::parse();
    let repo_root = cli.repo_root.canonicalize().unwrap_or(cli.repo_root);

    if let Err(e) = run(repo_root, cli.autostart_infra).await {
        tracing::error!(error = %e, "server exited with a recoverable failure");
        // Spec §6 exit codes: 0 success, 1 recoverable failure. An OOM-kill
        // surfaces as 137 from the OS directly; nothing to trap here.
        std::process::exit(1);
    }
    Ok(())
}

async fn run(repo_root: PathBuf, autostart_infra: bool) -> Result<()> {
    let layout = Layout::new(&repo_root);
    layout.ensure_dirs().await.context("creating .cv/ directories")?;
    let manifest = layout.load_or_create_manifest().await.context("loading .cv/manifest.json")?;
    tracing::info!(repo_id = %manifest.repository_id, root = %repo_root.display(), "repository identified");

    let env: HashMap<String, String> = std::env::vars().collect();
    let config = Config::load(&layout.config_path(), &env).context("loading .cv/config.json")?;

    if autostart_infra {
        let supervisor = cv_infra::Supervisor::new();
        supervisor.ensure_graph().await.context("starting graph backend")?;
        supervisor.ensure_vector().await.context("starting vector backend")?;
        supervisor.ensure_embedding().await.context("starting embedding backend")?;
    }

    let graph: Arc<dyn GraphStore> =
        Arc::new(FalkorGraphStore::connect(&config.graph.url, Some(&manifest.repository_id)).await.context("connecting to graph backend")?);
    let vector: Arc<dyn VectorStore> =
        Arc::new(QdrantVectorStore::new(config.vector.url.clone(), Some(manifest.repository_id.clone())));
    let ai: Arc<dyn AiProvider> = Arc::new(OllamaAiProvider::new(config.embedding.url.clone(), config.embedding.model.clone()));

    let cache = Arc::new(
        EmbeddingCache::load(layout.embedding_cache_dir().join("cache.jsonl"))
            .await
            .context("loading .cv/cache/embeddings/cache.jsonl")?,
    );
    let sync = Arc::new(SyncEngine::new(graph.clone(), vector.clone(), cache, ai.clone(), config.clone()));

    let source: Arc<dyn cv_traversal::SourceProvider> = Arc::new(FsSourceProvider::new(repo_root.clone()));
    let traversal = Arc::new(TraversalEngine::new(graph.clone(), vector.clone(), source, layout.sessions_dir()));

    // No `GitPlatform` adapter is wired by default: this workspace carries no
    // concrete requirements/PRD client, so the manifold's "requirements"
    // dimension always scores 0 until one is added.
    let manifold = Arc::new(ContextManifold::new(graph.clone(), vector.clone(), ai.clone(), repo_root.clone()));

    let authored = Arc::new(cv_authored::AuthoredLog::load(layout.authored_path()).await.context("loading .cv/authored.jsonl")?);

    let dispatcher = Dispatcher::new(graph, vector, ai, sync, traversal, manifold, authored, repo_root);

    tracing::info!("serving tool dispatcher over stdio");
    cv_dispatcher::transport::serve_stdio(&dispatcher).await.context("stdio transport loop")?;
    Ok(())
}
