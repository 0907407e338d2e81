//! Infrastructure Supervisor (spec §4.8): autostart/health for the graph
//! DB, vector DB, and embedding server, exposed as the narrow
//! `ensure_*` interface spec §9's "Message passing for infra supervision"
//! design note calls for — callers hold only the returned URL, never the
//! subprocess state.

use std::time::Duration;

use cv_core::Result;
use serde::{Deserialize, Serialize};

use crate::docker::{self, ContainerState};
use crate::health;
use crate::port;

const DEFAULT_TIMEOUT_SECS: u64 = 20;
const DEFAULT_POLL_MS: u64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Graph,
    Vector,
    Embedding,
}

impl BackendKind {
    fn container_name(&self) -> &'static str {
        match self {
            BackendKind::Graph => "cv-falkordb",
            BackendKind::Vector => "cv-qdrant",
            BackendKind::Embedding => "cv-ollama",
        }
    }

    fn image(&self) -> &'static str {
        match self {
            BackendKind::Graph => "falkordb/falkordb:latest",
            BackendKind::Vector => "qdrant/qdrant:latest",
            BackendKind::Embedding => "ollama/ollama:latest",
        }
    }

    fn container_port(&self) -> u16 {
        match self {
            BackendKind::Graph => 6379,
            BackendKind::Vector => 6333,
            BackendKind::Embedding => 11434,
        }
    }

    fn default_host_port(&self) -> u16 {
        self.container_port()
    }
}

/// Returned to callers who must hold only a URL, not subprocess state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendHandle {
    pub url: String,
    pub started: bool,
}

pub struct Supervisor {
    docker_bin: String,
    timeout: Duration,
    poll: Duration,
}

impl Default for Supervisor {
    fn default() -> Self {
        Self {
            docker_bin: "docker".to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            poll: Duration::from_millis(DEFAULT_POLL_MS),
        }
    }
}

impl Supervisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn ensure_graph(&self) -> Result<BackendHandle> {
        self.ensure(BackendKind::Graph).await
    }

    pub async fn ensure_vector(&self) -> Result<BackendHandle> {
        self.ensure(BackendKind::Vector).await
    }

    pub async fn ensure_embedding(&self) -> Result<BackendHandle> {
        self.ensure(BackendKind::Embedding).await
    }

    /// Streams `ollama pull <model>` progress lines via `on_progress`
    /// (spec §4.8 step 5). Assumes the embedding container is already up.
    pub async fn ensure_model_pulled(
        &self,
        model: &str,
        on_progress: impl FnMut(String) + Send,
    ) -> Result<()> {
        let name = BackendKind::Embedding.container_name();
        docker::exec_streaming(&self.docker_bin, name, &["ollama", "pull", model], on_progress).await
    }

    async fn ensure(&self, kind: BackendKind) -> Result<BackendHandle> {
        let name = kind.container_name();
        let state = docker::inspect_status(&self.docker_bin, name).await?;

        let (host_port, started) = match state {
            ContainerState::Running => {
                tracing::info!(container = name, "backend already running");
                (kind.default_host_port(), false)
            }
            ContainerState::Exited | ContainerState::Other => {
                tracing::info!(container = name, "starting stopped backend");
                docker::start(&self.docker_bin, name).await?;
                (kind.default_host_port(), true)
            }
            ContainerState::Created => {
                tracing::warn!(container = name, "backend stuck in created state, recreating");
                docker::remove(&self.docker_bin, name).await?;
                let host_port = port::find_available_port(kind.default_host_port())?;
                docker::run_detached(&self.docker_bin, name, kind.image(), host_port, kind.container_port()).await?;
                (host_port, true)
            }
            ContainerState::Missing => {
                let host_port = port::find_available_port(kind.default_host_port())?;
                tracing::info!(container = name, port = host_port, "launching new backend");
                docker::run_detached(&self.docker_bin, name, kind.image(), host_port, kind.container_port()).await?;
                (host_port, true)
            }
        };

        let url = backend_url(kind, host_port);
        let healthy = self.wait_healthy(kind, &url).await?;
        if !healthy {
            return Err(cv_core::CvError::timeout(format!(
                "{name} did not become healthy within {:?}",
                self.timeout
            )));
        }
        Ok(BackendHandle { url, started })
    }

    async fn wait_healthy(&self, kind: BackendKind, url: &str) -> Result<bool> {
        let url = url.to_string();
        match kind {
            BackendKind::Graph => {
                health::wait_until_healthy(|| health::graph_ping(&url), self.timeout, self.poll).await
            }
            BackendKind::Vector => {
                let health_url = format!("{url}/readyz");
                health::wait_until_healthy(|| health::http_get_ok(&health_url), self.timeout, self.poll).await
            }
            BackendKind::Embedding => {
                let health_url = format!("{url}/api/tags");
                health::wait_until_healthy(|| health::http_get_ok(&health_url), self.timeout, self.poll).await
            }
        }
    }
}

fn backend_url(kind: BackendKind, port: u16) -> String {
    match kind {
        BackendKind::Graph => format!("redis://127.0.0.1:{port}"),
        BackendKind::Vector => format!("http://127.0.0.1:{port}"),
        BackendKind::Embedding => format!("http://127.0.0.1:{port}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_url_uses_scheme_per_kind() {
        assert_eq!(backend_url(BackendKind::Graph, 6379), "redis://127.0.0.1:6379");
        assert_eq!(backend_url(BackendKind::Vector, 6333), "http://127.0.0.1:6333");
    }

    #[test]
    fn container_names_are_stable() {
        assert_eq!(BackendKind::Graph.container_name(), "cv-falkordb");
        assert_eq!(BackendKind::Vector.container_name(), "cv-qdrant");
        assert_eq!(BackendKind::Embedding.container_name(), "cv-ollama");
    }
}
