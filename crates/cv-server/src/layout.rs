//! The `.cv/` persisted-state layout (spec §6). One struct owns every path
//! so the rest of the binary never hardcodes a filename.

use chrono::{DateTime, Utc};
use cv_core::{CvError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(rename = "repository.id")]
    pub repository_id: String,
    pub created_at: DateTime<Utc>,
}

pub struct Layout {
    pub root: PathBuf,
}

impl Layout {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self { root: repo_root.into().join(".cv") }
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.json")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join("manifest.json")
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.root.join("file_ledger.json")
    }

    pub fn authored_path(&self) -> PathBuf {
        self.root.join("authored.jsonl")
    }

    pub fn ingestion_path(&self) -> PathBuf {
        self.root.join("ingestion.jsonl")
    }

    pub fn documents_dir(&self) -> PathBuf {
        self.root.join("documents")
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.root.join("sessions")
    }

    pub fn manifold_state_path(&self) -> PathBuf {
        self.root.join("manifold").join("state.json")
    }

    pub fn embedding_cache_dir(&self) -> PathBuf {
        self.root.join("cache").join("embeddings")
    }

    pub fn codebase_summary_path(&self) -> PathBuf {
        self.root.join("codebase-summary.json")
    }

    /// Creates every directory this layout names; files are created lazily
    /// by their owning subsystem on first write.
    pub async fn ensure_dirs(&self) -> Result<()> {
        for dir in [self.documents_dir(), self.sessions_dir(), self.embedding_cache_dir(), self.root.join("manifold")] {
            tokio::fs::create_dir_all(&dir).await.map_err(CvError::from)?;
        }
        Ok(())
    }

    /// Loads `manifest.json`, creating a fresh one (new repo id) if absent.
    /// `repoId` is the isolation key graph/vector namespacing hangs off of.
    pub async fn load_or_create_manifest(&self) -> Result<Manifest> {
        let path = self.manifest_path();
        if path.exists() {
            let text = tokio::fs::read_to_string(&path).await.map_err(CvError::from)?;
            return serde_json::from_str(&text).map_err(|e| CvError::config(format!("invalid manifest.json: {e}")));
        }
        let manifest = Manifest { repository_id: uuid::Uuid::new_v4().to_string(), created_at: Utc::now() };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(CvError::from)?;
        }
        let text = serde_json::to_string_pretty(&manifest).map_err(CvError::from)?;
        tokio::fs::write(&path, text).await.map_err(CvError::from)?;
        Ok(manifest)
    }
}

pub fn default_repo_root() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn manifest_is_created_on_first_load_and_stable_on_second() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path());
        let first = layout.load_or_create_manifest().await.unwrap();
        let second = layout.load_or_create_manifest().await.unwrap();
        assert_eq!(first.repository_id, second.repository_id);
    }

    #[tokio::test]
    async fn ensure_dirs_creates_every_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path());
        layout.ensure_dirs().await.unwrap();
        assert!(layout.sessions_dir().is_dir());
        assert!(layout.documents_dir().is_dir());
        assert!(layout.embedding_cache_dir().is_dir());
    }
}
