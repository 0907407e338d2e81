//! Persisted manifold state (`.cv/manifold/state.json`, spec §4.7/§6):
//! a snapshot of each dimension's last signal, used only to detect that
//! the manifold has run before — its absence is the steady first-run
//! case, not an error (see `ContextManifold::assemble`'s fallback rule
//! in `manifold.rs`).

use crate::dimension::Dimension;
use chrono::{DateTime, Utc};
use cv_core::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionSnapshot {
    pub last_score: f32,
    pub last_refs: Vec<String>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManifoldState {
    pub dimensions: HashMap<String, DimensionSnapshot>,
}

impl ManifoldState {
    pub fn record(&mut self, dim: Dimension, score: f32, refs: Vec<String>) {
        self.dimensions.insert(
            dim.as_str().to_string(),
            DimensionSnapshot {
                last_score: score,
                last_refs: refs,
                last_updated: Utc::now(),
            },
        );
    }
}

pub async fn load(path: &Path) -> Option<ManifoldState> {
    let bytes = fs::read(path).await.ok()?;
    serde_json::from_slice(&bytes).ok()
}

pub async fn save(path: &Path, state: &ManifoldState) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_vec_pretty(state)?;
    let mut file = fs::File::create(path).await?;
    file.write_all(&json).await?;
    file.sync_all().await?;
    Ok(())
}

pub fn default_state_path(repo_root: &Path) -> PathBuf {
    repo_root.join(".cv").join("manifold").join("state.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_state_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(&dir.path().join("state.json")).await.is_none());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let mut state = ManifoldState::default();
        state.record(Dimension::Session, 1.0, vec!["src/a.ts".into()]);
        save(&path, &state).await.unwrap();
        let loaded = load(&path).await.unwrap();
        assert_eq!(loaded.dimensions.get("session").unwrap().last_score, 1.0);
    }
}
