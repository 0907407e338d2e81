//! File ledger (spec §4.2, §3): path -> content-hash record that drives the
//! four-way delta. Rewritten atomically (temp file + rename) so a crash
//! mid-sync leaves the last-known-good ledger in place.

use chrono::Utc;
use cv_core::model::{LedgerEntry, TrackedFileType};
use cv_core::{CvError, Result};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Default, Clone)]
pub struct FileLedger {
    pub entries: HashMap<String, LedgerEntry>,
}

impl FileLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| CvError::io(format!("reading ledger {}: {e}", path.display())).with_source(e))?;
        let entries: HashMap<String, LedgerEntry> = serde_json::from_slice(&bytes)
            .map_err(|e| CvError::io(format!("parsing ledger {}: {e}", path.display())).with_source(e))?;
        Ok(Self { entries })
    }

    /// Atomic: write to a sibling temp file, then rename over the target.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let tmp_path = path.with_extension("tmp");
        let bytes = serde_json::to_vec_pretty(&self.entries).map_err(CvError::from)?;
        tokio::fs::write(&tmp_path, &bytes)
            .await
            .map_err(|e| CvError::io(format!("writing ledger temp file: {e}")).with_source(e))?;
        tokio::fs::rename(&tmp_path, path)
            .await
            .map_err(|e| CvError::io(format!("renaming ledger temp file: {e}")).with_source(e))?;
        Ok(())
    }

    pub fn get(&self, path: &str) -> Option<&LedgerEntry> {
        self.entries.get(path)
    }

    pub fn record(&mut self, path: String, content_hash: String, size: u64, file_type: TrackedFileType) {
        self.entries.insert(
            path,
            LedgerEntry {
                content_hash,
                size,
                file_type,
                last_synced_at: Utc::now(),
            },
        );
    }

    pub fn remove(&mut self, path: &str) {
        self.entries.remove(path);
    }

    pub fn tracked_paths(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_through_atomic_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let ledger_path = dir.path().join("ledger.json");
        let mut ledger = FileLedger::new();
        ledger.record("src/a.rs".to_string(), "hash1".to_string(), 10, TrackedFileType::Code);
        ledger.save(&ledger_path).await.unwrap();

        let reloaded = FileLedger::load(&ledger_path).await.unwrap();
        assert_eq!(reloaded.get("src/a.rs").unwrap().content_hash, "hash1");
    }

    #[tokio::test]
    async fn missing_ledger_file_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ledger_path = dir.path().join("missing.json");
        let ledger = FileLedger::load(&ledger_path).await.unwrap();
        assert!(ledger.entries.is_empty());
    }
}
