//! Authored Metadata Log (spec §3, §9 "per-repo process-wide state"):
//! human-authored document frontmatter, manual relationships, and
//! annotations that survive a full graph `clear()`. Append-only on disk,
//! in-memory map for reads. Grounded on `dk-engine::storage::LocalStore`'s
//! lazy-load-then-mutate-in-place shape, applied here to a JSON-lines
//! sidecar instead of a blob store.

use cv_core::model::AuthoredEntry;
use cv_core::{CvError, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct ImportStats {
    pub imported: u64,
    pub updated: u64,
    pub skipped: u64,
}

/// Lazily loaded, append-only sidecar. One writer per process (spec §5);
/// concurrent multi-process writers are unsupported by design.
pub struct AuthoredLog {
    path: PathBuf,
    entries: RwLock<HashMap<String, AuthoredEntry>>,
}

impl AuthoredLog {
    /// Loads `path` if it exists (empty map otherwise). Malformed lines are
    /// skipped and logged rather than failing the whole load.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut entries: HashMap<String, AuthoredEntry> = HashMap::new();
        if path.exists() {
            let text = tokio::fs::read_to_string(&path).await.map_err(CvError::from)?;
            for (lineno, line) in text.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<AuthoredEntry>(line) {
                    Ok(entry) => merge_latest(&mut entries, entry),
                    Err(err) => {
                        tracing::warn!(%err, line = lineno, "skipping malformed authored entry");
                    }
                }
            }
        }
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    /// Appends one entry to disk and updates the in-memory map; `updated_at`
    /// resolves ties against an existing entry with the same id.
    pub async fn append(&self, entry: AuthoredEntry) -> Result<()> {
        let line = serde_json::to_string(&entry).map_err(CvError::from)?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(CvError::from)?;
        }
        use tokio::io::AsyncWriteExt;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(CvError::from)?;
        file.write_all(line.as_bytes()).await.map_err(CvError::from)?;
        file.write_all(b"\n").await.map_err(CvError::from)?;
        file.sync_all().await.map_err(CvError::from)?;
        self.entries.write().insert(entry.id.clone(), entry);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<AuthoredEntry> {
        self.entries.read().get(id).cloned()
    }

    pub fn list(&self) -> Vec<AuthoredEntry> {
        self.entries.read().values().cloned().collect()
    }

    pub fn list_by_path(&self, path: &str) -> Vec<AuthoredEntry> {
        self.entries
            .read()
            .values()
            .filter(|e| e.path.as_deref() == Some(path))
            .cloned()
            .collect()
    }

    /// Writes every entry to a standalone JSON-lines bundle (SPEC_FULL
    /// supplement — the export half of the export/import round-trip).
    pub async fn export(&self, bundle_path: &Path) -> Result<u64> {
        let entries = self.list();
        let mut out = String::new();
        for entry in &entries {
            out.push_str(&serde_json::to_string(entry).map_err(CvError::from)?);
            out.push('\n');
        }
        tokio::fs::write(bundle_path, out).await.map_err(CvError::from)?;
        Ok(entries.len() as u64)
    }

    /// Imports a bundle previously produced by `export`. Entries are keyed
    /// by `id`; an entry already present with an equal-or-newer
    /// `updated_at` is skipped, never re-appended (spec §8 round-trip
    /// property: re-importing a repo's own export yields 0/0/N).
    pub async fn import(&self, bundle_path: &Path) -> Result<ImportStats> {
        let text = tokio::fs::read_to_string(bundle_path).await.map_err(CvError::from)?;
        let mut stats = ImportStats::default();
        for line in text.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let incoming: AuthoredEntry = serde_json::from_str(line).map_err(CvError::from)?;
            let existing = self.entries.read().get(&incoming.id).cloned();
            match existing {
                None => {
                    self.append(incoming).await?;
                    stats.imported += 1;
                }
                Some(current) if incoming.updated_at > current.updated_at => {
                    self.append(incoming).await?;
                    stats.updated += 1;
                }
                Some(_) => stats.skipped += 1,
            }
        }
        Ok(stats)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn merge_latest(entries: &mut HashMap<String, AuthoredEntry>, entry: AuthoredEntry) {
    match entries.get(&entry.id) {
        Some(existing) if existing.updated_at >= entry.updated_at => {}
        _ => {
            entries.insert(entry.id.clone(), entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use cv_core::model::AuthoredPayload;

    fn sample(id: &str, path: &str) -> AuthoredEntry {
        AuthoredEntry {
            id: id.to_string(),
            path: Some(path.to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            created_by: Some("alice".into()),
            git_commit: None,
            payload: AuthoredPayload::Annotation {
                target: path.to_string(),
                note: "reviewed".into(),
            },
        }
    }

    #[tokio::test]
    async fn append_then_reload_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("authored.jsonl");
        let log = AuthoredLog::load(&path).await.unwrap();
        log.append(sample("a1", "README.md")).await.unwrap();

        let reloaded = AuthoredLog::load(&path).await.unwrap();
        assert_eq!(reloaded.len(), 1);
        assert!(reloaded.get("a1").is_some());
    }

    #[tokio::test]
    async fn latest_updated_at_wins_on_duplicate_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("authored.jsonl");
        let log = AuthoredLog::load(&path).await.unwrap();

        let mut first = sample("a1", "README.md");
        first.updated_at = Utc::now() - chrono::Duration::seconds(10);
        log.append(first).await.unwrap();

        let mut second = sample("a1", "README.md");
        if let AuthoredPayload::Annotation { note, .. } = &mut second.payload {
            *note = "updated note".into();
        }
        log.append(second.clone()).await.unwrap();

        let reloaded = AuthoredLog::load(&path).await.unwrap();
        assert_eq!(reloaded.len(), 1);
        let got = reloaded.get("a1").unwrap();
        assert_eq!(got.updated_at, second.updated_at);
    }

    #[tokio::test]
    async fn export_then_reimport_into_source_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("authored.jsonl");
        let log = AuthoredLog::load(&path).await.unwrap();
        log.append(sample("a1", "README.md")).await.unwrap();
        log.append(sample("a2", "docs/guide.md")).await.unwrap();

        let bundle = dir.path().join("bundle.jsonl");
        let exported = log.export(&bundle).await.unwrap();
        assert_eq!(exported, 2);

        let stats = log.import(&bundle).await.unwrap();
        assert_eq!((stats.imported, stats.updated, stats.skipped), (0, 0, 2));
    }

    #[tokio::test]
    async fn import_into_fresh_log_counts_as_imported() {
        let dir = tempfile::tempdir().unwrap();
        let source_path = dir.path().join("authored.jsonl");
        let source = AuthoredLog::load(&source_path).await.unwrap();
        source.append(sample("a1", "README.md")).await.unwrap();
        let bundle = dir.path().join("bundle.jsonl");
        source.export(&bundle).await.unwrap();

        let fresh_path = dir.path().join("other_authored.jsonl");
        let fresh = AuthoredLog::load(&fresh_path).await.unwrap();
        let stats = fresh.import(&bundle).await.unwrap();
        assert_eq!((stats.imported, stats.updated, stats.skipped), (1, 0, 0));
    }
}
