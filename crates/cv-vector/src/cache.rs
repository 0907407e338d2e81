//! Embedding Cache (spec §4.4): content-addressed `hash(normalize(text) ⊕
//! model) -> vector`, batch miss detection, LRU eviction by byte budget.
//! File-backed with fsync on append (spec §5), mirroring
//! `cv_authored::log::AuthoredLog`'s lazy-load-then-append-in-place shape
//! applied here to a JSON-lines record per cached vector.

use chrono::{DateTime, Utc};
use cv_core::hash::embedding_cache_key;
use cv_core::{CvError, Result};
use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub bytes: u64,
    pub entries: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ImportStats {
    pub imported: u64,
    pub skipped: u64,
}

/// One persisted cache entry (SPEC_FULL bundle format: `{hash, model,
/// vector, bytes, last_access}`). `hash` is the same key `embedding_cache_key`
/// produces, stored explicitly since a JSON-lines record must stand alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheRecord {
    hash: String,
    model: String,
    vector: Vec<f32>,
    bytes: u64,
    last_access: DateTime<Utc>,
}

struct Entry {
    vector: Vec<f32>,
    model: String,
    bytes: u64,
    last_access: DateTime<Utc>,
}

struct Inner {
    entries: LruCache<String, Entry>,
    stats: CacheStats,
}

/// Default capacity is generous; real eviction happens via `evict_lru`
/// against a byte budget, not entry count.
const DEFAULT_CAPACITY: usize = 1_000_000;

pub struct EmbeddingCache {
    inner: Mutex<Inner>,
    path: Option<PathBuf>,
}

impl EmbeddingCache {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: LruCache::new(NonZeroUsize::new(DEFAULT_CAPACITY).unwrap()),
                stats: CacheStats::default(),
            }),
            path: None,
        }
    }

    /// Loads a previously persisted cache file at `path` (empty cache if it
    /// doesn't exist yet), and remembers `path` so every subsequent
    /// `set_batch` call fsyncs the new entries to it. Malformed lines are
    /// skipped and logged rather than failing the whole load.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let cache = Self::new();
        if path.exists() {
            let text = tokio::fs::read_to_string(&path).await.map_err(CvError::from)?;
            let mut inner = cache.inner.lock();
            for (lineno, line) in text.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<CacheRecord>(line) {
                    Ok(record) => {
                        inner.stats.bytes += record.bytes;
                        inner.entries.put(
                            record.hash,
                            Entry { vector: record.vector, model: record.model, bytes: record.bytes, last_access: record.last_access },
                        );
                    }
                    Err(err) => tracing::warn!(%err, line = lineno, "skipping malformed embedding cache record"),
                }
            }
            inner.stats.entries = inner.entries.len() as u64;
        }
        Ok(Self { inner: cache.inner, path: Some(path) })
    }

    /// Splits `texts` into already-cached vectors (by original text) and the
    /// texts that still need an embedding call.
    pub fn get_batch(&self, texts: &[String], model_id: &str) -> (HashMap<String, Vec<f32>>, Vec<String>) {
        let mut inner = self.inner.lock();
        let mut cached = HashMap::new();
        let mut missing = Vec::new();
        for text in texts {
            let key = embedding_cache_key(text, model_id);
            if let Some(entry) = inner.entries.get_mut(&key) {
                entry.last_access = Utc::now();
                cached.insert(text.clone(), entry.vector.clone());
                inner.stats.hits += 1;
            } else {
                missing.push(text.clone());
                inner.stats.misses += 1;
            }
        }
        (cached, missing)
    }

    /// Inserts `entries` into the in-memory cache and, if this cache was
    /// opened with `load`, appends each new record to disk and fsyncs.
    pub async fn set_batch(&self, entries: Vec<(String, Vec<f32>)>, model_id: &str) -> Result<()> {
        let mut records = Vec::with_capacity(entries.len());
        {
            let mut inner = self.inner.lock();
            for (text, vector) in entries {
                let key = embedding_cache_key(&text, model_id);
                let bytes = (vector.len() * std::mem::size_of::<f32>()) as u64;
                let last_access = Utc::now();
                if let Some(old) = inner.entries.put(
                    key.clone(),
                    Entry { vector: vector.clone(), model: model_id.to_string(), bytes, last_access },
                ) {
                    inner.stats.bytes = inner.stats.bytes.saturating_sub(old.bytes);
                }
                inner.stats.bytes += bytes;
                records.push(CacheRecord { hash: key, model: model_id.to_string(), vector, bytes, last_access });
            }
            inner.stats.entries = inner.entries.len() as u64;
        }
        if let Some(path) = &self.path {
            append_records(path, &records).await?;
        }
        Ok(())
    }

    /// Evicts least-recently-used entries until total bytes <= `target_bytes`.
    pub fn evict_lru(&self, target_bytes: u64) {
        let mut inner = self.inner.lock();
        while inner.stats.bytes > target_bytes {
            match inner.entries.pop_lru() {
                Some((_, entry)) => {
                    inner.stats.bytes = inner.stats.bytes.saturating_sub(entry.bytes);
                }
                None => break,
            }
        }
        inner.stats.entries = inner.entries.len() as u64;
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.lock().stats.clone()
    }

    /// Writes every entry to a standalone JSON-lines bundle (SPEC_FULL
    /// supplement — the export half of the export/import round-trip).
    pub async fn export(&self, bundle_path: &Path) -> Result<u64> {
        let records = self.records();
        let mut out = String::new();
        for record in &records {
            out.push_str(&serde_json::to_string(record).map_err(CvError::from)?);
            out.push('\n');
        }
        tokio::fs::write(bundle_path, out).await.map_err(CvError::from)?;
        Ok(records.len() as u64)
    }

    /// Imports a bundle previously produced by `export`. Entries already
    /// present (by hash) are left untouched rather than re-appended.
    pub async fn import(&self, bundle_path: &Path) -> Result<ImportStats> {
        let text = tokio::fs::read_to_string(bundle_path).await.map_err(CvError::from)?;
        let mut stats = ImportStats::default();
        let mut fresh = Vec::new();
        {
            let mut inner = self.inner.lock();
            for line in text.lines() {
                if line.trim().is_empty() {
                    continue;
                }
                let record: CacheRecord = serde_json::from_str(line).map_err(CvError::from)?;
                if inner.entries.contains(&record.hash) {
                    stats.skipped += 1;
                    continue;
                }
                inner.stats.bytes += record.bytes;
                inner.entries.put(
                    record.hash.clone(),
                    Entry { vector: record.vector.clone(), model: record.model.clone(), bytes: record.bytes, last_access: record.last_access },
                );
                fresh.push(record);
                stats.imported += 1;
            }
            inner.stats.entries = inner.entries.len() as u64;
        }
        if let Some(path) = &self.path {
            append_records(path, &fresh).await?;
        }
        Ok(stats)
    }

    fn records(&self) -> Vec<CacheRecord> {
        self.inner
            .lock()
            .entries
            .iter()
            .map(|(hash, entry)| CacheRecord {
                hash: hash.clone(),
                model: entry.model.clone(),
                vector: entry.vector.clone(),
                bytes: entry.bytes,
                last_access: entry.last_access,
            })
            .collect()
    }
}

async fn append_records(path: &Path, records: &[CacheRecord]) -> Result<()> {
    if records.is_empty() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(CvError::from)?;
    }
    use tokio::io::AsyncWriteExt;
    let mut file = tokio::fs::OpenOptions::new().create(true).append(true).open(path).await.map_err(CvError::from)?;
    for record in records {
        let line = serde_json::to_string(record).map_err(CvError::from)?;
        file.write_all(line.as_bytes()).await.map_err(CvError::from)?;
        file.write_all(b"\n").await.map_err(CvError::from)?;
    }
    file.sync_all().await.map_err(CvError::from)?;
    Ok(())
}

impl Default for EmbeddingCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn formatting_changes_hit_the_same_cache_key() {
        let cache = EmbeddingCache::new();
        cache.set_batch(vec![("hello   world".to_string(), vec![1.0, 2.0])], "model-a").await.unwrap();
        let (cached, missing) = cache.get_batch(&["hello world".to_string()], "model-a");
        assert!(missing.is_empty());
        assert_eq!(cached.get("hello world"), Some(&vec![1.0, 2.0]));
    }

    #[tokio::test]
    async fn different_model_ids_miss_independently() {
        let cache = EmbeddingCache::new();
        cache.set_batch(vec![("hello".to_string(), vec![1.0])], "model-a").await.unwrap();
        let (cached, missing) = cache.get_batch(&["hello".to_string()], "model-b");
        assert!(cached.is_empty());
        assert_eq!(missing, vec!["hello".to_string()]);
    }

    #[tokio::test]
    async fn eviction_respects_byte_budget() {
        let cache = EmbeddingCache::new();
        cache
            .set_batch(
                vec![
                    ("a".to_string(), vec![0.0; 100]),
                    ("b".to_string(), vec![0.0; 100]),
                ],
                "model-a",
            )
            .await
            .unwrap();
        let before = cache.stats().bytes;
        assert!(before > 0);
        cache.evict_lru(0);
        assert_eq!(cache.stats().bytes, 0);
    }

    #[tokio::test]
    async fn hit_rate_reflects_observed_hits_and_misses() {
        let cache = EmbeddingCache::new();
        cache.set_batch(vec![("a".to_string(), vec![1.0])], "m").await.unwrap();
        cache.get_batch(&["a".to_string()], "m");
        cache.get_batch(&["b".to_string()], "m");
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn loading_a_persisted_cache_restores_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.jsonl");
        let cache = EmbeddingCache::load(&path).await.unwrap();
        cache.set_batch(vec![("hello".to_string(), vec![1.0, 2.0])], "model-a").await.unwrap();

        let reloaded = EmbeddingCache::load(&path).await.unwrap();
        let (cached, missing) = reloaded.get_batch(&["hello".to_string()], "model-a");
        assert!(missing.is_empty());
        assert_eq!(cached.get("hello"), Some(&vec![1.0, 2.0]));
    }

    #[tokio::test]
    async fn export_then_reimport_into_source_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let cache = EmbeddingCache::new();
        cache.set_batch(vec![("a".to_string(), vec![1.0])], "m").await.unwrap();
        cache.set_batch(vec![("b".to_string(), vec![2.0])], "m").await.unwrap();

        let bundle = dir.path().join("bundle.jsonl");
        let exported = cache.export(&bundle).await.unwrap();
        assert_eq!(exported, 2);

        let stats = cache.import(&bundle).await.unwrap();
        assert_eq!((stats.imported, stats.skipped), (0, 2));
    }

    #[tokio::test]
    async fn import_into_fresh_cache_counts_as_imported() {
        let dir = tempfile::tempdir().unwrap();
        let source = EmbeddingCache::new();
        source.set_batch(vec![("a".to_string(), vec![1.0])], "m").await.unwrap();
        let bundle = dir.path().join("bundle.jsonl");
        source.export(&bundle).await.unwrap();

        let fresh = EmbeddingCache::new();
        let stats = fresh.import(&bundle).await.unwrap();
        assert_eq!((stats.imported, stats.skipped), (1, 0));
        let (cached, _) = fresh.get_batch(&["a".to_string()], "m");
        assert_eq!(cached.get("a"), Some(&vec![1.0]));
    }
}
