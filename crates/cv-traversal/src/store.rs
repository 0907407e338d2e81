//! Session persistence (spec §4.6): "Sessions persist to a per-repo
//! directory as JSON and expire by inactivity." Grounded on
//! `cv-authored::log::AuthoredLog`'s file-backed-with-fsync idiom, one file
//! per session rather than an append log since sessions mutate in place.

use crate::domain::Session;
use cv_core::Result;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    pub async fn save(&self, session: &Session) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_vec_pretty(session)?;
        let path = self.path_for(&session.id);
        let mut file = fs::File::create(&path).await?;
        file.write_all(&json).await?;
        file.sync_all().await?;
        Ok(())
    }

    pub async fn load(&self, id: &str) -> Result<Option<Session>> {
        match fs::read(self.path_for(id)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        match fs::remove_file(self.path_for(id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Sweeps every session file older than `ttl` since last activity.
    /// Returns the number of sessions removed.
    pub async fn expire_inactive(&self, ttl: chrono::Duration) -> Result<u64> {
        let mut removed = 0u64;
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Ok(bytes) = fs::read(&path).await else { continue };
            let Ok(session) = serde_json::from_slice::<Session>(&bytes) else { continue };
            if session.is_expired(ttl) {
                let _ = fs::remove_file(&path).await;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// All non-expired sessions — the `navigational` dimension's signal.
    pub async fn list_active(&self, ttl: chrono::Duration) -> Result<Vec<Session>> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut sessions = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Ok(bytes) = fs::read(&path).await else { continue };
            let Ok(session) = serde_json::from_slice::<Session>(&bytes) else { continue };
            if !session.is_expired(ttl) {
                sessions.push(session);
            }
        }
        Ok(sessions)
    }
}

pub fn default_sessions_dir(repo_root: &Path) -> PathBuf {
    repo_root.join(".cv").join("sessions")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Position;
    use chrono::{Duration, Utc};

    fn sample_session(id: &str, last_activity: chrono::DateTime<Utc>) -> Session {
        Session {
            id: id.to_string(),
            position: Position::repo_root(),
            history: vec![Position::repo_root()],
            created_at: last_activity,
            last_activity,
        }
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        let session = sample_session("s1", Utc::now());
        store.save(&session).await.unwrap();
        let loaded = store.load("s1").await.unwrap().unwrap();
        assert_eq!(loaded.id, "s1");
    }

    #[tokio::test]
    async fn load_missing_session_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        assert!(store.load("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expire_inactive_removes_only_stale_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        store.save(&sample_session("fresh", Utc::now())).await.unwrap();
        store
            .save(&sample_session("stale", Utc::now() - Duration::hours(2)))
            .await
            .unwrap();

        let removed = store.expire_inactive(Duration::hours(1)).await.unwrap();
        assert_eq!(removed, 1);
        assert!(store.load("fresh").await.unwrap().is_some());
        assert!(store.load("stale").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_active_excludes_expired_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        store.save(&sample_session("fresh", Utc::now())).await.unwrap();
        store
            .save(&sample_session("stale", Utc::now() - Duration::hours(2)))
            .await
            .unwrap();

        let active = store.list_active(Duration::hours(1)).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "fresh");
    }
}
