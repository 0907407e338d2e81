//! Traversal session domain types (spec §4.6).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    In,
    Out,
    Lateral,
    Jump,
    Stay,
}

/// A navigation target. Fields are mutually informative: the most specific
/// one set determines the resulting depth (symbol=3, file=2, module=1,
/// none=0/repo).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Target {
    pub module: Option<String>,
    pub file: Option<String>,
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Position {
    pub module: Option<String>,
    pub file: Option<String>,
    pub symbol: Option<String>,
    pub depth: u8,
    pub timestamp: DateTime<Utc>,
}

impl Position {
    pub fn repo_root() -> Self {
        Self {
            depth: 0,
            timestamp: Utc::now(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub position: Position,
    pub history: Vec<Position>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, ttl: chrono::Duration) -> bool {
        Utc::now() - self.last_activity > ttl
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraversalContextResult {
    pub position: Position,
    /// Always present, even under a tight budget (spec §4.6).
    pub summary: String,
    pub code: Option<String>,
    pub files: Vec<String>,
    pub symbols: Vec<String>,
    pub callers: Vec<String>,
    pub callees: Vec<String>,
    pub imports: Vec<String>,
    pub related: Vec<String>,
    pub navigation_hints: Vec<String>,
}
