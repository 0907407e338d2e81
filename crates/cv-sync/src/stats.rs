//! `SyncStats` (spec §4.2): the result of one `sync()` tick.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    Full,
    Incremental,
    Force,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncFileError {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncStats {
    pub added: u32,
    pub modified: u32,
    pub deleted: u32,
    pub unchanged: u32,
    pub commits_ingested: u32,
    pub errors: Vec<SyncFileError>,
}

impl SyncStats {
    pub fn record_error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(SyncFileError {
            path: path.into(),
            message: message.into(),
        });
    }
}
