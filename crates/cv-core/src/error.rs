//! Error taxonomy shared by every crate in the workspace.
//!
//! Mirrors `codegraph-storage::error::StorageError`: a closed `ErrorKind`
//! tag plus a human message and an optional boxed source, so the tool
//! dispatcher can report `{kind, message}` across the protocol boundary
//! without leaking backend-specific error types.

use std::fmt;
use thiserror::Error;

/// The error-kind tags from spec §7. Stable across backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Graph,
    Vector,
    Embedding,
    Parse,
    Io,
    Auth,
    Timeout,
    Cancelled,
    Validation,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Config => "config",
            ErrorKind::Graph => "graph",
            ErrorKind::Vector => "vector",
            ErrorKind::Embedding => "embedding",
            ErrorKind::Parse => "parse",
            ErrorKind::Io => "io",
            ErrorKind::Auth => "auth",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Validation => "validation",
        }
    }

    /// Whether a caller should retry after an infra health check (§7).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ErrorKind::Graph | ErrorKind::Vector | ErrorKind::Embedding | ErrorKind::Timeout
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The workspace-wide error type. Every library crate returns
/// `Result<T, CvError>`; only `cv-server::main` uses `anyhow`.
#[derive(Debug, Error)]
#[error("[{kind}] {message}")]
pub struct CvError {
    pub kind: ErrorKind,
    pub message: String,
    pub operation: Option<String>,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl CvError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            operation: None,
            source: None,
        }
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    pub fn graph(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Graph, message)
    }

    pub fn vector(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Vector, message)
    }

    pub fn embedding(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Embedding, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Parse, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Auth, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancelled, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }
}

impl From<std::io::Error> for CvError {
    fn from(err: std::io::Error) -> Self {
        CvError::io(err.to_string()).with_source(err)
    }
}

impl From<serde_json::Error> for CvError {
    fn from(err: serde_json::Error) -> Self {
        CvError::new(ErrorKind::Validation, format!("JSON error: {err}")).with_source(err)
    }
}

pub type Result<T> = std::result::Result<T, CvError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_message() {
        let err = CvError::graph("FalkorDB unreachable");
        assert_eq!(format!("{err}"), "[graph] FalkorDB unreachable");
    }

    #[test]
    fn recoverable_kinds() {
        assert!(ErrorKind::Graph.is_recoverable());
        assert!(ErrorKind::Vector.is_recoverable());
        assert!(ErrorKind::Embedding.is_recoverable());
        assert!(ErrorKind::Timeout.is_recoverable());
        assert!(!ErrorKind::Parse.is_recoverable());
        assert!(!ErrorKind::Config.is_recoverable());
    }

    #[test]
    fn io_conversion_tags_io_kind() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: CvError = io_err.into();
        assert_eq!(err.kind, ErrorKind::Io);
    }
}
