//! Source text access for the Traversal Engine's `code` context field.
//! A narrow port (mirrors `cv-core::ports::AiProvider`'s shape) so the
//! engine is testable without a real repo checkout on disk.

use async_trait::async_trait;
use cv_core::Result;
use std::path::PathBuf;

#[async_trait]
pub trait SourceProvider: Send + Sync {
    async fn read_file(&self, path: &str) -> Result<Option<String>>;
}

/// Reads repo-relative paths from a working-tree root.
pub struct FsSourceProvider {
    root: PathBuf,
}

impl FsSourceProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl SourceProvider for FsSourceProvider {
    async fn read_file(&self, path: &str) -> Result<Option<String>> {
        match tokio::fs::read_to_string(self.root.join(path)).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Extracts `[start_line, end_line]` (1-indexed, inclusive) from `source`.
pub fn extract_lines(source: &str, start_line: u32, end_line: u32) -> String {
    source
        .lines()
        .enumerate()
        .filter(|(i, _)| {
            let line_no = *i as u32 + 1;
            line_no >= start_line && line_no <= end_line
        })
        .map(|(_, l)| l)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_existing_file_relative_to_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.rs"), "fn f() {}\n").unwrap();
        let provider = FsSourceProvider::new(dir.path());
        let text = provider.read_file("a.rs").await.unwrap();
        assert_eq!(text, Some("fn f() {}\n".to_string()));
    }

    #[tokio::test]
    async fn missing_file_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FsSourceProvider::new(dir.path());
        assert_eq!(provider.read_file("missing.rs").await.unwrap(), None);
    }

    #[test]
    fn extract_lines_is_inclusive() {
        let source = "a\nb\nc\nd\n";
        assert_eq!(extract_lines(source, 2, 3), "b\nc");
    }
}
