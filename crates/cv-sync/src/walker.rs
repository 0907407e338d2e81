//! Working-tree walker (spec §4.2). Built on the `ignore` crate so
//! `.gitignore`/`.ignore` rules are honored the same way `matthewjberger-charter`
//! walks a workspace, with additional glob excludes layered on top.

use cv_core::Result;
use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

pub const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown"];

/// Relative (repo-root-relative) path plus a classification used to route it
/// to the code or document side of the delta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkedKind {
    Code,
    Document,
}

#[derive(Debug, Clone)]
pub struct WalkedFile {
    pub relative_path: String,
    pub absolute_path: PathBuf,
    pub kind: WalkedKind,
}

pub fn walk_tree(root: &Path, exclude_patterns: &[String]) -> Result<Vec<WalkedFile>> {
    let mut overrides = OverrideBuilder::new(root);
    for pattern in exclude_patterns {
        let negated = format!("!{pattern}");
        overrides
            .add(&negated)
            .map_err(|e| cv_core::CvError::io(format!("invalid exclude pattern '{pattern}': {e}")))?;
    }
    let overrides = overrides
        .build()
        .map_err(|e| cv_core::CvError::io(format!("building walk overrides: {e}")))?;

    let mut walker = WalkBuilder::new(root);
    walker.overrides(overrides).hidden(false).git_ignore(true);

    let mut out = Vec::new();
    for entry in walker.build() {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                tracing::debug!(%err, "walk entry skipped");
                continue;
            }
        };
        if entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            let absolute_path = entry.path().to_path_buf();
            let relative_path = absolute_path
                .strip_prefix(root)
                .unwrap_or(&absolute_path)
                .to_string_lossy()
                .replace('\\', "/");
            let ext = relative_path.rsplit('.').next().unwrap_or("").to_lowercase();
            let kind = if MARKDOWN_EXTENSIONS.contains(&ext.as_str()) {
                WalkedKind::Document
            } else {
                WalkedKind::Code
            };
            out.push(WalkedFile {
                relative_path,
                absolute_path,
                kind,
            });
        }
    }
    Ok(out)
}
