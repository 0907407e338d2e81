//! Git-backed signals for the `temporal`, `session`, and `intent`
//! dimensions. Grounded on the teacher's RFC-001 git integration
//! (`git2` dependency, differential analysis) — here used for live
//! working-tree/log reads rather than node ingestion.

use cv_core::{CvError, Result};
use git2::{Repository, StatusOptions};
use std::collections::HashMap;
use std::path::Path;

pub const CONVENTIONAL_COMMIT_TYPES: [&str; 10] = [
    "feat", "fix", "refactor", "chore", "docs", "test", "perf", "build", "ci", "style",
];

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct WorkingTreeStatus {
    pub modified: Vec<String>,
    pub staged: Vec<String>,
    pub untracked: Vec<String>,
}

impl WorkingTreeStatus {
    pub fn is_dirty(&self) -> bool {
        !self.modified.is_empty() || !self.staged.is_empty() || !self.untracked.is_empty()
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ConventionalCommit {
    pub sha: String,
    pub commit_type: Option<String>,
    pub scope: Option<String>,
    pub breaking: bool,
    pub subject: String,
}

fn open(repo_path: &Path) -> Result<Repository> {
    Repository::discover(repo_path).map_err(|e| CvError::io(format!("git repository not found: {e}")))
}

pub fn working_tree_status(repo_path: &Path) -> Result<WorkingTreeStatus> {
    let repo = open(repo_path)?;
    let mut opts = StatusOptions::new();
    opts.include_untracked(true).recurse_untracked_dirs(true);
    let statuses = repo
        .statuses(Some(&mut opts))
        .map_err(|e| CvError::io(format!("git status failed: {e}")))?;

    let mut out = WorkingTreeStatus::default();
    for entry in statuses.iter() {
        let Some(path) = entry.path() else { continue };
        let status = entry.status();
        if status.is_wt_new() {
            out.untracked.push(path.to_string());
        } else if status.is_wt_modified() || status.is_wt_deleted() {
            out.modified.push(path.to_string());
        } else if status.is_index_new() || status.is_index_modified() || status.is_index_deleted() {
            out.staged.push(path.to_string());
        }
    }
    Ok(out)
}

pub fn branch_name(repo_path: &Path) -> Result<Option<String>> {
    let repo = open(repo_path)?;
    let head = match repo.head() {
        Ok(head) => head,
        Err(_) => return Ok(None),
    };
    Ok(head.shorthand().map(str::to_string))
}

/// Walks `HEAD`'s first-parent chain, parsing each subject as a
/// conventional commit (`type(scope)!: subject`).
pub fn recent_commits(repo_path: &Path, limit: usize) -> Result<Vec<ConventionalCommit>> {
    let repo = open(repo_path)?;
    let mut revwalk = repo.revwalk().map_err(|e| CvError::io(e.to_string()))?;
    if revwalk.push_head().is_err() {
        return Ok(Vec::new());
    }
    revwalk.simplify_first_parent().map_err(|e| CvError::io(e.to_string()))?;

    let mut out = Vec::new();
    for oid in revwalk.take(limit) {
        let oid = oid.map_err(|e| CvError::io(e.to_string()))?;
        let commit = repo.find_commit(oid).map_err(|e| CvError::io(e.to_string()))?;
        let message = commit.message().unwrap_or_default();
        out.push(parse_conventional_commit(&oid.to_string(), message));
    }
    Ok(out)
}

/// Files touched by commits within the walked window, ranked by touch count.
pub fn hot_files(repo_path: &Path, commit_limit: usize, top_n: usize) -> Result<Vec<(String, u32)>> {
    let repo = open(repo_path)?;
    let mut revwalk = repo.revwalk().map_err(|e| CvError::io(e.to_string()))?;
    if revwalk.push_head().is_err() {
        return Ok(Vec::new());
    }
    revwalk.simplify_first_parent().map_err(|e| CvError::io(e.to_string()))?;

    let mut counts: HashMap<String, u32> = HashMap::new();
    for oid in revwalk.take(commit_limit) {
        let oid = oid.map_err(|e| CvError::io(e.to_string()))?;
        let commit = repo.find_commit(oid).map_err(|e| CvError::io(e.to_string()))?;
        let tree = commit.tree().map_err(|e| CvError::io(e.to_string()))?;
        let parent_tree = commit.parents().next().and_then(|p| p.tree().ok());
        let diff = repo
            .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)
            .map_err(|e| CvError::io(e.to_string()))?;
        for delta in diff.deltas() {
            if let Some(path) = delta.new_file().path().and_then(|p| p.to_str()) {
                *counts.entry(path.to_string()).or_insert(0) += 1;
            }
        }
    }
    let mut ranked: Vec<(String, u32)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(top_n);
    Ok(ranked)
}

fn parse_conventional_commit(sha: &str, message: &str) -> ConventionalCommit {
    let header = message.lines().next().unwrap_or_default();
    let footer_breaking = message.contains("BREAKING CHANGE:");

    let Some(colon_idx) = header.find(':') else {
        return ConventionalCommit {
            sha: sha.to_string(),
            commit_type: None,
            scope: None,
            breaking: footer_breaking,
            subject: header.trim().to_string(),
        };
    };
    let (prefix, subject) = header.split_at(colon_idx);
    let subject = subject.trim_start_matches(':').trim().to_string();

    let breaking_bang = prefix.ends_with('!');
    let prefix = prefix.trim_end_matches('!');

    let (type_part, scope) = match (prefix.find('('), prefix.ends_with(')')) {
        (Some(open_idx), true) => {
            let scope = prefix[open_idx + 1..prefix.len() - 1].to_string();
            (&prefix[..open_idx], Some(scope))
        }
        _ => (prefix, None),
    };
    let commit_type = CONVENTIONAL_COMMIT_TYPES
        .iter()
        .find(|t| **t == type_part)
        .map(|t| t.to_string());

    ConventionalCommit {
        sha: sha.to_string(),
        commit_type,
        scope,
        breaking: breaking_bang || footer_breaking,
        subject,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_type_scope_and_subject() {
        let c = parse_conventional_commit("abc", "feat(parser): add go support");
        assert_eq!(c.commit_type.as_deref(), Some("feat"));
        assert_eq!(c.scope.as_deref(), Some("parser"));
        assert_eq!(c.subject, "add go support");
        assert!(!c.breaking);
    }

    #[test]
    fn bang_marks_breaking_change() {
        let c = parse_conventional_commit("abc", "fix!: drop legacy api");
        assert_eq!(c.commit_type.as_deref(), Some("fix"));
        assert!(c.breaking);
    }

    #[test]
    fn footer_marks_breaking_change() {
        let c = parse_conventional_commit("abc", "chore: bump deps\n\nBREAKING CHANGE: drops node 14");
        assert!(c.breaking);
    }

    #[test]
    fn non_conventional_subject_has_no_type() {
        let c = parse_conventional_commit("abc", "quick fix for ci");
        assert!(c.commit_type.is_none());
        assert_eq!(c.subject, "quick fix for ci");
    }
}
