//! Git commit ingestion into `Commit` graph nodes (spec §3), added as a
//! per-tick supplement: walks `HEAD`'s first-parent chain via `git2` up to
//! a configurable depth (default 200), matching the teacher's RFC-001 git
//! integration. Grounded on `cv-manifold::git_signals`'s own revwalk +
//! `spawn_blocking` idiom — `git2` is synchronous, so the walk itself runs
//! off the async executor and only the per-commit graph upserts are awaited.

use cv_core::model::CommitNode;
use cv_core::{CvError, Result};
use cv_graph::{EdgeType, GraphStore};
use git2::{Delta, Repository};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const DEFAULT_COMMIT_DEPTH: usize = 200;

struct WalkedCommit {
    node: CommitNode,
    file_changes: Vec<FileChange>,
}

struct FileChange {
    path: String,
    change_type: &'static str,
    insertions: u32,
    deletions: u32,
}

/// Walks up to `depth` commits from `HEAD` and upserts each as a `Commit`
/// node with `MODIFIES(Commit -> File)` edges, skipping shas already
/// present in the graph. Returns the number of newly ingested commits.
pub async fn ingest_commits(graph: &Arc<dyn GraphStore>, repo_root: &Path, depth: usize) -> Result<u32> {
    let repo_root = repo_root.to_path_buf();
    let walked = tokio::task::spawn_blocking(move || walk(&repo_root, depth))
        .await
        .map_err(|e| CvError::io(format!("commit walk task panicked: {e}")))??;

    let mut ingested = 0u32;
    for commit in walked {
        if graph.get_commit(&commit.node.sha).await?.is_some() {
            continue;
        }
        graph.upsert_commit(&commit.node).await?;
        for change in &commit.file_changes {
            graph
                .create_edge(
                    EdgeType::Modifies,
                    &commit.node.sha,
                    &change.path,
                    serde_json::json!({
                        "change_type": change.change_type,
                        "insertions": change.insertions,
                        "deletions": change.deletions,
                    }),
                )
                .await?;
        }
        ingested += 1;
    }
    Ok(ingested)
}

fn walk(repo_root: &PathBuf, depth: usize) -> Result<Vec<WalkedCommit>> {
    let repo = Repository::discover(repo_root).map_err(|e| CvError::io(format!("git repository not found: {e}")))?;
    let mut revwalk = repo.revwalk().map_err(|e| CvError::io(e.to_string()))?;
    if revwalk.push_head().is_err() {
        return Ok(Vec::new());
    }
    revwalk.simplify_first_parent().map_err(|e| CvError::io(e.to_string()))?;

    let mut out = Vec::new();
    for oid in revwalk.take(depth) {
        let oid = oid.map_err(|e| CvError::io(e.to_string()))?;
        let commit = repo.find_commit(oid).map_err(|e| CvError::io(e.to_string()))?;
        let tree = commit.tree().map_err(|e| CvError::io(e.to_string()))?;
        let parent_tree = commit.parents().next().and_then(|p| p.tree().ok());
        let diff = repo
            .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)
            .map_err(|e| CvError::io(e.to_string()))?;

        let diff_stats = diff.stats().map_err(|e| CvError::io(e.to_string()))?;

        let mut file_changes = Vec::new();
        for delta in diff.deltas() {
            let Some(path) = delta.new_file().path().or_else(|| delta.old_file().path()).and_then(|p| p.to_str())
            else {
                continue;
            };
            let change_type = match delta.status() {
                Delta::Added => "added",
                Delta::Deleted => "deleted",
                Delta::Renamed => "renamed",
                _ => "modified",
            };
            file_changes.push(FileChange { path: path.to_string(), change_type, insertions: 0, deletions: 0 });
        }

        let author = commit.author();
        let sha = oid.to_string();
        let timestamp = chrono::DateTime::from_timestamp(commit.time().seconds(), 0).unwrap_or_else(chrono::Utc::now);
        out.push(WalkedCommit {
            node: CommitNode {
                sha: sha.clone(),
                message: commit.message().unwrap_or_default().to_string(),
                author: author.name().unwrap_or("unknown").to_string(),
                timestamp,
                files_changed: diff_stats.files_changed() as u32,
                insertions: diff_stats.insertions() as u32,
                deletions: diff_stats.deletions() as u32,
            },
            file_changes,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cv_graph::InMemoryGraphStore;
    use std::process::Command;

    fn git(dir: &Path, args: &[&str]) {
        let status = Command::new("git").args(args).current_dir(dir).status().unwrap();
        assert!(status.success(), "git {:?} failed", args);
    }

    fn init_repo_with_two_commits(dir: &Path) {
        git(dir, &["init", "-q"]);
        git(dir, &["config", "user.email", "t@example.com"]);
        git(dir, &["config", "user.name", "tester"]);
        std::fs::write(dir.join("a.txt"), "one\n").unwrap();
        git(dir, &["add", "a.txt"]);
        git(dir, &["commit", "-q", "-m", "feat: add a"]);
        std::fs::write(dir.join("a.txt"), "one\ntwo\n").unwrap();
        git(dir, &["add", "a.txt"]);
        git(dir, &["commit", "-q", "-m", "fix: extend a"]);
    }

    #[tokio::test]
    async fn ingests_commit_nodes_and_modifies_edges() {
        let dir = tempfile::tempdir().unwrap();
        init_repo_with_two_commits(dir.path());
        let graph: Arc<dyn GraphStore> = Arc::new(InMemoryGraphStore::new());

        let ingested = ingest_commits(&graph, dir.path(), DEFAULT_COMMIT_DEPTH).await.unwrap();
        assert_eq!(ingested, 2);

        let stats = graph.get_stats().await.unwrap();
        assert_eq!(stats.commit_count, 2);
        assert_eq!(stats.edge_count, 2);
    }

    #[tokio::test]
    async fn second_ingestion_skips_already_known_commits() {
        let dir = tempfile::tempdir().unwrap();
        init_repo_with_two_commits(dir.path());
        let graph: Arc<dyn GraphStore> = Arc::new(InMemoryGraphStore::new());

        ingest_commits(&graph, dir.path(), DEFAULT_COMMIT_DEPTH).await.unwrap();
        let second = ingest_commits(&graph, dir.path(), DEFAULT_COMMIT_DEPTH).await.unwrap();
        assert_eq!(second, 0);
    }
}
