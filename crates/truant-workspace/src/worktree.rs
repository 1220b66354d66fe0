// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::git::{run_git, WorkspaceError};
use std::path::{Path, PathBuf};
use tracing::warn;

/// An entry from `git worktree list --porcelain` whose branch starts
/// `afk/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorktreeEntry {
    pub path: PathBuf,
    pub branch: String,
}

/// Create a worktree at `worktree_path` checked out on a new branch
/// `branch_name`, branching off `main`. Fails if either the path or the
/// branch already exists.
pub async fn create_worktree(
    repo: &Path,
    worktree_path: &Path,
    branch_name: &str,
) -> Result<(), WorkspaceError> {
    if worktree_path.exists() {
        return Err(WorkspaceError::WorktreeExists(worktree_path.to_path_buf()));
    }

    let branch_exists = run_git(&["rev-parse", "--verify", branch_name], repo)
        .await?
        .success;
    if branch_exists {
        return Err(WorkspaceError::Git(format!(
            "branch already exists: {branch_name}"
        )));
    }

    let path_str = worktree_path.to_string_lossy().into_owned();
    let out = run_git(
        &["worktree", "add", "-b", branch_name, &path_str, "main"],
        repo,
    )
    .await?;
    if !out.success {
        return Err(WorkspaceError::Git(out.stderr));
    }
    Ok(())
}

/// Best-effort removal of just the worktree directory (not the branch).
///
/// Used mid-merge to unpin the branch so it can be fast-forwarded from
/// the project's main working tree — git refuses to touch a branch that's
/// checked out in another worktree.
pub async fn unpin_worktree(repo: &Path, worktree_path: &Path) {
    let path_str = worktree_path.to_string_lossy().into_owned();
    match run_git(&["worktree", "remove", "--force", &path_str], repo).await {
        Ok(out) if !out.success => {
            warn!(path = %worktree_path.display(), error = %out.stderr, "worktree remove failed")
        }
        Err(e) => warn!(path = %worktree_path.display(), error = %e, "worktree remove failed"),
        _ => {}
    }

    if worktree_path.exists() {
        if let Err(e) = tokio::fs::remove_dir_all(worktree_path).await {
            warn!(path = %worktree_path.display(), error = %e, "failed to remove stale worktree directory");
        }
    }
}

/// Best-effort removal of a worktree and its branch. Errors are logged,
/// never raised — callers (stop_session, complete_session) must always be
/// able to proceed with the rest of cleanup.
pub async fn remove_worktree(repo: &Path, worktree_path: &Path, branch_name: &str) {
    unpin_worktree(repo, worktree_path).await;

    match run_git(&["branch", "-D", branch_name], repo).await {
        Ok(out) if !out.success => {
            warn!(branch = branch_name, error = %out.stderr, "branch delete failed")
        }
        Err(e) => warn!(branch = branch_name, error = %e, "branch delete failed"),
        _ => {}
    }
}

/// Parse `git worktree list --porcelain` and return every entry whose
/// branch begins with `afk/`.
pub async fn list_afk_worktrees(repo: &Path) -> Result<Vec<WorktreeEntry>, WorkspaceError> {
    let out = run_git(&["worktree", "list", "--porcelain"], repo).await?;
    if !out.success {
        return Err(WorkspaceError::Git(out.stderr));
    }

    let mut entries = Vec::new();
    let mut current_path: Option<PathBuf> = None;
    for line in out.stdout.lines() {
        if let Some(path) = line.strip_prefix("worktree ") {
            current_path = Some(PathBuf::from(path));
        } else if let Some(branch_ref) = line.strip_prefix("branch ") {
            let branch = branch_ref
                .strip_prefix("refs/heads/")
                .unwrap_or(branch_ref)
                .to_string();
            if branch.starts_with("afk/") {
                if let Some(path) = current_path.take() {
                    entries.push(WorktreeEntry { path, branch });
                }
            }
        } else if line.is_empty() {
            current_path = None;
        }
    }
    Ok(entries)
}

#[cfg(test)]
#[path = "worktree_tests.rs"]
mod tests;
