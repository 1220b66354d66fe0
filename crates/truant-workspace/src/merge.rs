// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::git::{run_git, WorkspaceError};
use crate::worktree::unpin_worktree;
use std::path::Path;
use tracing::info;

/// Rebase `branch` onto `main` *inside the worktree*, then fast-forward
/// `main` to the rebased branch.
///
/// Ordering is a contract, not an implementation detail: rebasing from
/// outside the worktree fails with "branch is already used by worktree";
/// the fast-forward can only happen once the branch is unpinned, which
/// requires removing the worktree first. On conflict the rebase is
/// aborted and both `main` and the worktree are left untouched so the
/// session can keep working. The branch itself survives this call either
/// way — deleting it is the caller's job once the merge is confirmed.
///
/// Returns `(success, message)`.
pub async fn rebase_then_fast_forward(
    repo: &Path,
    branch: &str,
    worktree_path: &Path,
) -> Result<(bool, String), WorkspaceError> {
    // Defensive cleanup: a prior crash may have left a rebase in progress.
    let _ = run_git(&["rebase", "--abort"], worktree_path).await;

    let rebase = run_git(&["rebase", "main"], worktree_path).await?;
    if !rebase.success {
        run_git(&["rebase", "--abort"], worktree_path).await?;
        let detail = if rebase.stderr.is_empty() {
            rebase.stdout
        } else {
            rebase.stderr
        };
        return Ok((false, detail));
    }

    // The branch is no longer "in use by worktree" once this returns, but
    // it is not deleted — the caller deletes it only after confirming the
    // fast-forward below succeeded.
    unpin_worktree(repo, worktree_path).await;

    // Defensive cleanup on main, then fast-forward.
    let _ = run_git(&["merge", "--abort"], repo).await;

    let ff = run_git(&["merge", "--ff-only", branch], repo).await?;
    if !ff.success {
        let detail = if ff.stderr.is_empty() { ff.stdout } else { ff.stderr };
        return Ok((false, detail));
    }

    info!(branch, "fast-forwarded main");
    Ok((true, ff.stdout))
}

#[cfg(test)]
#[path = "merge_tests.rs"]
mod tests;
