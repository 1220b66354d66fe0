// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! The Workspace Isolation Protocol: pure functions over the host VCS.
//!
//! Every session gets its own git worktree, checked out on a dedicated
//! `afk/<session>` branch, sibling to the project's main working tree at
//! `<project>/.afk-worktrees/<session>`. Completion rebases the branch
//! onto `main` and fast-forwards; the rebase runs *inside* the worktree
//! and the worktree is removed only after a successful rebase, because
//! git refuses to rebase a branch that's checked out elsewhere.

mod commit;
mod git;
mod merge;
mod worktree;

pub use commit::commit_all;
pub use git::{init_repo, is_repo, WorkspaceError};
pub use merge::rebase_then_fast_forward;
pub use worktree::{create_worktree, list_afk_worktrees, remove_worktree, WorktreeEntry};

#[cfg(test)]
pub(crate) mod test_helpers {
    use std::path::Path;
    use tokio::process::Command;

    /// Initialize a throwaway git repo with one commit on `main`, suitable
    /// as the fixture for worktree/commit/rebase tests.
    pub async fn init_repo(path: &Path) {
        let run = |args: &'static [&'static str]| {
            let path = path.to_path_buf();
            async move {
                let status = Command::new("git")
                    .args(args)
                    .current_dir(&path)
                    .status()
                    .await
                    .expect("spawn git");
                assert!(status.success(), "git {:?} failed", args);
            }
        };
        std::fs::create_dir_all(path).expect("create repo dir");
        run(&["init", "--initial-branch=main", "."]).await;
        run(&["config", "user.email", "test@example.com"]).await;
        run(&["config", "user.name", "Test"]).await;
        std::fs::write(path.join("README.md"), "hello\n").expect("write readme");
        run(&["add", "-A"]).await;
        run(&["commit", "-m", "initial commit"]).await;
    }
}
