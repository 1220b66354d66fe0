// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;
use std::process::Output;
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("not a git repository: {}", .0.display())]
    NotARepo(std::path::PathBuf),
    #[error("worktree already exists: {}", .0.display())]
    WorktreeExists(std::path::PathBuf),
    #[error("git command failed: {0}")]
    Git(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of a git invocation: (exit success, stdout, stderr), trimmed.
pub(crate) struct GitOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl From<Output> for GitOutput {
    fn from(output: Output) -> Self {
        Self {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    }
}

/// Run a git subcommand in `cwd`, returning its trimmed stdout/stderr and
/// exit status. Never raises on a non-zero exit — callers decide what a
/// failure means for the operation at hand.
pub(crate) async fn run_git(args: &[&str], cwd: &Path) -> Result<GitOutput, WorkspaceError> {
    let output = Command::new("git")
        .args(args)
        .current_dir(cwd)
        .output()
        .await?;
    Ok(output.into())
}

/// Predicate: is `path` inside a git repository?
pub async fn is_repo(path: &Path) -> bool {
    match run_git(&["rev-parse", "--git-dir"], path).await {
        Ok(out) => out.success,
        Err(_) => false,
    }
}

/// Initialize a fresh repository at `path` on branch `main`, with an
/// empty first commit so `rebase_then_fast_forward` always has a `main`
/// tip to rebase onto. No-op if `path` is already a repository.
pub async fn init_repo(path: &Path) -> Result<(), WorkspaceError> {
    if is_repo(path).await {
        return Ok(());
    }
    let init = run_git(&["init", "-b", "main"], path).await?;
    if !init.success {
        return Err(WorkspaceError::Git(format!("git init failed: {}", init.stderr)));
    }
    // A freshly-initialized repo may have no committer identity configured
    // at all (a bare CI/service account); set one scoped to this repo so
    // the empty first commit below always succeeds.
    run_git(&["config", "user.email", "truant@localhost"], path).await?;
    run_git(&["config", "user.name", "truant"], path).await?;
    let commit = run_git(
        &["commit", "--allow-empty", "-m", "initial commit"],
        path,
    )
    .await?;
    if !commit.success {
        return Err(WorkspaceError::Git(format!(
            "initial commit failed: {}",
            commit.stderr
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "git_tests.rs"]
mod tests;
