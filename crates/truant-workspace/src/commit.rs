// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::git::{run_git, WorkspaceError};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// A function that derives a commit message from the staged `name-status`
/// diff, overriding the built-in summarizer. Used by the optional
/// commit-message-generation capability (out of scope in this repo; see
/// `truant_core`'s capability-hook trait).
pub type CommitMessageFn = dyn Fn(&str) -> String + Send + Sync;

/// Stage all changes (including deletions) and commit them.
///
/// Returns `(had_changes, message)`. If nothing was staged, returns
/// `(false, "no changes")` without creating a commit.
pub async fn commit_all(
    worktree_path: &Path,
    session_name: &str,
    message_fn: Option<&CommitMessageFn>,
) -> Result<(bool, String), WorkspaceError> {
    let add = run_git(&["add", "-A"], worktree_path).await?;
    if !add.success {
        return Err(WorkspaceError::Git(format!("git add failed: {}", add.stderr)));
    }

    let diff_check = run_git(&["diff", "--cached", "--quiet"], worktree_path).await?;
    if diff_check.success {
        return Ok((false, "no changes".to_string()));
    }

    let name_status = run_git(
        &["diff", "--cached", "--name-status"],
        worktree_path,
    )
    .await?;
    let message = match message_fn {
        Some(f) => f(&name_status.stdout),
        None => build_commit_message(&name_status.stdout),
    };

    let commit = run_git(&["commit", "-m", &message], worktree_path).await?;
    if !commit.success {
        return Err(WorkspaceError::Git(format!(
            "git commit failed: {}",
            commit.stderr
        )));
    }

    info!(session = session_name, message = %message, "committed worktree changes");
    Ok((true, message))
}

/// Build a short commit message from `git diff --cached --name-status`
/// output: group paths by action (Add/Update/Delete) and list the
/// top-level module or filename touched by each.
fn build_commit_message(name_status: &str) -> String {
    let mut actions: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    actions.insert("Add", Vec::new());
    actions.insert("Update", Vec::new());
    actions.insert("Delete", Vec::new());

    for line in name_status.lines() {
        let mut parts = line.splitn(2, '\t');
        let (Some(status), Some(path)) = (parts.next(), parts.next()) else {
            continue;
        };
        let action = match status.chars().next() {
            Some('A') => "Add",
            Some('D') => "Delete",
            _ => "Update",
        };

        let segments: Vec<&str> = path.split('/').collect();
        let name = if segments.len() >= 2 && matches!(segments[0], "afk" | "src" | "lib") {
            segments[1]
        } else {
            segments[0]
        };
        let name = name.rsplit_once('.').map(|(n, _)| n).unwrap_or(name);

        let bucket = actions.entry(action).or_default();
        if !bucket.iter().any(|existing| existing == name) {
            bucket.push(name.to_string());
        }
    }

    let summary: Vec<String> = ["Add", "Update", "Delete"]
        .into_iter()
        .filter_map(|action| {
            let modules = actions.get(action)?;
            if modules.is_empty() {
                None
            } else {
                Some(format!("{action} {}", modules.join(", ")))
            }
        })
        .collect();

    if summary.is_empty() {
        "Update files".to_string()
    } else {
        summary.join("; ")
    }
}

#[cfg(test)]
#[path = "commit_tests.rs"]
mod tests;
