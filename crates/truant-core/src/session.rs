// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session identifier, lifecycle state, and the persisted session record.
//!
//! `SessionRecord` is the restart-safe view of a session: the subset of
//! its state that survives a supervisor restart. The live agent handle
//! and reader-task handle that complete the in-memory picture are owned
//! by the session manager and re-created on recovery, not stored here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

crate::define_id! {
    /// Unique identifier for a session (`<project>-<yymmdd-hhmmss>`).
    pub struct SessionId;
}

/// Identifier for the channel a session talks through.
///
/// Chat topics use small integer strings; web channels are prefixed
/// `web:<hex>`. Opaque beyond that to the core.
crate::define_id! {
    pub struct ChannelId;
}

/// Lifecycle state of a session. See the state table in the session
/// manager design: idle -> running -> waiting_permission -> idle/stopped,
/// suspended only across a supervisor restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Running,
    WaitingPermission,
    Stopped,
    Suspended,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Idle => "idle",
            SessionState::Running => "running",
            SessionState::WaitingPermission => "waiting_permission",
            SessionState::Stopped => "stopped",
            SessionState::Suspended => "suspended",
        };
        write!(f, "{s}")
    }
}

/// The persisted, restart-safe view of a session.
///
/// Written atomically to `sessions.json` after every create, system-id
/// capture, or state transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub name: SessionId,
    pub project_name: String,
    pub project_path: PathBuf,
    pub workspace_path: PathBuf,
    pub channel_id: ChannelId,
    /// Agent-internal resumable session id, absent until the first
    /// system event arrives.
    #[serde(default)]
    pub agent_session_id: Option<String>,
    pub state: SessionState,
    pub verbose: bool,
    pub managed_channel: bool,
    #[serde(default)]
    pub template: Option<String>,
    pub agent_name: String,
    pub created_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Workspace path derived deterministically from the project path and
    /// session name: `<project-path>/.afk-worktrees/<name>`.
    pub fn derive_workspace_path(project_path: &std::path::Path, name: &SessionId) -> PathBuf {
        project_path.join(".afk-worktrees").join(name.as_str())
    }

    /// Branch name derived deterministically from the session name:
    /// `afk/<name>`.
    pub fn derive_branch_name(name: &SessionId) -> String {
        format!("afk/{}", name.as_str())
    }

    pub fn branch_name(&self) -> String {
        Self::derive_branch_name(&self.name)
    }
}

/// Form the time-encoded session name `<project>-<yymmdd-hhmmss>` from a
/// lowercased project name and a UTC timestamp.
pub fn format_session_name(project_name: &str, now: DateTime<Utc>) -> SessionId {
    SessionId::new(format!(
        "{}-{}",
        project_name.to_lowercase(),
        now.format("%y%m%d-%H%M%S")
    ))
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
