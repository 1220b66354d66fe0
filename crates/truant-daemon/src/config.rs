// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem layout and environment configuration, generalizing the
//! teacher's `OJ_STATE_DIR` / `XDG_STATE_HOME` resolution order to this
//! supervisor's own namespace.

use std::path::PathBuf;

use crate::error::DaemonError;

/// Paths the daemon reads and writes. Every path is derived from
/// `state_dir`; nothing here is configurable independently, matching the
/// teacher's single-`state_dir`-root layout.
#[derive(Debug, Clone)]
pub struct Config {
    pub state_dir: PathBuf,
    pub sessions_path: PathBuf,
    pub projects_path: PathBuf,
    pub messages_dir: PathBuf,
    pub pid_path: PathBuf,
    pub logs_dir: PathBuf,
    pub templates_dir: PathBuf,
    /// Parent directory `init_project` creates new project checkouts
    /// under. Absent unless `BASE_PATH` is set: `add_project` (pointing
    /// at an existing directory) works regardless.
    pub base_path: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self, DaemonError> {
        let state_dir = state_dir()?;
        Ok(Self {
            sessions_path: state_dir.join("sessions.json"),
            projects_path: state_dir.join("projects.json"),
            messages_dir: state_dir.join("messages"),
            pid_path: state_dir.join("pids"),
            logs_dir: state_dir.join("logs"),
            templates_dir: state_dir.join("templates"),
            state_dir,
            base_path: std::env::var(env_keys::BASE_PATH).ok().map(PathBuf::from),
        })
    }
}

/// `TRUANT_STATE_DIR` > `XDG_STATE_HOME/truant` > `~/.local/state/truant`.
fn state_dir() -> Result<PathBuf, DaemonError> {
    if let Ok(dir) = std::env::var("TRUANT_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("truant"));
    }
    let home = std::env::var("HOME")
        .map_err(|_| DaemonError::Io(std::io::Error::other("cannot resolve state directory: $HOME unset")))?;
    Ok(PathBuf::from(home).join(".local/state/truant"))
}

/// Default agent name used when `new_session` does not specify one.
pub const DEFAULT_AGENT_NAME: &str = "claude";

/// Environment keys the supervisor reads. Each is independent; only
/// `BOT_TOKEN`/`GROUP_ID` become required together, and only when a chat
/// control plane is actually wired up outside this crate.
pub mod env_keys {
    pub const BOT_TOKEN: &str = "BOT_TOKEN";
    pub const GROUP_ID: &str = "GROUP_ID";
    pub const HTTP_PORT: &str = "HTTP_PORT";
    pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
    pub const AGENT: &str = "AGENT";
    pub const BASE_PATH: &str = "BASE_PATH";
    pub const DEEP_RESEARCH_MODEL: &str = "DEEP_RESEARCH_MODEL";
    pub const DEEP_RESEARCH_MAX_TOOL_CALLS: &str = "DEEP_RESEARCH_MAX_TOOL_CALLS";
}
