// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! The Agent Port: a single contract for driving a coding agent, with
//! three interchangeable transports (streaming stdio, fire-and-complete,
//! polled remote) behind it. The Session Manager only ever sees
//! [`AgentPort`]; it resolves a concrete transport by name through an
//! [`AgentRegistry`] at session creation.

mod fire_and_complete;
mod polled;
mod registry;
mod scrub;
mod streaming;

pub use fire_and_complete::FireAndCompleteAgent;
pub use polled::PolledRemoteAgent;
pub use registry::AgentRegistry;
pub use scrub::scrub_nested_execution_env;
pub use streaming::StreamingStdioAgent;

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{AgentCall, FakeAgentPort};

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// A raw, unclassified event emitted by an agent transport. The Session
/// Manager's reader loop turns these into `truant_core::Event`s.
pub type RawAgentEvent = serde_json::Value;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("spawn failed: {0}")]
    SpawnFailed(String),
    #[error("send failed: {0}")]
    SendFailed(String),
    #[error("agent is not alive")]
    NotAlive,
    #[error("unknown agent: {0}")]
    UnknownAgent(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// A single contract for driving a coding agent, regardless of whether
/// the underlying process is long-lived, spawned per turn, or not a
/// local process at all.
#[async_trait]
pub trait AgentPort: Send {
    /// The agent-internal resumable conversation id, once known.
    fn session_id(&self) -> Option<&str>;

    /// Logical liveness between `start()` and `stop()`. For
    /// fire-and-complete transports this stays true even when no child
    /// is currently running.
    fn is_alive(&self) -> bool;

    /// Start the agent. If `session_id` is given, resume that
    /// conversation; otherwise begin a fresh one. If `stderr_log_path`
    /// is given, append the subprocess's stderr to it line by line.
    ///
    /// Implementations MUST scrub ambient nested-execution environment
    /// variables (see [`scrub_nested_execution_env`]) before spawning
    /// any child process.
    async fn start(
        &mut self,
        working_dir: &Path,
        session_id: Option<&str>,
        stderr_log_path: Option<&Path>,
    ) -> Result<(), AgentError>;

    /// Push a user turn.
    async fn send_message(&mut self, text: &str) -> Result<(), AgentError>;

    /// Acknowledge a pending permission prompt.
    async fn send_permission_response(
        &mut self,
        request_id: &str,
        allowed: bool,
    ) -> Result<(), AgentError>;

    /// Pull the next raw event, or `None` once the agent has terminated
    /// and there is nothing left to read.
    async fn next_response(&mut self) -> Option<RawAgentEvent>;

    /// SIGTERM, wait up to 5s, then SIGKILL. Safe to call more than once.
    async fn stop(&mut self);

    /// OS PID of the currently-running child process, if any, so a
    /// caller can register it with a process-wide subprocess tracker.
    /// Transports with no local child (a remote backend, or a
    /// fire-and-complete transport between turns) return `None`.
    fn pid(&self) -> Option<u32> {
        None
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
