// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake agent port for deterministic testing.

use crate::{AgentError, AgentPort, RawAgentEvent};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

/// Recorded call to [`FakeAgentPort`].
#[derive(Debug, Clone, PartialEq)]
pub enum AgentCall {
    Start {
        working_dir: PathBuf,
        session_id: Option<String>,
    },
    SendMessage(String),
    PermissionResponse { request_id: String, allowed: bool },
    Stop,
}

/// A programmable [`AgentPort`] double. Queue raw responses with
/// [`FakeAgentPort::push_response`] before or after `start()`;
/// `next_response` drains them in FIFO order and returns `None` once
/// the queue is empty and `stop()` has been called.
pub struct FakeAgentPort {
    calls: Vec<AgentCall>,
    queued_responses: VecDeque<RawAgentEvent>,
    alive: bool,
    session_id: Option<String>,
    start_error: Option<String>,
    send_error: Option<String>,
    pid: Option<u32>,
}

impl Default for FakeAgentPort {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeAgentPort {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            queued_responses: VecDeque::new(),
            alive: false,
            session_id: None,
            start_error: None,
            send_error: None,
            pid: None,
        }
    }

    pub fn push_response(&mut self, event: RawAgentEvent) {
        self.queued_responses.push_back(event);
    }

    /// Simulate a live child PID so callers that register transports with
    /// a subprocess tracker have something to observe.
    pub fn set_pid(&mut self, pid: u32) {
        self.pid = Some(pid);
    }

    pub fn calls(&self) -> &[AgentCall] {
        &self.calls
    }

    pub fn set_start_error(&mut self, message: impl Into<String>) {
        self.start_error = Some(message.into());
    }

    pub fn set_send_error(&mut self, message: impl Into<String>) {
        self.send_error = Some(message.into());
    }
}

#[async_trait]
impl AgentPort for FakeAgentPort {
    fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    fn is_alive(&self) -> bool {
        self.alive
    }

    async fn start(
        &mut self,
        working_dir: &Path,
        session_id: Option<&str>,
        _stderr_log_path: Option<&Path>,
    ) -> Result<(), AgentError> {
        self.calls.push(AgentCall::Start {
            working_dir: working_dir.to_path_buf(),
            session_id: session_id.map(str::to_string),
        });
        if let Some(message) = self.start_error.take() {
            return Err(AgentError::SpawnFailed(message));
        }
        self.alive = true;
        if let Some(id) = session_id {
            self.session_id = Some(id.to_string());
        }
        Ok(())
    }

    async fn send_message(&mut self, text: &str) -> Result<(), AgentError> {
        self.calls.push(AgentCall::SendMessage(text.to_string()));
        if !self.alive {
            return Err(AgentError::NotAlive);
        }
        if let Some(message) = self.send_error.take() {
            return Err(AgentError::SendFailed(message));
        }
        Ok(())
    }

    async fn send_permission_response(
        &mut self,
        request_id: &str,
        allowed: bool,
    ) -> Result<(), AgentError> {
        self.calls.push(AgentCall::PermissionResponse {
            request_id: request_id.to_string(),
            allowed,
        });
        if !self.alive {
            return Err(AgentError::NotAlive);
        }
        Ok(())
    }

    async fn next_response(&mut self) -> Option<RawAgentEvent> {
        self.queued_responses.pop_front()
    }

    async fn stop(&mut self) {
        self.calls.push(AgentCall::Stop);
        self.alive = false;
    }

    fn pid(&self) -> Option<u32> {
        self.pid
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
