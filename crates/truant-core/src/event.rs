// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed events published on the event bus.
//!
//! Each variant of the distilled spec's closed sum is its own Rust type
//! here (not an enum) so that `EventBus::subscribe::<AgentResult>()` can
//! select exactly one shape — see `truant-eventbus`. `EventLevel` is
//! advisory: the core assigns it, renderers decide how to present it.

use crate::session::{ChannelId, SessionId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

/// Importance hint carried on every event. Guidance only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventLevel {
    /// Internal bookkeeping; typically not shown to the operator.
    Internal,
    /// Background progress (tool calls, partial output).
    Progress,
    /// Ordinary conversational content.
    Info,
    /// Needs the operator's attention.
    Notify,
}

/// One block of assistant content: `{"type": "text", "text": "..."}`,
/// `{"type": "tool_use", ...}`, or `{"type": "tool_result", ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub fields: Value,
}

impl ContentBlock {
    pub fn is_text(&self) -> bool {
        self.kind == "text"
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: "text".into(),
            fields: serde_json::json!({ "text": text.into() }),
        }
    }

    pub fn tool_use(name: impl Into<String>, input: Value) -> Self {
        Self {
            kind: "tool_use".into(),
            fields: serde_json::json!({ "name": name.into(), "input": input }),
        }
    }
}

/// Raw `system` event from the agent; captures the agent-internal session
/// id on first occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSystem {
    pub channel_id: ChannelId,
    #[serde(default)]
    pub agent_session_id: Option<String>,
    pub level: EventLevel,
}

impl AgentSystem {
    pub fn new(channel_id: ChannelId, agent_session_id: Option<String>) -> Self {
        Self {
            channel_id,
            agent_session_id,
            level: EventLevel::Internal,
        }
    }
}

/// Assistant turn: content blocks plus the derived level (INFO if any
/// block is text, PROGRESS for pure tool-use/tool-result turns).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentAssistant {
    pub channel_id: ChannelId,
    pub content_blocks: Vec<ContentBlock>,
    pub session_name: SessionId,
    pub level: EventLevel,
    pub verbose: bool,
}

/// A tool permission request; session state moves to `waiting_permission`
/// while this is outstanding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentPermissionRequest {
    pub channel_id: ChannelId,
    pub request_id: String,
    pub tool_name: String,
    pub tool_input: Value,
    pub level: EventLevel,
}

impl AgentPermissionRequest {
    pub fn new(
        channel_id: ChannelId,
        request_id: impl Into<String>,
        tool_name: impl Into<String>,
        tool_input: Value,
    ) -> Self {
        Self {
            channel_id,
            request_id: request_id.into(),
            tool_name: tool_name.into(),
            tool_input,
            level: EventLevel::Notify,
        }
    }
}

/// Final result of a turn: cost and duration. Always followed by an
/// `AgentInputRequest`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResult {
    pub channel_id: ChannelId,
    pub cost_usd: f64,
    pub duration_ms: u64,
    pub level: EventLevel,
}

impl AgentResult {
    pub fn new(channel_id: ChannelId, cost_usd: f64, duration_ms: u64) -> Self {
        Self {
            channel_id,
            cost_usd,
            duration_ms,
            level: EventLevel::Notify,
        }
    }
}

/// Companion to `AgentResult`: the agent is idle and ready for the next
/// operator message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentInputRequest {
    pub channel_id: ChannelId,
    pub session_name: SessionId,
    pub level: EventLevel,
}

impl AgentInputRequest {
    pub fn new(channel_id: ChannelId, session_name: SessionId) -> Self {
        Self {
            channel_id,
            session_name,
            level: EventLevel::Notify,
        }
    }
}

/// The agent's stream ended unexpectedly (crash) or was torn down by a
/// lifecycle operation; the control plane should inform the operator and
/// close the channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStopped {
    pub channel_id: ChannelId,
    pub session_name: SessionId,
    pub level: EventLevel,
}

impl AgentStopped {
    pub fn new(channel_id: ChannelId, session_name: SessionId) -> Self {
        Self {
            channel_id,
            session_name,
            level: EventLevel::Notify,
        }
    }
}

/// The agent produced a file; renderers decide whether to upload it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileReady {
    pub channel_id: ChannelId,
    pub file_path: PathBuf,
    pub file_name: String,
    pub level: EventLevel,
}

impl FileReady {
    pub fn new(channel_id: ChannelId, file_path: PathBuf, file_name: impl Into<String>) -> Self {
        Self {
            channel_id,
            file_path,
            file_name: file_name.into(),
            level: EventLevel::Info,
        }
    }
}

/// A new session (and possibly a new managed channel) has been created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionCreated {
    pub channel_id: ChannelId,
    pub session_name: SessionId,
    pub project_name: String,
    pub project_path: PathBuf,
    pub worktree_path: PathBuf,
    pub verbose: bool,
}

/// Convenience sum type so logging/replay code can store "some event"
/// without being generic. The event bus itself never deals in this type —
/// subscribers ask for one concrete variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename = "agent_system")]
    AgentSystem(AgentSystem),
    #[serde(rename = "agent_assistant")]
    AgentAssistant(AgentAssistant),
    #[serde(rename = "agent_permission_request")]
    AgentPermissionRequest(AgentPermissionRequest),
    #[serde(rename = "agent_result")]
    AgentResult(AgentResult),
    #[serde(rename = "agent_input_request")]
    AgentInputRequest(AgentInputRequest),
    #[serde(rename = "agent_stopped")]
    AgentStopped(AgentStopped),
    #[serde(rename = "file_ready")]
    FileReady(FileReady),
    #[serde(rename = "session_created")]
    SessionCreated(SessionCreated),
}

impl Event {
    pub fn channel_id(&self) -> &ChannelId {
        match self {
            Event::AgentSystem(e) => &e.channel_id,
            Event::AgentAssistant(e) => &e.channel_id,
            Event::AgentPermissionRequest(e) => &e.channel_id,
            Event::AgentResult(e) => &e.channel_id,
            Event::AgentInputRequest(e) => &e.channel_id,
            Event::AgentStopped(e) => &e.channel_id,
            Event::FileReady(e) => &e.channel_id,
            Event::SessionCreated(e) => &e.channel_id,
        }
    }

    pub fn level(&self) -> EventLevel {
        match self {
            Event::AgentSystem(e) => e.level,
            Event::AgentAssistant(e) => e.level,
            Event::AgentPermissionRequest(e) => e.level,
            Event::AgentResult(e) => e.level,
            Event::AgentInputRequest(e) => e.level,
            Event::AgentStopped(e) => e.level,
            Event::FileReady(e) => e.level,
            Event::SessionCreated(_) => EventLevel::Info,
        }
    }
}

/// Classify a batch of assistant content blocks per the spec's rule:
/// any `text` block => INFO, otherwise PROGRESS (including an empty list).
pub fn classify_assistant_level(blocks: &[ContentBlock]) -> EventLevel {
    if blocks.iter().any(ContentBlock::is_text) {
        EventLevel::Info
    } else {
        EventLevel::Progress
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
