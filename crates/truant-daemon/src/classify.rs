// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pure classification: raw decoded agent output in, typed events and a
//! state transition out. Kept free of I/O and locking so the rules in the
//! session-manager state table are exercised directly by tests.

use std::collections::HashSet;
use truant_core::event::{
    classify_assistant_level, AgentAssistant, AgentInputRequest, AgentPermissionRequest,
    AgentResult, AgentSystem, FileReady,
};
use truant_core::{ChannelId, Event, SessionId, SessionState};

use crate::raw_event::RawEvent;

pub struct ClassifyContext<'a> {
    pub channel_id: &'a ChannelId,
    pub session_name: &'a SessionId,
    pub verbose: bool,
    pub auto_approve_tools: &'a HashSet<String>,
}

#[derive(Debug, Default, PartialEq)]
pub struct Classification {
    pub events: Vec<Event>,
    pub new_state: Option<SessionState>,
    pub captured_agent_session_id: Option<String>,
    /// Set when a permission request matched the auto-approval policy: the
    /// reader loop must approve it directly on the agent port and must
    /// NOT publish the request event.
    pub auto_approve_request_id: Option<String>,
}

pub fn classify(raw: RawEvent, ctx: &ClassifyContext<'_>) -> Classification {
    match raw {
        RawEvent::System { session_id } => Classification {
            events: vec![Event::AgentSystem(AgentSystem::new(
                ctx.channel_id.clone(),
                session_id.clone(),
            ))],
            new_state: Some(SessionState::Idle),
            captured_agent_session_id: session_id,
            auto_approve_request_id: None,
        },
        RawEvent::Assistant { content_blocks } => {
            let level = classify_assistant_level(&content_blocks);
            Classification {
                events: vec![Event::AgentAssistant(AgentAssistant {
                    channel_id: ctx.channel_id.clone(),
                    content_blocks,
                    session_name: ctx.session_name.clone(),
                    level,
                    verbose: ctx.verbose,
                })],
                new_state: Some(SessionState::Running),
                ..Default::default()
            }
        }
        RawEvent::PermissionRequest {
            request_id,
            tool_name,
            tool_input,
        } => {
            if ctx.auto_approve_tools.contains(&tool_name) {
                Classification {
                    auto_approve_request_id: Some(request_id),
                    ..Default::default()
                }
            } else {
                Classification {
                    events: vec![Event::AgentPermissionRequest(AgentPermissionRequest::new(
                        ctx.channel_id.clone(),
                        request_id,
                        tool_name,
                        tool_input,
                    ))],
                    new_state: Some(SessionState::WaitingPermission),
                    ..Default::default()
                }
            }
        }
        RawEvent::Result { cost_usd, duration_ms } => Classification {
            events: vec![
                Event::AgentResult(AgentResult::new(ctx.channel_id.clone(), cost_usd, duration_ms)),
                Event::AgentInputRequest(AgentInputRequest::new(
                    ctx.channel_id.clone(),
                    ctx.session_name.clone(),
                )),
            ],
            new_state: Some(SessionState::Idle),
            ..Default::default()
        },
        RawEvent::FileOutput { file_path, file_name } => Classification {
            events: vec![Event::FileReady(FileReady::new(
                ctx.channel_id.clone(),
                file_path,
                file_name,
            ))],
            ..Default::default()
        },
        RawEvent::Unknown => Classification::default(),
    }
}

#[cfg(test)]
#[path = "classify_tests.rs"]
mod tests;
