// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use std::collections::HashSet;
use truant_core::event::EventLevel;

fn ctx<'a>(
    channel_id: &'a ChannelId,
    session_name: &'a SessionId,
    auto_approve_tools: &'a HashSet<String>,
) -> ClassifyContext<'a> {
    ClassifyContext {
        channel_id,
        session_name,
        verbose: false,
        auto_approve_tools,
    }
}

#[test]
fn system_event_captures_session_id_and_sets_idle() {
    let channel = ChannelId::new("c1");
    let session = SessionId::new("proj-1");
    let allow = HashSet::new();
    let out = classify(
        RawEvent::System {
            session_id: Some("agent-sess-1".into()),
        },
        &ctx(&channel, &session, &allow),
    );

    assert_eq!(out.new_state, Some(SessionState::Idle));
    assert_eq!(out.captured_agent_session_id, Some("agent-sess-1".into()));
    assert_eq!(out.events.len(), 1);
    match &out.events[0] {
        Event::AgentSystem(e) => assert_eq!(e.level, EventLevel::Internal),
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn assistant_with_text_block_is_info_level_and_running() {
    let channel = ChannelId::new("c1");
    let session = SessionId::new("proj-1");
    let allow = HashSet::new();
    let out = classify(
        RawEvent::Assistant {
            content_blocks: vec![truant_core::ContentBlock::text("hello")],
        },
        &ctx(&channel, &session, &allow),
    );

    assert_eq!(out.new_state, Some(SessionState::Running));
    match &out.events[0] {
        Event::AgentAssistant(e) => assert_eq!(e.level, EventLevel::Info),
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn assistant_with_only_tool_use_is_progress_level() {
    let channel = ChannelId::new("c1");
    let session = SessionId::new("proj-1");
    let allow = HashSet::new();
    let out = classify(
        RawEvent::Assistant {
            content_blocks: vec![truant_core::ContentBlock::tool_use("bash", json!({}))],
        },
        &ctx(&channel, &session, &allow),
    );

    match &out.events[0] {
        Event::AgentAssistant(e) => assert_eq!(e.level, EventLevel::Progress),
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn permission_request_for_unknown_tool_publishes_and_waits() {
    let channel = ChannelId::new("c1");
    let session = SessionId::new("proj-1");
    let allow = HashSet::new();
    let out = classify(
        RawEvent::PermissionRequest {
            request_id: "req-1".into(),
            tool_name: "bash".into(),
            tool_input: json!({"command": "ls"}),
        },
        &ctx(&channel, &session, &allow),
    );

    assert_eq!(out.new_state, Some(SessionState::WaitingPermission));
    assert_eq!(out.auto_approve_request_id, None);
    assert_eq!(out.events.len(), 1);
}

#[test]
fn permission_request_for_allow_listed_tool_auto_approves_silently() {
    let channel = ChannelId::new("c1");
    let session = SessionId::new("proj-1");
    let mut allow = HashSet::new();
    allow.insert("plan_exit".to_string());
    let out = classify(
        RawEvent::PermissionRequest {
            request_id: "req-2".into(),
            tool_name: "plan_exit".into(),
            tool_input: json!({}),
        },
        &ctx(&channel, &session, &allow),
    );

    assert_eq!(out.auto_approve_request_id, Some("req-2".into()));
    assert!(out.events.is_empty());
    assert_eq!(out.new_state, None);
}

#[test]
fn result_publishes_result_and_input_request_and_sets_idle() {
    let channel = ChannelId::new("c1");
    let session = SessionId::new("proj-1");
    let allow = HashSet::new();
    let out = classify(
        RawEvent::Result {
            cost_usd: 0.5,
            duration_ms: 1000,
        },
        &ctx(&channel, &session, &allow),
    );

    assert_eq!(out.new_state, Some(SessionState::Idle));
    assert_eq!(out.events.len(), 2);
    assert!(matches!(out.events[0], Event::AgentResult(_)));
    assert!(matches!(out.events[1], Event::AgentInputRequest(_)));
}

#[test]
fn file_output_publishes_file_ready_without_state_change() {
    let channel = ChannelId::new("c1");
    let session = SessionId::new("proj-1");
    let allow = HashSet::new();
    let out = classify(
        RawEvent::FileOutput {
            file_path: "/tmp/report.pdf".into(),
            file_name: "report.pdf".into(),
        },
        &ctx(&channel, &session, &allow),
    );

    assert_eq!(out.new_state, None);
    assert_eq!(out.events.len(), 1);
    assert!(matches!(out.events[0], Event::FileReady(_)));
}

#[test]
fn unknown_produces_no_events_and_no_transition() {
    let channel = ChannelId::new("c1");
    let session = SessionId::new("proj-1");
    let allow = HashSet::new();
    let out = classify(RawEvent::Unknown, &ctx(&channel, &session, &allow));
    assert_eq!(out, Classification::default());
}
