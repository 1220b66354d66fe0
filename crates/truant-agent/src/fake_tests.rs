// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::path::Path;

#[tokio::test]
async fn start_records_call_and_flips_alive() {
    let mut agent = FakeAgentPort::new();
    assert!(!agent.is_alive());

    agent
        .start(Path::new("/work"), Some("sess-1"), None)
        .await
        .unwrap();

    assert!(agent.is_alive());
    assert_eq!(agent.session_id(), Some("sess-1"));
    assert_eq!(
        agent.calls()[0],
        AgentCall::Start {
            working_dir: Path::new("/work").to_path_buf(),
            session_id: Some("sess-1".to_string()),
        }
    );
}

#[tokio::test]
async fn queued_responses_drain_in_order_then_end() {
    let mut agent = FakeAgentPort::new();
    agent.start(Path::new("/work"), None, None).await.unwrap();
    agent.push_response(serde_json::json!({"n": 1}));
    agent.push_response(serde_json::json!({"n": 2}));

    assert_eq!(agent.next_response().await.unwrap()["n"], 1);
    assert_eq!(agent.next_response().await.unwrap()["n"], 2);
    assert!(agent.next_response().await.is_none());
}

#[tokio::test]
async fn send_message_before_start_is_not_alive() {
    let mut agent = FakeAgentPort::new();
    let err = agent.send_message("hi").await.unwrap_err();
    assert!(matches!(err, AgentError::NotAlive));
}

#[tokio::test]
async fn set_start_error_is_returned_once() {
    let mut agent = FakeAgentPort::new();
    agent.set_start_error("boom");

    let err = agent.start(Path::new("/work"), None, None).await.unwrap_err();
    assert!(matches!(err, AgentError::SpawnFailed(m) if m == "boom"));
    assert!(!agent.is_alive());

    agent.start(Path::new("/work"), None, None).await.unwrap();
    assert!(agent.is_alive());
}

#[tokio::test]
async fn stop_flips_alive_and_is_recorded() {
    let mut agent = FakeAgentPort::new();
    agent.start(Path::new("/work"), None, None).await.unwrap();
    agent.stop().await;
    assert!(!agent.is_alive());
    assert_eq!(agent.calls().last(), Some(&AgentCall::Stop));
}
