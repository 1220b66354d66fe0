// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

fn json_echo_agent() -> FireAndCompleteAgent {
    // Each "turn" is `echo '{"type":"assistant","text":"<arg>"}'`.
    FireAndCompleteAgent::new(
        "sh",
        vec!["-c".to_string(), "echo \"{\\\"type\\\":\\\"assistant\\\",\\\"text\\\":\\\"$0\\\"}\"".to_string()],
        "--resume",
    )
}

#[tokio::test]
async fn is_alive_between_start_and_stop_regardless_of_child() {
    let dir = tempdir().unwrap();
    let mut agent = json_echo_agent();
    assert!(!agent.is_alive());

    agent.start(dir.path(), None, None).await.unwrap();
    assert!(agent.is_alive());

    agent.stop().await;
    assert!(!agent.is_alive());
}

#[tokio::test]
async fn send_message_spawns_a_turn_and_forwards_its_output() {
    let dir = tempdir().unwrap();
    let mut agent = json_echo_agent();
    agent.start(dir.path(), None, None).await.unwrap();

    agent.send_message("hello").await.unwrap();
    let event = agent.next_response().await.unwrap();
    assert_eq!(event["type"], "assistant");
    assert_eq!(event["text"], "hello");

    agent.stop().await;
}

#[tokio::test]
async fn send_message_before_start_errors() {
    let mut agent = json_echo_agent();
    let err = agent.send_message("hi").await.unwrap_err();
    assert!(matches!(err, AgentError::NotAlive));
}

#[tokio::test]
async fn stop_kills_the_in_flight_child() {
    let dir = tempdir().unwrap();
    let mut agent = FireAndCompleteAgent::new("sh", vec!["-c".to_string(), "sleep 30".to_string()], "--resume");
    agent.start(dir.path(), None, None).await.unwrap();
    agent.send_message("go").await.unwrap();

    // Give the child a moment to actually spawn before checking its pid.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    let pid = agent.pid().expect("turn has a live pid");

    agent.stop().await;

    let still_alive = std::process::Command::new("kill")
        .args(["-0", &pid.to_string()])
        .status()
        .map(|s| s.success())
        .unwrap_or(false);
    assert!(!still_alive, "child should have been killed by stop()");
}

#[tokio::test]
async fn permission_response_is_unsupported() {
    let dir = tempdir().unwrap();
    let mut agent = json_echo_agent();
    agent.start(dir.path(), None, None).await.unwrap();

    let err = agent
        .send_permission_response("req-1", true)
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::SendFailed(_)));
}
