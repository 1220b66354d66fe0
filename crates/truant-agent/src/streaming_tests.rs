// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

fn echo_agent() -> StreamingStdioAgent {
    StreamingStdioAgent::new(
        "sh",
        vec![
            "-c".to_string(),
            "echo '{\"type\":\"system\"}'; cat".to_string(),
        ],
        "--resume",
    )
}

#[tokio::test]
async fn start_then_next_response_reads_first_line() {
    let dir = tempdir().unwrap();
    let mut agent = echo_agent();
    agent.start(dir.path(), None, None).await.unwrap();

    assert!(agent.is_alive());
    let event = agent.next_response().await.unwrap();
    assert_eq!(event["type"], "system");

    agent.stop().await;
}

#[tokio::test]
async fn send_message_round_trips_through_cat() {
    let dir = tempdir().unwrap();
    let mut agent = echo_agent();
    agent.start(dir.path(), None, None).await.unwrap();
    let _ = agent.next_response().await; // the system line

    agent.send_message("hello").await.unwrap();
    let event = agent.next_response().await.unwrap();
    assert_eq!(event["type"], "user");
    assert_eq!(event["message"]["content"][0]["text"], "hello");

    agent.stop().await;
}

#[tokio::test]
async fn stop_is_idempotent() {
    let dir = tempdir().unwrap();
    let mut agent = echo_agent();
    agent.start(dir.path(), None, None).await.unwrap();
    agent.stop().await;
    agent.stop().await;
    assert!(!agent.is_alive());
}

#[tokio::test]
async fn send_message_before_start_errors() {
    let mut agent = echo_agent();
    let err = agent.send_message("hi").await.unwrap_err();
    assert!(matches!(err, AgentError::NotAlive));
}

#[tokio::test]
async fn next_response_returns_none_after_child_exits() {
    let dir = tempdir().unwrap();
    let mut agent = StreamingStdioAgent::new("true", vec![], "--resume");
    agent.start(dir.path(), None, None).await.unwrap();

    assert!(agent.next_response().await.is_none());
    assert!(!agent.is_alive());
}
