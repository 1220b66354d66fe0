// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::Utc;
use tempfile::tempdir;
use truant_core::{SessionId, SessionState};

fn sample(channel: &str) -> SessionRecord {
    SessionRecord {
        name: SessionId::new(format!("demo-26010{channel}-000000")),
        project_name: "demo".into(),
        project_path: "/tmp/demo".into(),
        workspace_path: format!("/tmp/demo/.afk-worktrees/demo-26010{channel}-000000").into(),
        channel_id: ChannelId::new(channel),
        agent_session_id: None,
        state: SessionState::Idle,
        verbose: false,
        managed_channel: true,
        template: None,
        agent_name: "claude".into(),
        created_at: Utc::now(),
    }
}

#[test]
fn upsert_then_get_round_trips() {
    let dir = tempdir().unwrap();
    let store = FsSessionStore::open(dir.path().join("sessions.json")).unwrap();
    store.upsert(sample("1")).unwrap();

    let found = store.get(&ChannelId::new("1")).unwrap();
    assert_eq!(found.project_name, "demo");
}

#[test]
fn upsert_persists_across_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sessions.json");
    {
        let store = FsSessionStore::open(path.clone()).unwrap();
        store.upsert(sample("1")).unwrap();
        store.upsert(sample("2")).unwrap();
    }

    let reopened = FsSessionStore::open(path).unwrap();
    assert_eq!(reopened.list().len(), 2);
}

#[test]
fn upsert_with_same_channel_replaces_entry() {
    let dir = tempdir().unwrap();
    let store = FsSessionStore::open(dir.path().join("sessions.json")).unwrap();
    store.upsert(sample("1")).unwrap();

    let mut second = sample("1");
    second.state = SessionState::Running;
    store.upsert(second).unwrap();

    assert_eq!(store.list().len(), 1);
    assert_eq!(store.get(&ChannelId::new("1")).unwrap().state, SessionState::Running);
}

#[test]
fn remove_missing_channel_is_a_no_op() {
    let dir = tempdir().unwrap();
    let store = FsSessionStore::open(dir.path().join("sessions.json")).unwrap();
    assert!(store.remove(&ChannelId::new("ghost")).unwrap().is_none());
}
