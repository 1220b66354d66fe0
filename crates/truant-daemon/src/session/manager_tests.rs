// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use async_trait::async_trait;
use serde_json::json;
use std::process::Command;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::time::{timeout, Duration};
use truant_agent::FakeAgentPort;
use truant_core::event::{AgentStopped, AgentSystem, SessionCreated};
use truant_core::FakeClock;
use truant_storage::{InMemoryProjectStore, InMemorySessionStore};

use crate::subprocess_tracker::SubprocessTracker;

fn init_repo() -> TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    let run = |args: &[&str]| {
        let status = Command::new("git")
            .args(args)
            .current_dir(dir.path())
            .status()
            .expect("git available");
        assert!(status.success(), "git {args:?} failed");
    };
    run(&["init", "-b", "main"]);
    run(&["config", "user.email", "test@example.com"]);
    run(&["config", "user.name", "test"]);
    std::fs::write(dir.path().join("README.md"), "hello\n").expect("write");
    run(&["add", "-A"]);
    run(&["commit", "-m", "initial"]);
    dir
}

struct NullControlPlane;

#[async_trait]
impl ControlPlanePort for NullControlPlane {
    async fn send_message(
        &self,
        _channel_id: &ChannelId,
        _text: &str,
        _silent: bool,
    ) -> Result<String, crate::error::ControlPlaneError> {
        Ok("msg-1".to_string())
    }

    async fn edit_message(
        &self,
        _channel_id: &ChannelId,
        _message_id: &str,
        _text: &str,
    ) -> Result<(), crate::error::ControlPlaneError> {
        Ok(())
    }

    async fn send_permission_request(
        &self,
        _channel_id: &ChannelId,
        _tool_name: &str,
        _tool_input: &serde_json::Value,
        _request_id: &str,
    ) -> Result<(), crate::error::ControlPlaneError> {
        Ok(())
    }

    async fn create_session_channel(&self, name: &str) -> Result<ChannelId, crate::error::ControlPlaneError> {
        Ok(ChannelId::new(format!("chan-{name}")))
    }

    async fn close_session_channel(&self, _channel_id: &ChannelId) -> Result<(), crate::error::ControlPlaneError> {
        Ok(())
    }

    fn get_channel_link(&self, _channel_id: &ChannelId) -> Option<String> {
        None
    }

    async fn start(&self) -> Result<(), crate::error::ControlPlaneError> {
        Ok(())
    }

    async fn stop(&self) -> Result<(), crate::error::ControlPlaneError> {
        Ok(())
    }
}

fn manager_with(
    registry: AgentRegistry,
) -> (SessionManager<FakeClock>, Arc<InMemorySessionStore>, TempDir) {
    let logs_dir = tempfile::tempdir().expect("logs dir");
    let store = Arc::new(InMemorySessionStore::default());
    let manager = SessionManager::new(
        store.clone() as Arc<dyn SessionStore>,
        Arc::new(registry),
        EventBus::new(),
        Some(Arc::new(NullControlPlane)),
        Vec::new(),
        FakeClock::default(),
        logs_dir.path().to_path_buf(),
        HashSet::new(),
        Arc::new(SubprocessTracker::new()),
    );
    (manager, store, logs_dir)
}

fn manager_with_bus(
    registry: AgentRegistry,
    event_bus: EventBus,
) -> (SessionManager<FakeClock>, Arc<InMemorySessionStore>, TempDir) {
    let logs_dir = tempfile::tempdir().expect("logs dir");
    let store = Arc::new(InMemorySessionStore::default());
    let manager = SessionManager::new(
        store.clone() as Arc<dyn SessionStore>,
        Arc::new(registry),
        event_bus,
        Some(Arc::new(NullControlPlane)),
        Vec::new(),
        FakeClock::default(),
        logs_dir.path().to_path_buf(),
        HashSet::new(),
        Arc::new(SubprocessTracker::new()),
    );
    (manager, store, logs_dir)
}

fn manager_with_tracker(
    registry: AgentRegistry,
    pid_file: PathBuf,
) -> (SessionManager<FakeClock>, Arc<InMemorySessionStore>, TempDir) {
    let logs_dir = tempfile::tempdir().expect("logs dir");
    let store = Arc::new(InMemorySessionStore::default());
    let tracker = Arc::new(SubprocessTracker::new());
    tracker.set_pid_file(pid_file);
    let manager = SessionManager::new(
        store.clone() as Arc<dyn SessionStore>,
        Arc::new(registry),
        EventBus::new(),
        Some(Arc::new(NullControlPlane)),
        Vec::new(),
        FakeClock::default(),
        logs_dir.path().to_path_buf(),
        HashSet::new(),
        tracker,
    );
    (manager, store, logs_dir)
}

#[tokio::test]
async fn create_session_persists_idle_record_and_publishes_creation() {
    let repo = init_repo();
    let mut registry = AgentRegistry::new();
    registry.register("claude", || {
        let mut fake = FakeAgentPort::new();
        fake.push_response(json!({"type": "system", "session_id": "agent-sess-1"}));
        Box::new(fake)
    });

    let bus = EventBus::new();
    let mut created_sub = bus.subscribe::<SessionCreated>(4);
    let mut system_sub = bus.subscribe::<AgentSystem>(4);
    let (manager, store, _logs) = manager_with_bus(registry, bus);

    let project = Project::new("demo", repo.path().to_path_buf(), FakeClock::default().now());
    let record = manager
        .create_session(&project, None, None, None, false)
        .await
        .expect("create_session succeeds");

    assert_eq!(record.state, SessionState::Idle);
    assert!(record.workspace_path.exists());

    let created = timeout(Duration::from_secs(2), created_sub.next())
        .await
        .expect("no timeout")
        .expect("event delivered");
    assert_eq!(created.channel_id, record.channel_id);

    timeout(Duration::from_secs(2), system_sub.next())
        .await
        .expect("no timeout")
        .expect("event delivered");

    // Give the reader loop a moment to persist the captured agent session id.
    for _ in 0..50 {
        if let Some(persisted) = store.get(&record.channel_id) {
            if persisted.agent_session_id.as_deref() == Some("agent-sess-1") {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("agent session id was never persisted");
}

#[tokio::test]
async fn create_session_rejects_non_repo_project() {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = AgentRegistry::new();
    let (manager, _store, _logs) = manager_with(registry);

    let project = Project::new("demo", dir.path().to_path_buf(), FakeClock::default().now());
    let err = manager
        .create_session(&project, None, None, None, false)
        .await
        .expect_err("not a repo");
    assert!(matches!(err, DaemonError::NotAVCSRepo(_)));
}

#[tokio::test]
async fn create_session_writes_a_session_activity_log() {
    let repo = init_repo();
    let mut registry = AgentRegistry::new();
    registry.register("claude", || Box::new(FakeAgentPort::new()));
    let (manager, _store, logs) = manager_with(registry);

    let project = Project::new("demo", repo.path().to_path_buf(), FakeClock::default().now());
    let record = manager
        .create_session(&project, None, None, None, false)
        .await
        .expect("create_session succeeds");

    let session_log_path = logs.path().join(record.name.as_str()).join("session.log");
    let contents = std::fs::read_to_string(&session_log_path).expect("session.log exists and is readable");
    assert!(contents.contains("session created"));
    assert!(contents.contains("agent"));
}

#[tokio::test]
async fn create_session_tracks_and_stop_session_untracks_the_agent_pid() {
    let repo = init_repo();
    let mut registry = AgentRegistry::new();
    registry.register("claude", || {
        let mut fake = FakeAgentPort::new();
        fake.set_pid(424242);
        Box::new(fake)
    });
    let pid_dir = tempfile::tempdir().expect("pid dir");
    let pid_file = pid_dir.path().join("pids");
    let (manager, _store, _logs) = manager_with_tracker(registry, pid_file.clone());

    let project = Project::new("demo", repo.path().to_path_buf(), FakeClock::default().now());
    let record = manager
        .create_session(&project, None, None, None, false)
        .await
        .expect("create_session succeeds");

    let tracked = std::fs::read_to_string(&pid_file).expect("pid file written on track");
    assert!(tracked.contains("424242"));

    manager.stop_session(&record.channel_id).await.expect("stop ok");

    let after_stop = std::fs::read_to_string(&pid_file).expect("pid file still readable");
    assert!(!after_stop.contains("424242"), "pid should be untracked on stop");
}

#[tokio::test]
async fn stop_session_removes_worktree_and_record() {
    let repo = init_repo();
    let mut registry = AgentRegistry::new();
    registry.register("claude", || Box::new(FakeAgentPort::new()));
    let (manager, store, _logs) = manager_with(registry);

    let project = Project::new("demo", repo.path().to_path_buf(), FakeClock::default().now());
    let record = manager
        .create_session(&project, None, None, None, false)
        .await
        .expect("create_session succeeds");

    let stopped = manager.stop_session(&record.channel_id).await.expect("stop ok");
    assert!(stopped);
    assert!(store.get(&record.channel_id).is_none());
    assert!(!record.workspace_path.exists());

    let stopped_again = manager.stop_session(&record.channel_id).await.expect("stop ok");
    assert!(!stopped_again, "stop_session is idempotent");
}

#[tokio::test]
async fn complete_session_merges_and_removes_worktree() {
    let repo = init_repo();
    let mut registry = AgentRegistry::new();
    registry.register("claude", || Box::new(FakeAgentPort::new()));
    let (manager, store, _logs) = manager_with(registry);

    let project = Project::new("demo", repo.path().to_path_buf(), FakeClock::default().now());
    let record = manager
        .create_session(&project, None, None, None, false)
        .await
        .expect("create_session succeeds");

    std::fs::write(record.workspace_path.join("change.txt"), "work\n").expect("write change");

    let (success, _detail) = manager
        .complete_session(&record.channel_id)
        .await
        .expect("complete ok");
    assert!(success);
    assert!(store.get(&record.channel_id).is_none());
    assert!(!record.workspace_path.exists());
    assert!(repo.path().join("change.txt").exists());
}

#[tokio::test]
async fn recover_sessions_resumes_and_sets_idle() {
    // Built by hand (not via `create_session`) so there is no live reader
    // task racing to flip the record's state while the test is asserting
    // on it.
    let repo = init_repo();
    let project = Project::new("demo", repo.path().to_path_buf(), FakeClock::default().now());
    let session_name = SessionId::new("demo-260101-000000");
    let workspace_path = SessionRecord::derive_workspace_path(&project.path, &session_name);
    let branch_name = SessionRecord::derive_branch_name(&session_name);
    create_worktree(&project.path, &workspace_path, &branch_name)
        .await
        .expect("create worktree");

    let channel_id = ChannelId::new("chan-demo");
    let suspended = SessionRecord {
        name: session_name.clone(),
        project_name: project.name.clone(),
        project_path: project.path.clone(),
        workspace_path: workspace_path.clone(),
        channel_id: channel_id.clone(),
        agent_session_id: Some("resume-id".to_string()),
        state: SessionState::Suspended,
        verbose: false,
        managed_channel: false,
        template: None,
        agent_name: "claude".to_string(),
        created_at: FakeClock::default().now(),
    };

    let logs_dir = tempfile::tempdir().expect("logs dir");
    let store = Arc::new(InMemorySessionStore::default());
    store.upsert(suspended).expect("seed suspended record");

    let mut registry = AgentRegistry::new();
    registry.register("claude", || Box::new(FakeAgentPort::new()));
    let manager = SessionManager::new(
        store.clone() as Arc<dyn SessionStore>,
        Arc::new(registry),
        EventBus::new(),
        None,
        Vec::new(),
        FakeClock::default(),
        logs_dir.path().to_path_buf(),
        HashSet::new(),
        Arc::new(SubprocessTracker::new()),
    );

    let projects = InMemoryProjectStore::default();
    projects.insert(project).expect("insert project");

    manager.recover_sessions(&projects).await.expect("recover ok");

    let recovered = store.get(&channel_id).expect("record still present");
    assert_eq!(recovered.state, SessionState::Idle);

    manager.suspend_all_sessions().await.expect("suspend ok");
}

#[tokio::test]
async fn cleanup_orphan_worktrees_removes_unreferenced_worktrees() {
    let repo = init_repo();
    let registry = AgentRegistry::new();
    let (manager, _store, _logs) = manager_with(registry);

    let orphan_path = repo.path().join(".afk-worktrees").join("demo-orphan");
    truant_workspace::create_worktree(repo.path(), &orphan_path, "afk/demo-orphan")
        .await
        .expect("create orphan worktree");

    let projects = InMemoryProjectStore::default();
    let project = Project::new("demo", repo.path().to_path_buf(), FakeClock::default().now());
    projects.insert(project).expect("insert project");

    manager.cleanup_orphan_worktrees(&projects).await.expect("cleanup ok");
    assert!(!orphan_path.exists());
}

#[tokio::test]
async fn permission_request_waits_then_response_reaches_agent_and_resumes_running() {
    let repo = init_repo();
    let mut registry = AgentRegistry::new();
    registry.register("claude", || {
        let mut fake = FakeAgentPort::new();
        fake.push_response(json!({"type": "system", "session_id": "agent-sess-1"}));
        fake.push_response(json!({
            "type": "permission_request",
            "id": "req-1",
            "tool_name": "bash",
            "tool_input": {"command": "rm -rf /tmp/x"},
        }));
        fake.push_response(json!({
            "type": "assistant",
            "content": [{"type": "text", "text": "done"}],
        }));
        Box::new(fake)
    });

    let bus = EventBus::new();
    let mut permission_sub = bus.subscribe::<truant_core::event::AgentPermissionRequest>(4);
    let (manager, store, _logs) = manager_with_bus(registry, bus);

    let project = Project::new("demo", repo.path().to_path_buf(), FakeClock::default().now());
    let record = manager
        .create_session(&project, None, None, None, false)
        .await
        .expect("create_session succeeds");

    let requested = timeout(Duration::from_secs(2), permission_sub.next())
        .await
        .expect("no timeout")
        .expect("event delivered");
    assert_eq!(requested.request_id, "req-1");

    // The reader loop keeps draining its queue without waiting for a
    // response, so by now the session may already be past
    // `WaitingPermission`; `permission_response` only needs the agent
    // to still be live, not the record to be in any particular state.
    let handled = manager
        .permission_response(&record.channel_id, "req-1", true)
        .await
        .expect("permission_response ok");
    assert!(handled);

    for _ in 0..50 {
        if let Some(persisted) = store.get(&record.channel_id) {
            if persisted.state == SessionState::Running {
                manager.suspend_all_sessions().await.expect("suspend ok");
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("session never resumed running after permission response");
}

#[tokio::test]
async fn permission_response_is_not_handled_for_unknown_channel() {
    let registry = AgentRegistry::new();
    let (manager, _store, _logs) = manager_with(registry);

    let handled = manager
        .permission_response(&ChannelId::new("no-such-channel"), "req-1", true)
        .await
        .expect("permission_response ok");
    assert!(!handled);
}

#[tokio::test]
async fn complete_session_reports_conflict_and_restarts_agent_for_continued_use() {
    let repo = init_repo();
    let mut registry = AgentRegistry::new();
    registry.register("claude", || Box::new(FakeAgentPort::new()));
    let (manager, store, _logs) = manager_with(registry);

    let project = Project::new("demo", repo.path().to_path_buf(), FakeClock::default().now());
    let record = manager
        .create_session(&project, None, None, None, false)
        .await
        .expect("create_session succeeds");

    // Conflicting edits to the same file on both sides of the branch.
    std::fs::write(record.workspace_path.join("README.md"), "from branch\n").expect("write branch change");

    let run = |args: &[&str], dir: &std::path::Path| {
        let status = Command::new("git")
            .args(args)
            .current_dir(dir)
            .status()
            .expect("git available");
        assert!(status.success(), "git {args:?} failed");
    };
    std::fs::write(repo.path().join("README.md"), "from main\n").expect("write main change");
    run(&["add", "-A"], repo.path());
    run(&["commit", "-m", "diverge main"], repo.path());

    let (success, detail) = manager
        .complete_session(&record.channel_id)
        .await
        .expect("complete ok");

    assert!(!success);
    assert!(!detail.is_empty());

    // The session is restarted in place, not torn down: the worktree and
    // the persisted record must both still exist, with the agent live
    // again underneath the same channel id.
    assert!(record.workspace_path.exists());
    let persisted = store.get(&record.channel_id).expect("record still present after conflict");
    assert_eq!(persisted.channel_id, record.channel_id);

    manager.suspend_all_sessions().await.expect("suspend ok");
}

#[tokio::test]
async fn unexpected_agent_exit_marks_stopped_and_publishes_event() {
    let repo = init_repo();
    let mut registry = AgentRegistry::new();
    registry.register("claude", || Box::new(FakeAgentPort::new()));

    let bus = EventBus::new();
    let mut stopped_sub = bus.subscribe::<AgentStopped>(4);
    let (manager, store, _logs) = manager_with_bus(registry, bus);

    let project = Project::new("demo", repo.path().to_path_buf(), FakeClock::default().now());
    let record = manager
        .create_session(&project, None, None, None, false)
        .await
        .expect("create_session succeeds");

    // FakeAgentPort's queue is empty from the start, so the reader loop
    // observes stream end on its very first poll.
    timeout(Duration::from_secs(2), stopped_sub.next())
        .await
        .expect("no timeout")
        .expect("event delivered");

    for _ in 0..50 {
        if let Some(persisted) = store.get(&record.channel_id) {
            if persisted.state == SessionState::Stopped {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("session was never marked stopped");
}
