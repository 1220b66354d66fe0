// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Session Manager: lifecycle, isolation, the per-session read loop,
//! persistence, and crash recovery. Generic over `Clock` so timestamps and
//! session-name derivation are deterministic under test, the way the
//! polled-remote agent transport is generic over its `RemoteClient`.

use std::collections::{HashMap, HashSet};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use truant_agent::{AgentPort, AgentRegistry};
use truant_core::event::{AgentStopped, Event};
use truant_core::session::format_session_name;
use truant_core::{ChannelId, Clock, Project, SessionId, SessionRecord, SessionState, SystemClock};
use truant_eventbus::EventBus;
use truant_storage::{LoadedTemplate, ProjectStore, SessionStore};
use truant_workspace::{
    commit_all, create_worktree, is_repo, list_afk_worktrees, rebase_then_fast_forward,
    remove_worktree,
};

use crate::capability::CapabilityHook;
use crate::classify::{classify, ClassifyContext};
use crate::control_plane::ControlPlanePort;
use crate::error::DaemonError;
use crate::raw_event;
use crate::subprocess_tracker::SubprocessTracker;

/// Handles a live session owns: an agent port shared with the reader task
/// (so `send_message`/`stop` can run from the facade while the reader is
/// mid-`next_response`), and the reader task's handle so lifecycle
/// operations can cancel it.
struct LiveSession {
    agent: Arc<tokio::sync::Mutex<Box<dyn AgentPort>>>,
    reader: Option<JoinHandle<()>>,
}

/// Everything the reader loop needs that doesn't change for the life of
/// the session.
#[derive(Clone)]
struct ReaderContext {
    channel_id: ChannelId,
    session_name: SessionId,
    verbose: bool,
    auto_approve_tools: Arc<HashSet<String>>,
}

pub struct SessionManager<C: Clock = SystemClock> {
    session_store: Arc<dyn SessionStore>,
    agent_registry: Arc<AgentRegistry>,
    event_bus: EventBus,
    control_plane: Option<Arc<dyn ControlPlanePort>>,
    capabilities: Vec<Arc<dyn CapabilityHook>>,
    clock: C,
    logs_dir: PathBuf,
    auto_approve_tools: Arc<HashSet<String>>,
    subprocess_tracker: Arc<SubprocessTracker>,
    sessions: tokio::sync::Mutex<HashMap<ChannelId, LiveSession>>,
}

impl<C: Clock> SessionManager<C> {
    pub fn new(
        session_store: Arc<dyn SessionStore>,
        agent_registry: Arc<AgentRegistry>,
        event_bus: EventBus,
        control_plane: Option<Arc<dyn ControlPlanePort>>,
        capabilities: Vec<Arc<dyn CapabilityHook>>,
        clock: C,
        logs_dir: PathBuf,
        auto_approve_tools: HashSet<String>,
        subprocess_tracker: Arc<SubprocessTracker>,
    ) -> Self {
        Self {
            session_store,
            agent_registry,
            event_bus,
            control_plane,
            capabilities,
            clock,
            logs_dir,
            auto_approve_tools: Arc::new(auto_approve_tools),
            subprocess_tracker,
            sessions: tokio::sync::Mutex::new(HashMap::new()),
        }
    }

    pub fn get_record(&self, channel_id: &ChannelId) -> Option<SessionRecord> {
        self.session_store.get(channel_id)
    }

    pub fn list_records(&self) -> Vec<SessionRecord> {
        self.session_store.list()
    }

    /// See the state-machine and step list in the Session Manager design:
    /// a fresh worktree, an optional scaffold, a channel if none was
    /// given, and the agent started on a clean conversation.
    pub async fn create_session(
        &self,
        project: &Project,
        channel_id: Option<ChannelId>,
        agent_name: Option<&str>,
        template: Option<&LoadedTemplate>,
        verbose: bool,
    ) -> Result<SessionRecord, DaemonError> {
        if !is_repo(&project.path).await {
            return Err(DaemonError::NotAVCSRepo(project.path.clone()));
        }

        let session_name = format_session_name(&project.name, self.clock.now());
        let workspace_path = SessionRecord::derive_workspace_path(&project.path, &session_name);
        let branch_name = SessionRecord::derive_branch_name(&session_name);

        if workspace_path.exists() {
            warn!(path = %workspace_path.display(), "stale worktree from a prior crash, removing");
            remove_worktree(&project.path, &workspace_path, &branch_name).await;
            if workspace_path.exists() {
                tokio::fs::remove_dir_all(&workspace_path).await?;
            }
        }

        create_worktree(&project.path, &workspace_path, &branch_name).await?;

        if let Some(template) = template {
            if let Err(e) = truant_storage::apply_scaffold(template, &workspace_path) {
                warn!(template = %template.config.name, error = %e, "failed to apply template scaffold");
            }
        }

        let session_logs_dir = self.logs_dir.join(session_name.as_str());
        tokio::fs::create_dir_all(&session_logs_dir).await?;
        let stderr_log_path = session_logs_dir.join("agent.stderr.log");
        let raw_log_path = session_logs_dir.join("agent.raw.log");
        append_session_log(
            &session_logs_dir,
            self.clock.now(),
            &format!("session created for project {}", project.name),
        );

        let (channel_id, managed_channel) = match channel_id {
            Some(channel_id) => (channel_id, false),
            None => {
                let control_plane = self.control_plane.as_ref().ok_or_else(|| {
                    DaemonError::from(crate::error::ControlPlaneError::NotSupported(
                        "create_session_channel",
                    ))
                })?;
                let channel_id = control_plane
                    .create_session_channel(session_name.as_str())
                    .await?;
                (channel_id, true)
            }
        };

        let agent_name = agent_name.unwrap_or(crate::config::DEFAULT_AGENT_NAME).to_string();
        let mut agent = self.agent_registry.build(&agent_name)?;

        if let Err(e) = agent.start(&workspace_path, None, Some(&stderr_log_path)).await {
            warn!(error = %e, "agent startup failed, rolling back session creation");
            remove_worktree(&project.path, &workspace_path, &branch_name).await;
            if managed_channel {
                if let Some(control_plane) = &self.control_plane {
                    let _ = control_plane.close_session_channel(&channel_id).await;
                }
            }
            return Err(DaemonError::from(e));
        }
        if let Some(pid) = agent.pid() {
            self.subprocess_tracker.track(pid);
        }

        let record = SessionRecord {
            name: session_name.clone(),
            project_name: project.name.clone(),
            project_path: project.path.clone(),
            workspace_path: workspace_path.clone(),
            channel_id: channel_id.clone(),
            agent_session_id: None,
            state: SessionState::Idle,
            verbose,
            managed_channel,
            template: template.map(|t| t.config.name.clone()),
            agent_name,
            created_at: self.clock.now(),
        };
        self.session_store.upsert(record.clone())?;

        let agent = Arc::new(tokio::sync::Mutex::new(agent));
        let ctx = ReaderContext {
            channel_id: channel_id.clone(),
            session_name: session_name.clone(),
            verbose,
            auto_approve_tools: Arc::clone(&self.auto_approve_tools),
        };
        let reader = self.spawn_reader(ctx, Arc::clone(&agent), raw_log_path);
        self.sessions.lock().await.insert(
            channel_id.clone(),
            LiveSession {
                agent,
                reader: Some(reader),
            },
        );

        self.event_bus.publish(truant_core::event::SessionCreated {
            channel_id,
            session_name,
            project_name: record.project_name.clone(),
            project_path: record.project_path.clone(),
            worktree_path: record.workspace_path.clone(),
            verbose,
        });

        append_session_log(
            &session_logs_dir,
            self.clock.now(),
            &format!("agent {} started, workspace {}", record.agent_name, record.workspace_path.display()),
        );
        info!(session = %record.name, "session created");
        Ok(record)
    }

    pub async fn send_message(&self, channel_id: &ChannelId, text: &str) -> Result<bool, DaemonError> {
        let agent = {
            let sessions = self.sessions.lock().await;
            let Some(entry) = sessions.get(channel_id) else {
                return Ok(false);
            };
            Arc::clone(&entry.agent)
        };
        agent.lock().await.send_message(text).await?;
        Ok(true)
    }

    pub async fn permission_response(
        &self,
        channel_id: &ChannelId,
        request_id: &str,
        allowed: bool,
    ) -> Result<bool, DaemonError> {
        let agent = {
            let sessions = self.sessions.lock().await;
            let Some(entry) = sessions.get(channel_id) else {
                return Ok(false);
            };
            Arc::clone(&entry.agent)
        };
        agent
            .lock()
            .await
            .send_permission_response(request_id, allowed)
            .await?;
        Ok(true)
    }

    /// Idempotent: returns `false` if no session existed for `channel_id`.
    pub async fn stop_session(&self, channel_id: &ChannelId) -> Result<bool, DaemonError> {
        let entry = {
            let mut sessions = self.sessions.lock().await;
            sessions.remove(channel_id)
        };
        let Some(mut entry) = entry else {
            return Ok(false);
        };

        if let Some(reader) = entry.reader.take() {
            reader.abort();
        }

        for capability in &self.capabilities {
            capability.cleanup(channel_id).await;
        }

        let Some(mut record) = self.session_store.get(channel_id) else {
            warn!(channel = %channel_id, "stopping a session with no persisted record");
            let mut agent = entry.agent.lock().await;
            if let Some(pid) = agent.pid() {
                self.subprocess_tracker.untrack(pid);
            }
            agent.stop().await;
            return Ok(true);
        };

        {
            let mut agent = entry.agent.lock().await;
            if let Some(pid) = agent.pid() {
                self.subprocess_tracker.untrack(pid);
            }
            agent.stop().await;
            if let Some(id) = agent.session_id() {
                record.agent_session_id = Some(id.to_string());
            }
        }

        append_session_log(&self.logs_dir.join(record.name.as_str()), self.clock.now(), "session stopped");
        remove_worktree(&record.project_path, &record.workspace_path, &record.branch_name()).await;
        self.session_store.remove(channel_id)?;

        if record.managed_channel {
            if let Some(control_plane) = &self.control_plane {
                if let Err(e) = control_plane.close_session_channel(channel_id).await {
                    warn!(channel = %channel_id, error = %e, "failed to close managed channel");
                }
            }
        }

        info!(session = %record.name, "session stopped");
        Ok(true)
    }

    /// Merge workflow. On rebase failure the agent is restarted and the
    /// session stays usable; the caller gets `(false, detail)`.
    pub async fn complete_session(&self, channel_id: &ChannelId) -> Result<(bool, String), DaemonError> {
        let entry = {
            let mut sessions = self.sessions.lock().await;
            sessions.remove(channel_id)
        };
        let Some(mut entry) = entry else {
            return Ok((false, "no such session".to_string()));
        };
        if let Some(reader) = entry.reader.take() {
            reader.abort();
        }

        for capability in &self.capabilities {
            capability.cleanup(channel_id).await;
        }

        let Some(mut record) = self.session_store.get(channel_id) else {
            let mut agent = entry.agent.lock().await;
            if let Some(pid) = agent.pid() {
                self.subprocess_tracker.untrack(pid);
            }
            agent.stop().await;
            return Ok((false, "no persisted record for session".to_string()));
        };

        {
            let mut agent = entry.agent.lock().await;
            if let Some(pid) = agent.pid() {
                self.subprocess_tracker.untrack(pid);
            }
            agent.stop().await;
            if let Some(id) = agent.session_id() {
                record.agent_session_id = Some(id.to_string());
            }
        }

        let (had_changes, commit_message) =
            commit_all(&record.workspace_path, record.name.as_str(), None).await?;
        debug!(had_changes, message = %commit_message, "commit_all before merge");

        let branch = record.branch_name();
        let (success, detail) =
            rebase_then_fast_forward(&record.project_path, &branch, &record.workspace_path).await?;

        if !success {
            warn!(session = %record.name, detail = %detail, "merge failed, restarting agent");
            let mut agent = self.agent_registry.build(&record.agent_name)?;
            let session_logs_dir = self.logs_dir.join(record.name.as_str());
            let stderr_log_path = session_logs_dir.join("agent.stderr.log");
            append_session_log(
                &session_logs_dir,
                self.clock.now(),
                &format!("merge failed ({detail}), restarting agent"),
            );
            agent
                .start(
                    &record.workspace_path,
                    record.agent_session_id.as_deref(),
                    Some(&stderr_log_path),
                )
                .await?;
            if let Some(pid) = agent.pid() {
                self.subprocess_tracker.track(pid);
            }

            let agent = Arc::new(tokio::sync::Mutex::new(agent));
            let raw_log_path = session_logs_dir.join("agent.raw.log");
            let ctx = ReaderContext {
                channel_id: channel_id.clone(),
                session_name: record.name.clone(),
                verbose: record.verbose,
                auto_approve_tools: Arc::clone(&self.auto_approve_tools),
            };
            let reader = self.spawn_reader(ctx, Arc::clone(&agent), raw_log_path);
            self.session_store.upsert(record)?;
            self.sessions
                .lock()
                .await
                .insert(channel_id.clone(), LiveSession { agent, reader: Some(reader) });
            return Ok((false, detail));
        }

        remove_worktree(&record.project_path, &record.workspace_path, &branch).await;
        self.session_store.remove(channel_id)?;

        if record.managed_channel {
            if let Some(control_plane) = &self.control_plane {
                if let Err(e) = control_plane.close_session_channel(channel_id).await {
                    warn!(channel = %channel_id, error = %e, "failed to close managed channel");
                }
            }
        }

        append_session_log(
            &self.logs_dir.join(record.name.as_str()),
            self.clock.now(),
            &format!("session completed and merged ({detail})"),
        );
        info!(session = %record.name, "session completed and merged");
        Ok((true, detail))
    }

    /// Cancel every reader, stop every agent, persist `state=suspended`.
    /// Workspaces are left intact for the next `recover_sessions`.
    pub async fn suspend_all_sessions(&self) -> Result<(), DaemonError> {
        let mut sessions = self.sessions.lock().await;
        let channel_ids: Vec<ChannelId> = sessions.keys().cloned().collect();
        for channel_id in channel_ids {
            let Some(mut entry) = sessions.remove(&channel_id) else {
                continue;
            };
            if let Some(reader) = entry.reader.take() {
                reader.abort();
            }
            for capability in &self.capabilities {
                capability.cleanup(&channel_id).await;
            }

            let mut agent = entry.agent.lock().await;
            if let Some(pid) = agent.pid() {
                self.subprocess_tracker.untrack(pid);
            }
            agent.stop().await;
            let agent_session_id = agent.session_id().map(str::to_string);
            drop(agent);

            if let Some(mut record) = self.session_store.get(&channel_id) {
                if let Some(id) = agent_session_id {
                    record.agent_session_id = Some(id);
                }
                record.state = SessionState::Suspended;
                self.session_store.upsert(record)?;
            }
        }
        info!("all sessions suspended");
        Ok(())
    }

    /// Reinstate every session that survived the last persisted snapshot.
    /// Skips (with a warning) a record whose workspace is gone, whose
    /// project is no longer registered, or that never captured an
    /// agent-internal session id.
    pub async fn recover_sessions(&self, project_store: &dyn ProjectStore) -> Result<(), DaemonError> {
        for record in self.session_store.list() {
            if !record.workspace_path.exists() {
                warn!(session = %record.name, "skipping recovery: workspace missing");
                continue;
            }
            if project_store.get(&record.project_name).is_none() {
                warn!(session = %record.name, "skipping recovery: project unregistered");
                continue;
            }
            let Some(agent_session_id) = record.agent_session_id.clone() else {
                warn!(session = %record.name, "skipping recovery: no agent session id captured");
                continue;
            };

            let mut agent = match self.agent_registry.build(&record.agent_name) {
                Ok(agent) => agent,
                Err(e) => {
                    warn!(session = %record.name, error = %e, "skipping recovery: unknown agent");
                    continue;
                }
            };

            let session_logs_dir = self.logs_dir.join(record.name.as_str());
            tokio::fs::create_dir_all(&session_logs_dir).await?;
            let stderr_log_path = session_logs_dir.join("agent.stderr.log");
            append_session_log(&session_logs_dir, self.clock.now(), "recovering session, resuming agent");
            if let Err(e) = agent
                .start(&record.workspace_path, Some(&agent_session_id), Some(&stderr_log_path))
                .await
            {
                warn!(session = %record.name, error = %e, "skipping recovery: agent resume failed");
                continue;
            }
            if let Some(pid) = agent.pid() {
                self.subprocess_tracker.track(pid);
            }

            let agent = Arc::new(tokio::sync::Mutex::new(agent));
            let raw_log_path = session_logs_dir.join("agent.raw.log");
            let ctx = ReaderContext {
                channel_id: record.channel_id.clone(),
                session_name: record.name.clone(),
                verbose: record.verbose,
                auto_approve_tools: Arc::clone(&self.auto_approve_tools),
            };
            let reader = self.spawn_reader(ctx, Arc::clone(&agent), raw_log_path);
            self.sessions
                .lock()
                .await
                .insert(record.channel_id.clone(), LiveSession { agent, reader: Some(reader) });

            let mut recovered = record.clone();
            recovered.state = SessionState::Idle;
            self.session_store.upsert(recovered)?;
            info!(session = %record.name, "session recovered");
        }
        Ok(())
    }

    /// Remove any `afk/`-branched worktree of a registered project that
    /// isn't the workspace of a currently-persisted session. MUST run
    /// after `recover_sessions` or it will reap workspaces being
    /// recovered.
    pub async fn cleanup_orphan_worktrees(&self, project_store: &dyn ProjectStore) -> Result<(), DaemonError> {
        let active: HashSet<PathBuf> = self
            .session_store
            .list()
            .into_iter()
            .map(|record| record.workspace_path)
            .collect();

        for project in project_store.list() {
            let entries = list_afk_worktrees(&project.path).await?;
            for entry in entries {
                if active.contains(&entry.path) {
                    continue;
                }
                info!(path = %entry.path.display(), branch = %entry.branch, "removing orphan worktree");
                remove_worktree(&project.path, &entry.path, &entry.branch).await;
            }
        }
        Ok(())
    }

    fn spawn_reader(
        &self,
        ctx: ReaderContext,
        agent: Arc<tokio::sync::Mutex<Box<dyn AgentPort>>>,
        raw_log_path: PathBuf,
    ) -> JoinHandle<()> {
        let event_bus = self.event_bus.clone();
        let session_store = Arc::clone(&self.session_store);
        let capabilities = self.capabilities.clone();
        tokio::spawn(read_loop(ctx, agent, event_bus, session_store, capabilities, raw_log_path))
    }
}

/// Append one timestamped line to a session's general activity log
/// (`session.log`), distinct from the raw agent-output and stderr logs
/// living alongside it.
fn append_session_log(session_logs_dir: &Path, now: DateTime<Utc>, message: &str) {
    let path = session_logs_dir.join("session.log");
    match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(mut file) => {
            let line = format!("{} {message}\n", now.to_rfc3339());
            if let Err(e) = file.write_all(line.as_bytes()) {
                warn!(path = %path.display(), error = %e, "failed to append session log");
            }
        }
        Err(e) => warn!(path = %path.display(), error = %e, "failed to open session log"),
    }
}

/// One session's read loop: consume raw agent output, log it, classify
/// it, publish the derived events, and keep the persisted record's state
/// in sync. Runs until the agent's stream ends or this task is aborted
/// by `stop_session`/`complete_session` — in the latter case nothing
/// below the cancelled `await` point runs, so no `AgentStopped` is
/// published for a deliberate shutdown.
async fn read_loop(
    ctx: ReaderContext,
    agent: Arc<tokio::sync::Mutex<Box<dyn AgentPort>>>,
    event_bus: EventBus,
    session_store: Arc<dyn SessionStore>,
    capabilities: Vec<Arc<dyn CapabilityHook>>,
    raw_log_path: PathBuf,
) {
    let mut raw_log = match OpenOptions::new().create(true).append(true).open(&raw_log_path) {
        Ok(file) => Some(file),
        Err(e) => {
            warn!(path = %raw_log_path.display(), error = %e, "failed to open raw agent log");
            None
        }
    };

    loop {
        let next = agent.lock().await.next_response().await;
        let Some(raw) = next else {
            break;
        };

        if let Some(file) = raw_log.as_mut() {
            if let Ok(mut line) = serde_json::to_string(&raw) {
                line.push('\n');
                if let Err(e) = file.write_all(line.as_bytes()) {
                    warn!(path = %raw_log_path.display(), error = %e, "failed to append raw agent log");
                }
            }
        }

        let decoded = raw_event::decode(&raw);
        let classify_ctx = ClassifyContext {
            channel_id: &ctx.channel_id,
            session_name: &ctx.session_name,
            verbose: ctx.verbose,
            auto_approve_tools: &ctx.auto_approve_tools,
        };
        let outcome = classify(decoded, &classify_ctx);

        if let Some(request_id) = outcome.auto_approve_request_id {
            let mut agent = agent.lock().await;
            if let Err(e) = agent.send_permission_response(&request_id, true).await {
                warn!(request_id, error = %e, "auto-approval failed");
            }
            continue;
        }

        for event in outcome.events {
            publish_event(&event_bus, event);
        }

        if outcome.new_state.is_some() || outcome.captured_agent_session_id.is_some() {
            if let Some(mut record) = session_store.get(&ctx.channel_id) {
                if let Some(id) = outcome.captured_agent_session_id {
                    record.agent_session_id = Some(id);
                }
                if let Some(state) = outcome.new_state {
                    record.state = state;
                }
                if let Err(e) = session_store.upsert(record) {
                    warn!(channel = %ctx.channel_id, error = %e, "failed to persist session state transition");
                }
            }
        }
    }

    warn!(channel = %ctx.channel_id, "agent stream ended unexpectedly");
    if let Some(mut record) = session_store.get(&ctx.channel_id) {
        record.state = SessionState::Stopped;
        if let Err(e) = session_store.upsert(record) {
            warn!(channel = %ctx.channel_id, error = %e, "failed to persist stopped state");
        }
    }
    for capability in &capabilities {
        capability.cleanup(&ctx.channel_id).await;
    }
    event_bus.publish(AgentStopped::new(ctx.channel_id.clone(), ctx.session_name.clone()));
}

/// Dispatch a sum-typed [`Event`] to its concrete variant's subscribers —
/// the bus itself only ever deals in one concrete type per subscription.
fn publish_event(bus: &EventBus, event: Event) {
    match event {
        Event::AgentSystem(e) => bus.publish(e),
        Event::AgentAssistant(e) => bus.publish(e),
        Event::AgentPermissionRequest(e) => bus.publish(e),
        Event::AgentResult(e) => bus.publish(e),
        Event::AgentInputRequest(e) => bus.publish(e),
        Event::AgentStopped(e) => bus.publish(e),
        Event::FileReady(e) => bus.publish(e),
        Event::SessionCreated(e) => bus.publish(e),
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
