// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Command Facade: the single entry point every control plane calls.
//! Composes the Session Manager with the project/message/template stores
//! and any attached capabilities, and returns plain DTOs instead of
//! internal types.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use truant_core::{Clock, Project, ProjectError, SessionId, SessionRecord, SessionState, SystemClock, Template};
use truant_core::{ChannelId, Message, MessageRole};
use truant_storage::{MessageStore, ProjectStore, TemplateStore};
use truant_workspace::init_repo;

use crate::error::DaemonError;
use crate::session::manager::SessionManager;

/// A dev-server tunnel, attached as a capability when the operator wants
/// a preview URL for a session's running app. Out of this repo's scope
/// to implement concretely; this is the narrow seam a plug-in fills.
#[async_trait]
pub trait TunnelCapability: Send + Sync {
    async fn start(&self, channel_id: &ChannelId) -> Result<String, DaemonError>;
    async fn stop(&self, channel_id: &ChannelId) -> Result<(), DaemonError>;
    fn get_info(&self, channel_id: &ChannelId) -> Option<String>;
}

/// Speech-to-text transcription, attached as a capability when the
/// operator sends voice messages. Out of this repo's scope to implement
/// concretely.
#[async_trait]
pub trait SpeechToTextCapability: Send + Sync {
    async fn transcribe(&self, audio_path: &std::path::Path) -> Result<String, DaemonError>;
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectInfo {
    pub name: String,
    pub path: PathBuf,
    pub created_at: DateTime<Utc>,
}

impl From<Project> for ProjectInfo {
    fn from(project: Project) -> Self {
        Self {
            name: project.name,
            path: project.path,
            created_at: project.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub channel_id: ChannelId,
    pub name: SessionId,
    pub project_name: String,
    pub state: SessionState,
    pub created_at: DateTime<Utc>,
}

impl From<SessionRecord> for SessionInfo {
    fn from(record: SessionRecord) -> Self {
        Self {
            channel_id: record.channel_id,
            name: record.name,
            project_name: record.project_name,
            state: record.state,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub channel_id: ChannelId,
    pub name: SessionId,
    pub project_name: String,
    pub state: SessionState,
    pub workspace_path: PathBuf,
    pub agent_session_id: Option<String>,
    pub tunnel_url: Option<String>,
}

pub struct CommandFacade<C: Clock = SystemClock> {
    session_manager: Arc<SessionManager<C>>,
    project_store: Arc<dyn ProjectStore>,
    message_store: Arc<dyn MessageStore>,
    template_store: Arc<TemplateStore>,
    clock: C,
    base_path: Option<PathBuf>,
    tunnel: Option<Arc<dyn TunnelCapability>>,
    speech_to_text: Option<Arc<dyn SpeechToTextCapability>>,
}

impl<C: Clock> CommandFacade<C> {
    pub fn new(
        session_manager: Arc<SessionManager<C>>,
        project_store: Arc<dyn ProjectStore>,
        message_store: Arc<dyn MessageStore>,
        template_store: Arc<TemplateStore>,
        clock: C,
        base_path: Option<PathBuf>,
        tunnel: Option<Arc<dyn TunnelCapability>>,
        speech_to_text: Option<Arc<dyn SpeechToTextCapability>>,
    ) -> Self {
        Self {
            session_manager,
            project_store,
            message_store,
            template_store,
            clock,
            base_path,
            tunnel,
            speech_to_text,
        }
    }

    pub fn add_project(&self, name: &str, path: PathBuf) -> Result<(bool, String), DaemonError> {
        if !path.is_dir() {
            return Err(DaemonError::from(ProjectError::InvalidPath(path)));
        }
        let project = Project::new(name, path, self.clock.now());
        let already_registered = self.project_store.get(&project.name).is_some();
        self.project_store.insert(project)?;
        if already_registered {
            Ok((true, "project re-registered".to_string()))
        } else {
            Ok((true, "project registered".to_string()))
        }
    }

    pub fn list_projects(&self) -> Vec<ProjectInfo> {
        self.project_store.list().into_iter().map(ProjectInfo::from).collect()
    }

    pub fn remove_project(&self, name: &str) -> Result<(bool, String), DaemonError> {
        let normalized = truant_core::project::normalize_name(name);
        match self.project_store.remove(&normalized)? {
            Some(_) => Ok((true, "project removed".to_string())),
            None => Ok((false, "no such project".to_string())),
        }
    }

    /// Creates and/or registers `<base_path>/<name>`, initializing a VCS
    /// repository in it if one doesn't already exist there.
    pub async fn init_project(&self, name: &str) -> Result<(bool, String), DaemonError> {
        let base_path = self
            .base_path
            .clone()
            .ok_or_else(|| DaemonError::Configuration("no base path configured for init_project".to_string()))?;
        let normalized = truant_core::project::normalize_name(name);
        let path = base_path.join(&normalized);
        tokio::fs::create_dir_all(&path).await?;
        init_repo(&path).await?;
        let project = Project::new(name, path, self.clock.now());
        self.project_store.insert(project)?;
        Ok((true, "project initialized".to_string()))
    }

    pub async fn new_session(
        &self,
        project_name: &str,
        verbose: bool,
        channel_id: Option<ChannelId>,
        agent: Option<&str>,
        template: Option<&str>,
    ) -> Result<SessionInfo, DaemonError> {
        let normalized = truant_core::project::normalize_name(project_name);
        let project = self
            .project_store
            .get(&normalized)
            .ok_or_else(|| DaemonError::Unregistered(project_name.to_string()))?;

        let loaded_template = match template {
            Some(name) => Some(
                self.template_store
                    .get(name)
                    .ok_or_else(|| DaemonError::TemplateUnknown(name.to_string()))?,
            ),
            None => None,
        };

        let record = self
            .session_manager
            .create_session(&project, channel_id, agent, loaded_template, verbose)
            .await?;
        Ok(SessionInfo::from(record))
    }

    pub async fn send_message(&self, channel_id: &ChannelId, text: &str) -> Result<bool, DaemonError> {
        let sent = self.session_manager.send_message(channel_id, text).await?;
        if sent {
            let message = Message::new(MessageRole::User, text, self.clock.now());
            if let Err(e) = self.message_store.append(channel_id, message) {
                tracing::warn!(channel = %channel_id, error = %e, "failed to log outgoing message");
            }
        }
        Ok(sent)
    }

    /// Only succeeds if a speech-to-text capability is attached.
    pub async fn send_voice(
        &self,
        channel_id: &ChannelId,
        audio_path: &std::path::Path,
    ) -> Result<(bool, String), DaemonError> {
        let Some(stt) = &self.speech_to_text else {
            return Ok((false, String::new()));
        };
        let transcript = stt.transcribe(audio_path).await?;
        let sent = self.send_message(channel_id, &transcript).await?;
        Ok((sent, transcript))
    }

    /// Reattach every persisted session's agent before a command that
    /// needs one live (send/stop/complete/permission). A control plane
    /// that keeps its own process running across commands only needs to
    /// call this once, at startup.
    pub async fn recover_sessions(&self) -> Result<(), DaemonError> {
        self.session_manager.recover_sessions(self.project_store.as_ref()).await
    }

    /// Detach every live agent, persisting its resumable session id.
    /// Pairs with `recover_sessions` around a short-lived command.
    pub async fn suspend_all_sessions(&self) -> Result<(), DaemonError> {
        self.session_manager.suspend_all_sessions().await
    }

    /// Remove worktrees left behind by a crash that predates the most
    /// recent `recover_sessions` call.
    pub async fn cleanup_orphan_worktrees(&self) -> Result<(), DaemonError> {
        self.session_manager
            .cleanup_orphan_worktrees(self.project_store.as_ref())
            .await
    }

    pub fn list_templates(&self) -> Vec<Template> {
        self.template_store
            .list()
            .into_iter()
            .map(|loaded| loaded.config.clone())
            .collect()
    }

    pub fn list_sessions(&self) -> Vec<SessionInfo> {
        self.session_manager
            .list_records()
            .into_iter()
            .map(SessionInfo::from)
            .collect()
    }

    pub async fn stop_session(&self, channel_id: &ChannelId) -> Result<bool, DaemonError> {
        self.session_manager.stop_session(channel_id).await
    }

    pub async fn complete_session(&self, channel_id: &ChannelId) -> Result<(bool, String), DaemonError> {
        self.session_manager.complete_session(channel_id).await
    }

    pub fn get_status(&self, channel_id: &ChannelId) -> Result<SessionStatus, DaemonError> {
        let record = self
            .session_manager
            .get_record(channel_id)
            .ok_or_else(|| DaemonError::SessionNotFound(channel_id.to_string()))?;
        let tunnel_url = self.tunnel.as_ref().and_then(|t| t.get_info(channel_id));
        Ok(SessionStatus {
            channel_id: record.channel_id,
            name: record.name,
            project_name: record.project_name,
            state: record.state,
            workspace_path: record.workspace_path,
            agent_session_id: record.agent_session_id,
            tunnel_url,
        })
    }

    pub async fn permission_response(
        &self,
        channel_id: &ChannelId,
        request_id: &str,
        allowed: bool,
    ) -> Result<bool, DaemonError> {
        self.session_manager
            .permission_response(channel_id, request_id, allowed)
            .await
    }

    pub async fn start_tunnel(&self, channel_id: &ChannelId) -> Result<String, DaemonError> {
        let Some(tunnel) = &self.tunnel else {
            return Err(DaemonError::from(crate::error::ControlPlaneError::NotSupported(
                "start_tunnel",
            )));
        };
        tunnel.start(channel_id).await
    }

    pub async fn stop_tunnel(&self, channel_id: &ChannelId) -> Result<(), DaemonError> {
        let Some(tunnel) = &self.tunnel else {
            return Err(DaemonError::from(crate::error::ControlPlaneError::NotSupported(
                "stop_tunnel",
            )));
        };
        tunnel.stop(channel_id).await
    }

    pub fn get_tunnel_info(&self, channel_id: &ChannelId) -> Option<String> {
        self.tunnel.as_ref().and_then(|t| t.get_info(channel_id))
    }
}

#[cfg(test)]
#[path = "facade_tests.rs"]
mod tests;
