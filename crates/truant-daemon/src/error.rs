// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("project not a VCS repository: {}", .0.display())]
    NotAVCSRepo(PathBuf),
    #[error("unregistered project: {0}")]
    Unregistered(String),
    #[error("unknown template: {0}")]
    TemplateUnknown(String),
    #[error("unknown agent: {0}")]
    UnknownAgent(String),
    #[error("no session for channel {0}")]
    SessionNotFound(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("workspace error: {0}")]
    Workspace(#[from] truant_workspace::WorkspaceError),
    #[error("agent error: {0}")]
    Agent(#[from] truant_agent::AgentError),
    #[error("storage error: {0}")]
    Storage(#[from] truant_storage::StorageError),
    #[error("project error: {0}")]
    Project(#[from] truant_core::ProjectError),
    #[error("control plane error: {0}")]
    ControlPlane(#[from] ControlPlaneError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the external control-plane implementation. Never fatal to
/// the core; callers log and continue per the error-handling policy for
/// `TransientTransportError`.
#[derive(Debug, Error)]
pub enum ControlPlaneError {
    #[error("control plane operation not supported: {0}")]
    NotSupported(&'static str),
    #[error("control plane transport error: {0}")]
    Transport(String),
}
