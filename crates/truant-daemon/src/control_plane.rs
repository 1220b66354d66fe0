// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The contract every concrete chat/HTTP/CLI transport implements. No
//! transport lives in this crate — rendering, command parsing, and the
//! bot/HTTP plumbing are capability plug-ins outside this repo's scope.

use crate::error::ControlPlaneError;
use async_trait::async_trait;
use serde_json::Value;
use truant_core::ChannelId;

#[async_trait]
pub trait ControlPlanePort: Send + Sync {
    /// Send a message to a channel, returning an opaque message id the
    /// caller can later pass to `edit_message`.
    async fn send_message(
        &self,
        channel_id: &ChannelId,
        text: &str,
        silent: bool,
    ) -> Result<String, ControlPlaneError>;

    async fn edit_message(
        &self,
        channel_id: &ChannelId,
        message_id: &str,
        text: &str,
    ) -> Result<(), ControlPlaneError>;

    async fn send_permission_request(
        &self,
        channel_id: &ChannelId,
        tool_name: &str,
        tool_input: &Value,
        request_id: &str,
    ) -> Result<(), ControlPlaneError>;

    /// Create a fresh channel for a new session, returning its id.
    async fn create_session_channel(&self, name: &str) -> Result<ChannelId, ControlPlaneError>;

    /// Close a channel previously created by `create_session_channel`.
    /// Best-effort from the caller's perspective: failures are logged, not
    /// propagated into session lifecycle decisions.
    async fn close_session_channel(&self, channel_id: &ChannelId) -> Result<(), ControlPlaneError>;

    /// A human-followable URL for the channel, if the transport has one.
    fn get_channel_link(&self, channel_id: &ChannelId) -> Option<String>;

    async fn start(&self) -> Result<(), ControlPlaneError>;
    async fn stop(&self) -> Result<(), ControlPlaneError>;

    async fn send_photo(&self, _channel_id: &ChannelId, _path: &std::path::Path) -> Result<(), ControlPlaneError> {
        Err(ControlPlaneError::NotSupported("send_photo"))
    }

    async fn send_document(&self, _channel_id: &ChannelId, _path: &std::path::Path) -> Result<(), ControlPlaneError> {
        Err(ControlPlaneError::NotSupported("send_document"))
    }

    async fn download_voice(&self, _channel_id: &ChannelId, _message_id: &str) -> Result<std::path::PathBuf, ControlPlaneError> {
        Err(ControlPlaneError::NotSupported("download_voice"))
    }
}
