// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A control plane that renders to the invoking terminal instead of a
//! chat transport. Every session gets a channel id equal to its own
//! name, so there is nothing to persist beyond what `SessionRecord`
//! already tracks.

use async_trait::async_trait;
use serde_json::Value;
use truant_core::ChannelId;
use truant_daemon::{ControlPlaneError, ControlPlanePort};

#[derive(Default)]
pub struct ConsoleControlPlane;

#[async_trait]
impl ControlPlanePort for ConsoleControlPlane {
    async fn send_message(
        &self,
        channel_id: &ChannelId,
        text: &str,
        silent: bool,
    ) -> Result<String, ControlPlaneError> {
        if !silent {
            println!("[{channel_id}] {text}");
        }
        Ok(format!("console-{channel_id}"))
    }

    async fn edit_message(
        &self,
        channel_id: &ChannelId,
        _message_id: &str,
        text: &str,
    ) -> Result<(), ControlPlaneError> {
        println!("[{channel_id}] (edited) {text}");
        Ok(())
    }

    async fn send_permission_request(
        &self,
        channel_id: &ChannelId,
        tool_name: &str,
        tool_input: &Value,
        request_id: &str,
    ) -> Result<(), ControlPlaneError> {
        println!(
            "[{channel_id}] permission requested ({request_id}): {tool_name} {tool_input}\n  approve with: truant permission {channel_id} {request_id} allow"
        );
        Ok(())
    }

    async fn create_session_channel(&self, name: &str) -> Result<ChannelId, ControlPlaneError> {
        Ok(ChannelId::new(name))
    }

    async fn close_session_channel(&self, channel_id: &ChannelId) -> Result<(), ControlPlaneError> {
        println!("[{channel_id}] channel closed");
        Ok(())
    }

    fn get_channel_link(&self, _channel_id: &ChannelId) -> Option<String> {
        None
    }

    async fn start(&self) -> Result<(), ControlPlaneError> {
        Ok(())
    }

    async fn stop(&self) -> Result<(), ControlPlaneError> {
        Ok(())
    }
}
