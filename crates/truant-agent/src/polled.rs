// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::{AgentError, AgentPort, RawAgentEvent};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::warn;

/// Per-million-token billing rates and poll cadence for a polled-remote
/// transport. The original hard-coded these; here they're configuration
/// so a different remote service can be plugged in without a rebuild.
#[derive(Debug, Clone, Copy)]
pub struct PolledRemoteConfig {
    pub poll_interval: Duration,
    pub input_cost_per_million: f64,
    pub output_cost_per_million: f64,
}

impl Default for PolledRemoteConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            input_cost_per_million: 3.0,
            output_cost_per_million: 15.0,
        }
    }
}

/// Token usage reported by a remote request, if the backend provides it.
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoteUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl RemoteUsage {
    fn cost_usd(&self, config: &PolledRemoteConfig) -> f64 {
        let input = self.input_tokens as f64 / 1_000_000.0 * config.input_cost_per_million;
        let output = self.output_tokens as f64 / 1_000_000.0 * config.output_cost_per_million;
        input + output
    }
}

/// Terminal or in-progress state of a submitted remote request.
#[derive(Debug, Clone)]
pub enum RemoteStatus {
    InProgress {
        progress_text: Option<String>,
    },
    Done {
        text: String,
        usage: Option<RemoteUsage>,
        file_output: Option<String>,
    },
    Failed(String),
}

/// The narrow contract a remote backend needs to satisfy to be driven
/// by [`PolledRemoteAgent`]. The concrete HTTP/gRPC/etc. client is
/// outside this repo's scope; this is the seam it plugs into.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    async fn submit(&self, prompt: &str, resume_id: Option<&str>) -> Result<String, AgentError>;
    async fn poll(&self, request_id: &str) -> Result<RemoteStatus, AgentError>;
}

/// Submits a background request and polls it to completion, presenting
/// the same event-stream interface as the other transports by emitting
/// synthetic `assistant` events for progress and a final `assistant` +
/// `result` pair.
pub struct PolledRemoteAgent<C> {
    client: Arc<C>,
    config: PolledRemoteConfig,
    session_id: Option<String>,
    alive: bool,
    events_tx: mpsc::Sender<RawAgentEvent>,
    events_rx: mpsc::Receiver<RawAgentEvent>,
    poll_task: Option<tokio::task::JoinHandle<()>>,
}

impl<C: RemoteClient + 'static> PolledRemoteAgent<C> {
    pub fn new(client: C, config: PolledRemoteConfig) -> Self {
        let (events_tx, events_rx) = mpsc::channel(256);
        Self {
            client: Arc::new(client),
            config,
            session_id: None,
            alive: false,
            events_tx,
            events_rx,
            poll_task: None,
        }
    }
}

#[async_trait]
impl<C: RemoteClient + 'static> AgentPort for PolledRemoteAgent<C> {
    fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    fn is_alive(&self) -> bool {
        self.alive
    }

    async fn start(
        &mut self,
        _working_dir: &Path,
        session_id: Option<&str>,
        _stderr_log_path: Option<&Path>,
    ) -> Result<(), AgentError> {
        self.session_id = session_id.map(str::to_string);
        self.alive = true;
        Ok(())
    }

    async fn send_message(&mut self, text: &str) -> Result<(), AgentError> {
        if !self.alive {
            return Err(AgentError::NotAlive);
        }

        let request_id = self.client.submit(text, self.session_id.as_deref()).await?;
        self.session_id = Some(request_id.clone());

        if let Some(task) = self.poll_task.take() {
            task.abort();
        }
        self.poll_task = Some(tokio::spawn(poll_until_done(
            Arc::clone(&self.client),
            request_id,
            self.events_tx.clone(),
            self.config,
        )));
        Ok(())
    }

    async fn send_permission_response(
        &mut self,
        _request_id: &str,
        _allowed: bool,
    ) -> Result<(), AgentError> {
        Err(AgentError::SendFailed(
            "polled-remote agents have no interactive permission prompts".to_string(),
        ))
    }

    async fn next_response(&mut self) -> Option<RawAgentEvent> {
        self.events_rx.recv().await
    }

    async fn stop(&mut self) {
        self.alive = false;
        if let Some(task) = self.poll_task.take() {
            task.abort();
        }
        self.events_rx.close();
    }
}

async fn poll_until_done<C: RemoteClient>(
    client: Arc<C>,
    request_id: String,
    events_tx: mpsc::Sender<RawAgentEvent>,
    config: PolledRemoteConfig,
) {
    loop {
        let status = match client.poll(&request_id).await {
            Ok(status) => status,
            Err(e) => {
                warn!(request_id, error = %e, "polled-remote status check failed");
                let _ = events_tx
                    .send(serde_json::json!({"type": "system", "error": e.to_string()}))
                    .await;
                return;
            }
        };

        match status {
            RemoteStatus::InProgress { progress_text } => {
                if let Some(text) = progress_text {
                    let _ = events_tx
                        .send(serde_json::json!({
                            "type": "assistant",
                            "content": [{"type": "text", "text": text}],
                            "progress": true,
                        }))
                        .await;
                }
                sleep(config.poll_interval).await;
            }
            RemoteStatus::Done {
                text,
                usage,
                file_output,
            } => {
                let _ = events_tx
                    .send(serde_json::json!({
                        "type": "assistant",
                        "content": [{"type": "text", "text": text}],
                    }))
                    .await;
                if let Some(path) = file_output {
                    let _ = events_tx
                        .send(serde_json::json!({"type": "file_output", "path": path}))
                        .await;
                }
                let cost_usd = usage.map(|u| u.cost_usd(&config)).unwrap_or(0.0);
                let _ = events_tx
                    .send(serde_json::json!({
                        "type": "result",
                        "total_cost_usd": cost_usd,
                    }))
                    .await;
                return;
            }
            RemoteStatus::Failed(detail) => {
                let _ = events_tx
                    .send(serde_json::json!({"type": "system", "error": detail}))
                    .await;
                return;
            }
        }
    }
}

#[cfg(test)]
#[path = "polled_tests.rs"]
mod tests;
