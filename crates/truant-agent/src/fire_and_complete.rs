// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::scrub::scrub_nested_execution_env;
use crate::{AgentError, AgentPort, RawAgentEvent};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::warn;

/// A new child process per turn, funneled through an internal queue that
/// outlives any one child so the external interface still looks like a
/// continuous event stream. The first turn starts a resumable thread;
/// later turns pass `resume_flag` to continue it.
pub struct FireAndCompleteAgent {
    command: String,
    base_args: Vec<String>,
    resume_flag: &'static str,
    working_dir: Option<PathBuf>,
    stderr_log_path: Option<PathBuf>,
    session_id: Option<String>,
    alive: bool,
    turn_started: bool,
    events_tx: mpsc::Sender<RawAgentEvent>,
    events_rx: mpsc::Receiver<RawAgentEvent>,
    /// PID of the in-flight turn's child, if one is currently running.
    /// Shared with the detached task driving that child so `stop()` can
    /// still reach it after the turn that spawned it has returned.
    current_pid: Arc<Mutex<Option<u32>>>,
}

impl FireAndCompleteAgent {
    pub fn new(command: impl Into<String>, base_args: Vec<String>, resume_flag: &'static str) -> Self {
        let (events_tx, events_rx) = mpsc::channel(256);
        Self {
            command: command.into(),
            base_args,
            resume_flag,
            working_dir: None,
            stderr_log_path: None,
            session_id: None,
            alive: false,
            turn_started: false,
            events_tx,
            events_rx,
            current_pid: Arc::new(Mutex::new(None)),
        }
    }
}

#[async_trait]
impl AgentPort for FireAndCompleteAgent {
    fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    fn is_alive(&self) -> bool {
        self.alive
    }

    async fn start(
        &mut self,
        working_dir: &Path,
        session_id: Option<&str>,
        stderr_log_path: Option<&Path>,
    ) -> Result<(), AgentError> {
        self.working_dir = Some(working_dir.to_path_buf());
        self.stderr_log_path = stderr_log_path.map(Path::to_path_buf);
        self.session_id = session_id.map(str::to_string);
        self.turn_started = session_id.is_some();
        self.alive = true;
        Ok(())
    }

    async fn send_message(&mut self, text: &str) -> Result<(), AgentError> {
        if !self.alive {
            return Err(AgentError::NotAlive);
        }
        let working_dir = self
            .working_dir
            .clone()
            .ok_or(AgentError::NotAlive)?;

        let mut cmd = Command::new(&self.command);
        cmd.args(&self.base_args).arg(text).current_dir(&working_dir);
        scrub_nested_execution_env(&mut cmd);
        if self.turn_started {
            if let Some(id) = &self.session_id {
                cmd.arg(self.resume_flag).arg(id);
            } else {
                cmd.arg(self.resume_flag).arg("--last");
            }
        }

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(if self.stderr_log_path.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            });

        let mut child = cmd
            .spawn()
            .map_err(|e| AgentError::SpawnFailed(e.to_string()))?;
        self.turn_started = true;
        let spawned_pid = child.id();
        *self.current_pid.lock() = spawned_pid;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AgentError::SpawnFailed("child has no stdout handle".to_string()))?;
        let stderr_log_path = self.stderr_log_path.clone();
        let stderr = child.stderr.take();
        let events_tx = self.events_tx.clone();
        let current_pid = Arc::clone(&self.current_pid);

        tokio::spawn(async move {
            if let (Some(stderr), Some(log_path)) = (stderr, stderr_log_path) {
                forward_stderr(stderr, log_path);
            }

            let mut lines = BufReader::new(stdout).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) if !line.trim().is_empty() => {
                        match serde_json::from_str::<RawAgentEvent>(&line) {
                            Ok(value) => {
                                if events_tx.send(value).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => warn!(error = %e, "dropping unparseable agent line"),
                        }
                    }
                    Ok(Some(_)) => continue,
                    Ok(None) => break,
                    Err(e) => {
                        warn!(error = %e, "error reading agent stdout");
                        break;
                    }
                }
            }
            let _ = child.wait().await;
            let mut guard = current_pid.lock();
            if *guard == spawned_pid {
                *guard = None;
            }
        });

        Ok(())
    }

    async fn send_permission_response(
        &mut self,
        _request_id: &str,
        _allowed: bool,
    ) -> Result<(), AgentError> {
        // Each turn is a one-shot child; there is no live process to
        // acknowledge a permission prompt against. A real transport
        // would fold the decision into the next turn's arguments.
        Err(AgentError::SendFailed(
            "fire-and-complete agents do not support out-of-band permission responses".to_string(),
        ))
    }

    async fn next_response(&mut self) -> Option<RawAgentEvent> {
        self.events_rx.recv().await
    }

    async fn stop(&mut self) {
        self.alive = false;
        self.events_rx.close();

        let Some(pid) = self.current_pid.lock().take() else {
            return;
        };

        let _ = Command::new("kill")
            .args(["-15", &pid.to_string()])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while tokio::time::Instant::now() < deadline {
            let alive = Command::new("kill")
                .args(["-0", &pid.to_string()])
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .await
                .map(|s| s.success())
                .unwrap_or(false);
            if !alive {
                return;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        let _ = Command::new("kill")
            .args(["-9", &pid.to_string()])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
    }

    fn pid(&self) -> Option<u32> {
        *self.current_pid.lock()
    }
}

fn forward_stderr(stderr: tokio::process::ChildStderr, log_path: PathBuf) {
    tokio::spawn(async move {
        use tokio::io::AsyncWriteExt;
        let mut lines = BufReader::new(stderr).lines();
        let mut file = match tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .await
        {
            Ok(file) => file,
            Err(e) => {
                warn!(path = %log_path.display(), error = %e, "failed to open stderr log");
                return;
            }
        };
        while let Ok(Some(line)) = lines.next_line().await {
            let mut buf = line;
            buf.push('\n');
            if file.write_all(buf.as_bytes()).await.is_err() {
                break;
            }
        }
    });
}

#[cfg(test)]
#[path = "fire_and_complete_tests.rs"]
mod tests;
