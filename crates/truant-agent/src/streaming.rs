// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::scrub::scrub_nested_execution_env;
use crate::{AgentError, AgentPort, RawAgentEvent};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tracing::warn;

/// A persistent child process speaking line-delimited JSON on its stdin
/// and stdout: `{"type":"user","message":{...}}` in, `{"type":"system"
/// |"assistant"|...}` out. The child survives across turns; only
/// `stop()` tears it down.
pub struct StreamingStdioAgent {
    command: String,
    args: Vec<String>,
    resume_flag: &'static str,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stdout: Option<tokio::io::Lines<BufReader<tokio::process::ChildStdout>>>,
    session_id: Option<String>,
    alive: bool,
}

impl StreamingStdioAgent {
    /// `command` is the agent binary; `resume_flag` is the CLI flag this
    /// binary uses to resume a prior conversation (e.g. `--resume`).
    pub fn new(command: impl Into<String>, args: Vec<String>, resume_flag: &'static str) -> Self {
        Self {
            command: command.into(),
            args,
            resume_flag,
            child: None,
            stdin: None,
            stdout: None,
            session_id: None,
            alive: false,
        }
    }

    async fn write_line(&mut self, value: serde_json::Value) -> Result<(), AgentError> {
        let stdin = self.stdin.as_mut().ok_or(AgentError::NotAlive)?;
        let mut line = serde_json::to_string(&value)?;
        line.push('\n');
        stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| AgentError::SendFailed(e.to_string()))?;
        stdin
            .flush()
            .await
            .map_err(|e| AgentError::SendFailed(e.to_string()))
    }
}

#[async_trait]
impl AgentPort for StreamingStdioAgent {
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
        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args).current_dir(working_dir);
        scrub_nested_execution_env(&mut cmd);

        if let Some(id) = session_id {
            cmd.arg(self.resume_flag).arg(id);
        }

        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(if stderr_log_path.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            });

        let mut child = cmd
            .spawn()
            .map_err(|e| AgentError::SpawnFailed(e.to_string()))?;

        let stdin = child.stdin.take().ok_or_else(|| {
            AgentError::SpawnFailed("child has no stdin handle".to_string())
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            AgentError::SpawnFailed("child has no stdout handle".to_string())
        })?;

        if let (Some(path), Some(stderr)) = (stderr_log_path, child.stderr.take()) {
            spawn_stderr_logger(stderr, path.to_path_buf());
        }

        self.stdin = Some(stdin);
        self.stdout = Some(BufReader::new(stdout).lines());
        self.session_id = session_id.map(str::to_string);
        self.child = Some(child);
        self.alive = true;
        Ok(())
    }

    async fn send_message(&mut self, text: &str) -> Result<(), AgentError> {
        if !self.alive {
            return Err(AgentError::NotAlive);
        }
        self.write_line(serde_json::json!({
            "type": "user",
            "message": {
                "role": "user",
                "content": [{"type": "text", "text": text}],
            },
        }))
        .await
    }

    async fn send_permission_response(
        &mut self,
        request_id: &str,
        allowed: bool,
    ) -> Result<(), AgentError> {
        if !self.alive {
            return Err(AgentError::NotAlive);
        }
        self.write_line(serde_json::json!({
            "type": "permission_response",
            "request_id": request_id,
            "allowed": allowed,
        }))
        .await
    }

    async fn next_response(&mut self) -> Option<RawAgentEvent> {
        let stdout = self.stdout.as_mut()?;
        loop {
            match stdout.next_line().await {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str(&line) {
                        Ok(value) => return Some(value),
                        Err(e) => {
                            warn!(error = %e, "dropping unparseable agent line");
                            continue;
                        }
                    }
                }
                Ok(None) => {
                    self.alive = false;
                    return None;
                }
                Err(e) => {
                    warn!(error = %e, "error reading agent stdout");
                    self.alive = false;
                    return None;
                }
            }
        }
    }

    async fn stop(&mut self) {
        self.alive = false;
        self.stdin = None;

        let Some(mut child) = self.child.take() else {
            return;
        };
        let Some(pid) = child.id() else {
            return;
        };

        let _ = Command::new("kill")
            .args(["-15", &pid.to_string()])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        let waited = tokio::time::timeout(Duration::from_secs(5), child.wait()).await;
        if waited.is_err() {
            let _ = child.start_kill();
            let _ = child.wait().await;
        }
    }

    fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }
}

fn spawn_stderr_logger(stderr: tokio::process::ChildStderr, log_path: PathBuf) {
    tokio::spawn(async move {
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
            if let Err(e) = file.write_all(buf.as_bytes()).await {
                warn!(path = %log_path.display(), error = %e, "failed to append stderr log");
                break;
            }
        }
    });
}

#[cfg(test)]
#[path = "streaming_tests.rs"]
mod tests;
