// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide tracking of long-lived child PIDs (tunnels, anything that
//! outlives the subprocess that spawned it from this daemon's point of
//! view) so a crash doesn't leave them running forever.
//!
//! Deliberately not a global: callers receive a `SubprocessTracker` as a
//! dependency and decide when to install the exit hook and when to run
//! `cleanup_stale_pids` at startup.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::PathBuf;
use std::process::Command;
use tracing::{debug, info, warn};

pub struct SubprocessTracker {
    pid_file: Mutex<Option<PathBuf>>,
    pids: Mutex<HashSet<u32>>,
}

impl Default for SubprocessTracker {
    fn default() -> Self {
        Self {
            pid_file: Mutex::new(None),
            pids: Mutex::new(HashSet::new()),
        }
    }
}

impl SubprocessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the path tracked PIDs are persisted to. Call once at startup.
    pub fn set_pid_file(&self, path: PathBuf) {
        *self.pid_file.lock() = Some(path);
    }

    pub fn track(&self, pid: u32) {
        self.pids.lock().insert(pid);
        self.persist();
    }

    pub fn untrack(&self, pid: u32) {
        self.pids.lock().remove(&pid);
        self.persist();
    }

    /// Send SIGTERM to every currently-tracked PID. Intended for the
    /// process exit hook; also usable directly from a shutdown routine.
    pub fn kill_all(&self) {
        let pids: Vec<u32> = self.pids.lock().drain().collect();
        for pid in pids {
            if send_sigterm(pid) {
                debug!(pid, "sent SIGTERM to tracked subprocess");
            }
        }
        self.persist();
    }

    /// Read the PID file left by a previous (crashed) instance, SIGTERM
    /// every PID found there, then delete the file. Errors for already-dead
    /// PIDs are ignored; this never fails.
    pub fn cleanup_stale_pids(&self) {
        let Some(path) = self.pid_file.lock().clone() else {
            return;
        };
        let Ok(contents) = std::fs::read_to_string(&path) else {
            return;
        };

        let mut killed = 0;
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Ok(pid) = line.parse::<u32>() {
                if send_sigterm(pid) {
                    killed += 1;
                }
            }
        }
        if killed > 0 {
            info!(count = killed, "cleaned up stale subprocess(es)");
        }
        if let Err(e) = std::fs::remove_file(&path) {
            warn!(path = %path.display(), error = %e, "failed to remove stale pid file");
        }
    }

    fn persist(&self) {
        let Some(path) = self.pid_file.lock().clone() else {
            return;
        };
        let pids = self.pids.lock();
        let body = pids
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join("\n");
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!(error = %e, "failed to create pid file directory");
                return;
            }
        }
        if let Err(e) = std::fs::write(&path, if body.is_empty() { body } else { format!("{body}\n") }) {
            warn!(path = %path.display(), error = %e, "failed to persist tracked pids");
        }
    }
}

/// `kill -15 <pid>`. Missing process is not an error worth reporting.
fn send_sigterm(pid: u32) -> bool {
    Command::new("kill")
        .args(["-15", &pid.to_string()])
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "subprocess_tracker_tests.rs"]
mod tests;
