// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Default agent registry: the transports this binary ships wired up
//! out of the box. A deployment that needs a polled-remote transport
//! supplies its own `RemoteClient` and registers it the same way.

use truant_agent::{AgentRegistry, FireAndCompleteAgent, StreamingStdioAgent};

/// Registers `claude` (persistent stdio, stream-json protocol) and
/// `codex` (one child process per turn) under the names `new_session`
/// accepts via `--agent`.
pub fn default_registry() -> AgentRegistry {
    let mut registry = AgentRegistry::new();
    registry.register("claude", || {
        Box::new(StreamingStdioAgent::new(
            "claude",
            vec![
                "--input-format".to_string(),
                "stream-json".to_string(),
                "--output-format".to_string(),
                "stream-json".to_string(),
                "--verbose".to_string(),
            ],
            "--resume",
        ))
    });
    registry.register("codex", || {
        Box::new(FireAndCompleteAgent::new(
            "codex",
            vec!["exec".to_string(), "--json".to_string()],
            "--session",
        ))
    });
    registry
}
