// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use tokio::process::Command;

/// Environment variables a host coding-agent CLI sets to detect that it's
/// already running inside an agent session, so a spawned child doesn't
/// mistake itself for a nested invocation and refuse to start.
const NESTED_EXECUTION_ENV_VARS: &[&str] = &[
    "CLAUDECODE",
    "CLAUDE_CODE_SSE_PORT",
    "CLAUDE_CODE_ENTRYPOINT",
];

/// Remove ambient nested-execution markers from a child command's
/// environment before spawning it.
pub fn scrub_nested_execution_env(cmd: &mut Command) {
    for var in NESTED_EXECUTION_ENV_VARS {
        cmd.env_remove(var);
    }
}

#[cfg(test)]
#[path = "scrub_tests.rs"]
mod tests;
