// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::{AgentError, AgentPort};
use std::collections::HashMap;

type Constructor = Box<dyn Fn() -> Box<dyn AgentPort> + Send + Sync>;

/// Maps an agent name (chosen by the caller of `new_session`) to a
/// constructor for the transport that backs it. Resolved once at
/// `create_session`/`recover_sessions` time.
#[derive(Default)]
pub struct AgentRegistry {
    constructors: HashMap<String, Constructor>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor under `name`, replacing any prior one.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        ctor: impl Fn() -> Box<dyn AgentPort> + Send + Sync + 'static,
    ) {
        self.constructors.insert(name.into(), Box::new(ctor));
    }

    /// Build a fresh port for `name`.
    pub fn build(&self, name: &str) -> Result<Box<dyn AgentPort>, AgentError> {
        self.constructors
            .get(name)
            .map(|ctor| ctor())
            .ok_or_else(|| AgentError::UnknownAgent(name.to_string()))
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
