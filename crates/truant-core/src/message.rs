// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timestamped messages appended to a channel's message log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
    System,
    Tool,
    Result,
    File,
    Permission,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub timestamp: DateTime<Utc>,
    pub role: MessageRole,
    pub text: String,
    #[serde(default)]
    pub meta: Value,
}

impl Message {
    pub fn new(role: MessageRole, text: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            timestamp: now,
            role,
            text: text.into(),
            meta: Value::Null,
        }
    }

    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = meta;
        self
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
