// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Best-effort decoder from the agent's heterogeneous raw JSON into a
//! closed tagged variant. Unknown `type`s (and malformed known ones)
//! decode to `Unknown`, which classification drops after logging —
//! published events stay a closed sum regardless of what the agent
//! process actually sends.

use serde_json::Value;
use std::path::PathBuf;
use truant_core::ContentBlock;

#[derive(Debug, Clone, PartialEq)]
pub enum RawEvent {
    System {
        session_id: Option<String>,
    },
    Assistant {
        content_blocks: Vec<ContentBlock>,
    },
    PermissionRequest {
        request_id: String,
        tool_name: String,
        tool_input: Value,
    },
    Result {
        cost_usd: f64,
        duration_ms: u64,
    },
    FileOutput {
        file_path: PathBuf,
        file_name: String,
    },
    Unknown,
}

pub fn decode(value: &Value) -> RawEvent {
    let Some(kind) = value.get("type").and_then(Value::as_str) else {
        return RawEvent::Unknown;
    };

    match kind {
        "system" => RawEvent::System {
            session_id: value
                .get("session_id")
                .and_then(Value::as_str)
                .map(str::to_string),
        },
        "assistant" => RawEvent::Assistant {
            content_blocks: extract_content_blocks(value),
        },
        "permission_request" => RawEvent::PermissionRequest {
            request_id: value
                .get("id")
                .or_else(|| value.get("request_id"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            tool_name: value
                .get("tool_name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            tool_input: value
                .get("tool_input")
                .or_else(|| value.get("input"))
                .cloned()
                .unwrap_or(Value::Null),
        },
        "result" => RawEvent::Result {
            cost_usd: value.get("total_cost_usd").and_then(Value::as_f64).unwrap_or(0.0),
            duration_ms: value.get("duration_ms").and_then(Value::as_u64).unwrap_or(0),
        },
        "file_output" => {
            let file_path = value
                .get("file_path")
                .and_then(Value::as_str)
                .map(PathBuf::from)
                .unwrap_or_default();
            let file_name = value
                .get("file_name")
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| {
                    file_path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                })
                .unwrap_or_default();
            RawEvent::FileOutput { file_path, file_name }
        }
        _ => RawEvent::Unknown,
    }
}

/// Content can be at the top level (`content`) or nested under `message`
/// (stream-json's `{"message": {"content": [...]}}` shape); a bare string
/// is treated as a single text block.
fn extract_content_blocks(value: &Value) -> Vec<ContentBlock> {
    let raw = value
        .get("content")
        .or_else(|| value.get("message").and_then(|m| m.get("content")))
        .cloned()
        .unwrap_or(Value::Null);

    match raw {
        Value::String(s) if !s.is_empty() => vec![ContentBlock::text(s)],
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value::<ContentBlock>(item).ok())
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
#[path = "raw_event_tests.rs"]
mod tests;
