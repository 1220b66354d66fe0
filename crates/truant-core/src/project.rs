// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A registered project: a named reference to a VCS working directory.
//!
//! Identity is by lowercased name (two different-case spellings of the
//! same project name collide). A project is never mutated in place;
//! re-registering an existing name requires unregistering first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("project not found: {0}")]
    NotFound(String),
    #[error("project already registered: {0}")]
    AlreadyRegistered(String),
    #[error("path does not exist or is not a directory: {}", .0.display())]
    InvalidPath(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Lowercased canonical name; the identity of the project.
    pub name: String,
    pub path: PathBuf,
    pub created_at: DateTime<Utc>,
}

impl Project {
    pub fn new(name: impl Into<String>, path: PathBuf, created_at: DateTime<Utc>) -> Self {
        Self {
            name: normalize_name(&name.into()),
            path,
            created_at,
        }
    }
}

/// Canonical project-name form used as the map key everywhere: lowercased.
///
/// Generalizes a historical inconsistency (some revisions compared project
/// names case-sensitively, others case-insensitively) to a single rule.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
}

#[cfg(test)]
#[path = "project_tests.rs"]
mod tests;
