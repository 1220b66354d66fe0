// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::atomic::{read_json, write_json_atomic, StorageError};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use truant_core::Project;

/// Registered projects, keyed by interface rather than file layout so
/// the Command Facade and Session Manager depend on behavior, not a
/// concrete `projects.json`.
pub trait ProjectStore: Send + Sync {
    fn insert(&self, project: Project) -> Result<(), StorageError>;
    fn remove(&self, normalized_name: &str) -> Result<Option<Project>, StorageError>;
    fn get(&self, normalized_name: &str) -> Option<Project>;
    fn list(&self) -> Vec<Project>;
}

/// In-memory map of projects, mirrored to an atomically-written
/// `projects.json` snapshot after every mutation.
pub struct FsProjectStore {
    path: PathBuf,
    projects: RwLock<BTreeMap<String, Project>>,
}

impl FsProjectStore {
    /// Load `path` if it exists, otherwise start empty.
    pub fn open(path: PathBuf) -> Result<Self, StorageError> {
        let projects: BTreeMap<String, Project> = read_json(&path)?.unwrap_or_default();
        Ok(Self {
            path,
            projects: RwLock::new(projects),
        })
    }

    fn persist(&self, projects: &BTreeMap<String, Project>) -> Result<(), StorageError> {
        write_json_atomic(&self.path, projects)
    }
}

impl ProjectStore for FsProjectStore {
    fn insert(&self, project: Project) -> Result<(), StorageError> {
        let mut projects = self.projects.write();
        projects.insert(project.name.clone(), project);
        self.persist(&projects)
    }

    fn remove(&self, normalized_name: &str) -> Result<Option<Project>, StorageError> {
        let mut projects = self.projects.write();
        let removed = projects.remove(normalized_name);
        if removed.is_some() {
            self.persist(&projects)?;
        }
        Ok(removed)
    }

    fn get(&self, normalized_name: &str) -> Option<Project> {
        self.projects.read().get(normalized_name).cloned()
    }

    fn list(&self) -> Vec<Project> {
        self.projects.read().values().cloned().collect()
    }
}

#[cfg(any(test, feature = "test-support"))]
pub struct InMemoryProjectStore {
    projects: RwLock<BTreeMap<String, Project>>,
}

#[cfg(any(test, feature = "test-support"))]
impl Default for InMemoryProjectStore {
    fn default() -> Self {
        Self {
            projects: RwLock::new(BTreeMap::new()),
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl ProjectStore for InMemoryProjectStore {
    fn insert(&self, project: Project) -> Result<(), StorageError> {
        self.projects
            .write()
            .insert(project.name.clone(), project);
        Ok(())
    }

    fn remove(&self, normalized_name: &str) -> Result<Option<Project>, StorageError> {
        Ok(self.projects.write().remove(normalized_name))
    }

    fn get(&self, normalized_name: &str) -> Option<Project> {
        self.projects.read().get(normalized_name).cloned()
    }

    fn list(&self) -> Vec<Project> {
        self.projects.read().values().cloned().collect()
    }
}

#[cfg(test)]
#[path = "project_store_tests.rs"]
mod tests;
