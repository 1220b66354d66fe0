// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use truant_core::Template;

/// A loaded template: its metadata plus the directory the scaffold files
/// live in.
#[derive(Debug, Clone)]
pub struct LoadedTemplate {
    pub config: Template,
    pub dir: PathBuf,
}

/// Discovers workspace templates from a directory at construction time.
///
/// Every subdirectory containing `template.json` is a template; every
/// other entry in that subdirectory is a scaffold file copied verbatim
/// into a fresh worktree by `apply_scaffold`.
pub struct TemplateStore {
    templates: BTreeMap<String, LoadedTemplate>,
}

impl TemplateStore {
    /// Load all templates found directly under `templates_dir`. A missing
    /// directory is not an error — it just yields an empty store.
    pub fn load(templates_dir: &Path) -> Self {
        let mut templates = BTreeMap::new();
        let Ok(entries) = std::fs::read_dir(templates_dir) else {
            info!(dir = %templates_dir.display(), "templates directory not found");
            return Self { templates };
        };

        for entry in entries.flatten() {
            let dir = entry.path();
            if !dir.is_dir() {
                continue;
            }
            let meta_path = dir.join(truant_core::template::TEMPLATE_METADATA_FILE);
            let Ok(raw) = std::fs::read_to_string(&meta_path) else {
                continue;
            };
            match serde_json::from_str::<Template>(&raw) {
                Ok(config) => {
                    templates.insert(config.name.to_lowercase(), LoadedTemplate { config, dir });
                }
                Err(e) => warn!(path = %meta_path.display(), error = %e, "skipping invalid template"),
            }
        }
        info!(count = templates.len(), "loaded templates");
        Self { templates }
    }

    /// Case-insensitive lookup by name.
    pub fn get(&self, name: &str) -> Option<&LoadedTemplate> {
        self.templates.get(&name.to_lowercase())
    }

    pub fn list(&self) -> Vec<&LoadedTemplate> {
        self.templates.values().collect()
    }
}

/// Copy every entry of `template.dir` except the metadata file into
/// `dest` (an already-created worktree directory).
pub fn apply_scaffold(template: &LoadedTemplate, dest: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(&template.dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if name == truant_core::template::TEMPLATE_METADATA_FILE {
            continue;
        }
        let target = dest.join(&name);
        if entry.path().is_dir() {
            copy_dir_all(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    info!(template = %template.config.name, dest = %dest.display(), "applied template scaffold");
    Ok(())
}

fn copy_dir_all(src: &Path, dest: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dest)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        if entry.path().is_dir() {
            copy_dir_all(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "template_store_tests.rs"]
mod tests;
