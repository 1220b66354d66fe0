// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::atomic::StorageError;
use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use truant_core::{ChannelId, Message};

/// Channels keep a bounded in-memory window plus an append-only on-disk
/// log. Each appended line carries the channel id in a JSON field, not
/// just the filename — filenames are a sanitized, lossy convenience for
/// humans browsing the directory, never the source of truth on reload.
pub const RING_BUFFER_CAPACITY: usize = 500;

pub trait MessageStore: Send + Sync {
    fn append(&self, channel_id: &ChannelId, message: Message) -> Result<(), StorageError>;
    fn recent(&self, channel_id: &ChannelId) -> Vec<Message>;
}

#[derive(serde::Serialize, serde::Deserialize)]
struct LogLine {
    channel_id: String,
    message: Message,
}

pub struct FsMessageStore {
    dir: PathBuf,
    buffers: RwLock<HashMap<ChannelId, VecDeque<Message>>>,
}

impl FsMessageStore {
    /// Scans `dir` for every `.jsonl` log left by a prior run and rebuilds
    /// each channel's ring buffer from it, the way `FsProjectStore`/
    /// `FsSessionStore` load their snapshot at construction rather than on
    /// first access.
    pub fn open(dir: PathBuf) -> Result<Self, StorageError> {
        std::fs::create_dir_all(&dir)?;
        let buffers = load_all_logs(&dir)?;
        Ok(Self {
            dir,
            buffers: RwLock::new(buffers),
        })
    }

    fn log_path(&self, channel_id: &ChannelId) -> PathBuf {
        self.dir.join(format!("{}.jsonl", sanitize(channel_id.as_str())))
    }

    /// Rebuild the in-memory ring buffer for `channel_id` from its
    /// on-disk log, keeping only the most recent `RING_BUFFER_CAPACITY`
    /// entries. Useful to pick up a log written by another process since
    /// `open()`; not needed just to see what was already on disk at
    /// startup.
    pub fn reload(&self, channel_id: &ChannelId) -> Result<(), StorageError> {
        let path = self.log_path(channel_id);
        if !path.exists() {
            return Ok(());
        }
        let ring = ring_from_log(&path, Some(channel_id))?
            .into_iter()
            .next()
            .map(|(_, ring)| ring)
            .unwrap_or_default();
        self.buffers.write().insert(channel_id.clone(), ring);
        Ok(())
    }
}

/// Read every `.jsonl` file in `dir` and group its entries by the
/// `channel_id` field each line carries, not the (sanitized, lossy)
/// filename.
fn load_all_logs(dir: &Path) -> Result<HashMap<ChannelId, VecDeque<Message>>, StorageError> {
    let mut buffers: HashMap<ChannelId, VecDeque<Message>> = HashMap::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("jsonl") {
            continue;
        }
        for (channel_id, ring) in ring_from_log(&path, None)? {
            buffers.insert(channel_id, ring);
        }
    }
    Ok(buffers)
}

/// Replay one log file into per-channel ring buffers. When `only` is
/// given, every other channel's lines are skipped; a single log file can
/// in principle carry more than one channel's lines if two channel ids
/// sanitize to the same filename.
fn ring_from_log(
    path: &Path,
    only: Option<&ChannelId>,
) -> Result<HashMap<ChannelId, VecDeque<Message>>, StorageError> {
    let mut buffers: HashMap<ChannelId, VecDeque<Message>> = HashMap::new();
    let file = std::fs::File::open(path)?;
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: LogLine = serde_json::from_str(&line)?;
        let channel_id = ChannelId::new(entry.channel_id);
        if let Some(only) = only {
            if &channel_id != only {
                continue;
            }
        }
        let ring = buffers.entry(channel_id).or_insert_with(|| VecDeque::with_capacity(RING_BUFFER_CAPACITY));
        if ring.len() == RING_BUFFER_CAPACITY {
            ring.pop_front();
        }
        ring.push_back(entry.message);
    }
    Ok(buffers)
}

impl MessageStore for FsMessageStore {
    fn append(&self, channel_id: &ChannelId, message: Message) -> Result<(), StorageError> {
        {
            let mut buffers = self.buffers.write();
            let ring = buffers.entry(channel_id.clone()).or_default();
            if ring.len() == RING_BUFFER_CAPACITY {
                ring.pop_front();
            }
            ring.push_back(message.clone());
        }

        let line = LogLine {
            channel_id: channel_id.as_str().to_string(),
            message,
        };
        let mut json = serde_json::to_string(&line)?;
        json.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.log_path(channel_id))?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }

    fn recent(&self, channel_id: &ChannelId) -> Vec<Message> {
        self.buffers
            .read()
            .get(channel_id)
            .map(|ring| ring.iter().cloned().collect())
            .unwrap_or_default()
    }
}

/// Replace characters unsafe in a filename with `_`. Lossy by design —
/// the literal channel id lives inside the file, not in this name.
fn sanitize(channel_id: &str) -> String {
    channel_id
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

#[cfg(any(test, feature = "test-support"))]
#[derive(Default)]
pub struct InMemoryMessageStore {
    buffers: RwLock<HashMap<ChannelId, VecDeque<Message>>>,
}

#[cfg(any(test, feature = "test-support"))]
impl MessageStore for InMemoryMessageStore {
    fn append(&self, channel_id: &ChannelId, message: Message) -> Result<(), StorageError> {
        let mut buffers = self.buffers.write();
        let ring = buffers.entry(channel_id.clone()).or_default();
        if ring.len() == RING_BUFFER_CAPACITY {
            ring.pop_front();
        }
        ring.push_back(message);
        Ok(())
    }

    fn recent(&self, channel_id: &ChannelId) -> Vec<Message> {
        self.buffers
            .read()
            .get(channel_id)
            .map(|ring| ring.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "message_store_tests.rs"]
mod tests;
