// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::atomic::{read_json, write_json_atomic, StorageError};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::PathBuf;
use truant_core::{ChannelId, SessionRecord};

/// The persisted session table, keyed by channel id (exactly one
/// session per channel, per the data model's invariant).
pub trait SessionStore: Send + Sync {
    fn upsert(&self, record: SessionRecord) -> Result<(), StorageError>;
    fn remove(&self, channel_id: &ChannelId) -> Result<Option<SessionRecord>, StorageError>;
    fn get(&self, channel_id: &ChannelId) -> Option<SessionRecord>;
    fn list(&self) -> Vec<SessionRecord>;
}

pub struct FsSessionStore {
    path: PathBuf,
    records: RwLock<BTreeMap<ChannelId, SessionRecord>>,
}

impl FsSessionStore {
    pub fn open(path: PathBuf) -> Result<Self, StorageError> {
        let loaded: Vec<SessionRecord> = read_json(&path)?.unwrap_or_default();
        let records = loaded
            .into_iter()
            .map(|record| (record.channel_id.clone(), record))
            .collect();
        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    fn persist(&self, records: &BTreeMap<ChannelId, SessionRecord>) -> Result<(), StorageError> {
        let table: Vec<&SessionRecord> = records.values().collect();
        write_json_atomic(&self.path, &table)
    }
}

impl SessionStore for FsSessionStore {
    fn upsert(&self, record: SessionRecord) -> Result<(), StorageError> {
        let mut records = self.records.write();
        records.insert(record.channel_id.clone(), record);
        self.persist(&records)
    }

    fn remove(&self, channel_id: &ChannelId) -> Result<Option<SessionRecord>, StorageError> {
        let mut records = self.records.write();
        let removed = records.remove(channel_id);
        if removed.is_some() {
            self.persist(&records)?;
        }
        Ok(removed)
    }

    fn get(&self, channel_id: &ChannelId) -> Option<SessionRecord> {
        self.records.read().get(channel_id).cloned()
    }

    fn list(&self) -> Vec<SessionRecord> {
        self.records.read().values().cloned().collect()
    }
}

#[cfg(any(test, feature = "test-support"))]
#[derive(Default)]
pub struct InMemorySessionStore {
    records: RwLock<BTreeMap<ChannelId, SessionRecord>>,
}

#[cfg(any(test, feature = "test-support"))]
impl SessionStore for InMemorySessionStore {
    fn upsert(&self, record: SessionRecord) -> Result<(), StorageError> {
        self.records.write().insert(record.channel_id.clone(), record);
        Ok(())
    }

    fn remove(&self, channel_id: &ChannelId) -> Result<Option<SessionRecord>, StorageError> {
        Ok(self.records.write().remove(channel_id))
    }

    fn get(&self, channel_id: &ChannelId) -> Option<SessionRecord> {
        self.records.read().get(channel_id).cloned()
    }

    fn list(&self) -> Vec<SessionRecord> {
        self.records.read().values().cloned().collect()
    }
}

#[cfg(test)]
#[path = "session_store_tests.rs"]
mod tests;
