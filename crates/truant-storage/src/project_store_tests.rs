// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::Utc;
use tempfile::tempdir;

fn sample(name: &str) -> Project {
    Project::new(name, PathBuf::from("/repos/demo"), Utc::now())
}

#[test]
fn insert_then_get_round_trips() {
    let dir = tempdir().unwrap();
    let store = FsProjectStore::open(dir.path().join("projects.json")).unwrap();
    store.insert(sample("Demo")).unwrap();

    let found = store.get("demo").unwrap();
    assert_eq!(found.name, "demo");
}

#[test]
fn insert_persists_across_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("projects.json");
    {
        let store = FsProjectStore::open(path.clone()).unwrap();
        store.insert(sample("demo")).unwrap();
    }

    let reopened = FsProjectStore::open(path).unwrap();
    assert_eq!(reopened.list().len(), 1);
}

#[test]
fn remove_missing_project_is_a_no_op() {
    let dir = tempdir().unwrap();
    let store = FsProjectStore::open(dir.path().join("projects.json")).unwrap();
    assert!(store.remove("ghost").unwrap().is_none());
}

#[test]
fn remove_existing_project_returns_it() {
    let dir = tempdir().unwrap();
    let store = FsProjectStore::open(dir.path().join("projects.json")).unwrap();
    store.insert(sample("demo")).unwrap();

    let removed = store.remove("demo").unwrap().unwrap();
    assert_eq!(removed.name, "demo");
    assert!(store.get("demo").is_none());
}

#[test]
fn in_memory_store_does_not_touch_disk() {
    let store = InMemoryProjectStore::default();
    store.insert(sample("demo")).unwrap();
    assert_eq!(store.list().len(), 1);
}
