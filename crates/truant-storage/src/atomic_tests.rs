// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde::{Deserialize, Serialize};
use tempfile::tempdir;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Sample {
    n: u32,
    name: String,
}

#[test]
fn write_then_read_round_trips() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("data.json");
    let value = Sample {
        n: 7,
        name: "demo".to_string(),
    };

    write_json_atomic(&path, &value).unwrap();
    let loaded: Sample = read_json(&path).unwrap().unwrap();
    assert_eq!(loaded, value);
}

#[test]
fn read_missing_file_returns_none() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing.json");
    let loaded: Option<Sample> = read_json(&path).unwrap();
    assert!(loaded.is_none());
}

#[test]
fn write_leaves_no_temp_file_behind() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("data.json");
    write_json_atomic(&path, &Sample { n: 1, name: "x".to_string() }).unwrap();

    let entries: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(entries, vec![std::ffi::OsString::from("data.json")]);
}

#[test]
fn overwrite_replaces_prior_contents() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("data.json");
    write_json_atomic(&path, &Sample { n: 1, name: "a".to_string() }).unwrap();
    write_json_atomic(&path, &Sample { n: 2, name: "b".to_string() }).unwrap();

    let loaded: Sample = read_json(&path).unwrap().unwrap();
    assert_eq!(loaded, Sample { n: 2, name: "b".to_string() });
}
