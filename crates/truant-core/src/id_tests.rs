// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

define_id! {
    /// Test id type.
    pub struct TestId;
}

#[test]
fn short_truncates() {
    let id = TestId::new("abcdefgh");
    assert_eq!(id.short(4), "abcd");
    assert_eq!(id.short(100), "abcdefgh");
}

#[test]
fn sequential_id_gen_increments() {
    let gen = SequentialIdGen::new("s");
    assert_eq!(gen.next(), "s-1");
    assert_eq!(gen.next(), "s-2");
}

#[test]
fn display_roundtrips_string() {
    let id = TestId::new("xyz");
    assert_eq!(id.to_string(), "xyz");
    assert_eq!(id, "xyz");
}

#[test]
fn uuid_id_gen_produces_distinct_ids() {
    let gen = UuidIdGen;
    assert_ne!(gen.next(), gen.next());
}
