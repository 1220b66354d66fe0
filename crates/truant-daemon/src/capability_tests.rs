// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use truant_core::ChannelId;

#[tokio::test]
async fn recording_capability_tracks_cleanup_calls() {
    let cap = RecordingCapability::new();
    let channel = ChannelId::new("1");

    cap.cleanup(&channel).await;
    cap.cleanup(&ChannelId::new("2")).await;

    let seen = cap.cleaned_up();
    assert_eq!(seen, vec![ChannelId::new("1"), ChannelId::new("2")]);
}
