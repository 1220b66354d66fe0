// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Capability side-car pattern: a capability is a plain object registered
//! with the Session Manager through a narrow interface — its own methods
//! (not modeled here; they are capability-specific and command-facade
//! visible) plus an optional `cleanup(channel_id)` the manager dispatches
//! on session stop/complete. Capabilities observe the Event Bus if they
//! need event flow; they must never call back into the Session Manager.

use async_trait::async_trait;
use truant_core::ChannelId;

#[async_trait]
pub trait CapabilityHook: Send + Sync {
    fn name(&self) -> &str;

    /// Called when a session stops or completes. Errors are the
    /// capability's own problem to log; this never fails the lifecycle
    /// operation that triggered it.
    async fn cleanup(&self, channel_id: &ChannelId);
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::RecordingCapability;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;

    /// A no-op capability that records every `cleanup` call it receives,
    /// generalizing the fake-adapter-behind-a-trait pattern used for
    /// agent/session adapters to this narrower side-car shape.
    #[derive(Default)]
    pub struct RecordingCapability {
        cleaned_up: Mutex<Vec<ChannelId>>,
    }

    impl RecordingCapability {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn cleaned_up(&self) -> Vec<ChannelId> {
            self.cleaned_up.lock().clone()
        }
    }

    #[async_trait]
    impl CapabilityHook for RecordingCapability {
        fn name(&self) -> &str {
            "recording"
        }

        async fn cleanup(&self, channel_id: &ChannelId) {
            self.cleaned_up.lock().push(channel_id.clone());
        }
    }
}

#[cfg(test)]
#[path = "capability_tests.rs"]
mod tests;
