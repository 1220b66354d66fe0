// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Time abstraction so session timestamps and poll cadences are
//! deterministically testable.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Supplies the current time. Production code uses `SystemClock`; tests
/// use `FakeClock` to control time deterministically.
pub trait Clock: Clone + Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

/// Real wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock with a settable, monotonically-advanceable time, for tests.
#[derive(Clone)]
pub struct FakeClock {
    millis: Arc<AtomicI64>,
}

impl FakeClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            millis: Arc::new(AtomicI64::new(start.timestamp_millis())),
        }
    }

    /// Advance the clock by `delta`, returning the new time.
    pub fn advance(&self, delta: chrono::Duration) -> DateTime<Utc> {
        let new_millis = self.millis.fetch_add(delta.num_milliseconds(), Ordering::SeqCst)
            + delta.num_milliseconds();
        DateTime::from_timestamp_millis(new_millis).unwrap_or_else(Utc::now)
    }

    pub fn set(&self, time: DateTime<Utc>) {
        self.millis.store(time.timestamp_millis(), Ordering::SeqCst);
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new(DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_else(Utc::now))
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        let millis = self.millis.load(Ordering::SeqCst);
        DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now)
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
