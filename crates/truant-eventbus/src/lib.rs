// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! A typed in-process event bus.
//!
//! Subscribers register for one concrete Rust type and get an ordered
//! queue of values of that type; there is no wildcard subscription and
//! no cross-type ordering guarantee. Publishing never blocks: a
//! subscriber whose queue is full loses that one event rather than
//! stalling the publisher or any other subscriber.

use parking_lot::Mutex;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

struct Slot {
    id: u64,
    sender: Box<dyn Any + Send + Sync>,
}

struct Inner {
    subscribers: Mutex<HashMap<TypeId, Vec<Slot>>>,
    next_id: AtomicU64,
}

/// A typed pub/sub bus. Cheap to clone; clones share the same
/// subscriber registry.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Inner>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                subscribers: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Register for events of type `T`. Each subscriber gets its own
    /// bounded queue of `capacity`; a full queue drops the newest event
    /// for that subscriber only.
    pub fn subscribe<T>(&self, capacity: usize) -> Subscription<T>
    where
        T: 'static + Send + Sync,
    {
        let (tx, rx) = mpsc::channel::<T>(capacity);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .subscribers
            .lock()
            .entry(TypeId::of::<T>())
            .or_default()
            .push(Slot {
                id,
                sender: Box::new(tx),
            });

        Subscription {
            id,
            bus: self.inner.clone(),
            receiver: rx,
        }
    }

    /// Publish `event` to every live subscriber of type `T`. Closed
    /// subscriber queues (the receiver was dropped without calling
    /// `unsubscribe`) are pruned opportunistically.
    pub fn publish<T>(&self, event: T)
    where
        T: 'static + Send + Sync + Clone,
    {
        let mut subscribers = self.inner.subscribers.lock();
        let Some(slots) = subscribers.get_mut(&TypeId::of::<T>()) else {
            return;
        };

        slots.retain_mut(|slot| {
            let sender = slot
                .sender
                .downcast_mut::<mpsc::Sender<T>>()
                .expect("slot sender type matches its TypeId key");
            match sender.try_send(event.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(subscriber = slot.id, "event bus queue full, dropping event");
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            }
        });
    }

}

/// A live subscription to events of type `T`.
///
/// Cancelling it, whether by calling [`Subscription::unsubscribe`] or by
/// simply letting it drop (end of scope, `break` out of an iteration
/// loop, task abort), removes its slot from the bus synchronously — it
/// never waits for a future publish to notice a closed queue.
pub struct Subscription<T> {
    id: u64,
    bus: Arc<Inner>,
    receiver: mpsc::Receiver<T>,
}

impl<T: 'static> Subscription<T> {
    /// Wait for the next event. Returns `None` once the bus side of the
    /// queue was dropped (the `EventBus` and all its clones).
    pub async fn next(&mut self) -> Option<T> {
        self.receiver.recv().await
    }

    /// Remove this subscription from the bus. Equivalent to dropping it;
    /// spelled out for callers that want the intent to read explicitly.
    pub fn unsubscribe(self) {
        drop(self)
    }

    fn remove_slot(&self) {
        if let Some(slots) = self.bus.subscribers.lock().get_mut(&TypeId::of::<T>()) {
            slots.retain(|slot| slot.id != self.id);
        }
    }
}

impl<T: 'static> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.remove_slot();
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
