//! CorrelationRegistry: RequestId → per-index reply slots.
//!
//! Reply delivery (the channel listener) and reply consumption (a
//! [`CallStream`](super::CallStream) being polled) race independently. Each
//! `(request, index)` pair therefore gets a slot that is created by whichever
//! side arrives first:
//!
//! ```text
//!            listener first                     consumer first
//! (empty) ──deliver──▶ Delivered     (empty) ──poll──▶ Waiting(waker)
//! Delivered ──poll──▶ (removed)      Waiting ──deliver──▶ Delivered + wake
//!                                    Delivered ──poll──▶ (removed)
//! ```
//!
//! Either order yields the same [`Delivery`]. Slots are removed as soon as
//! they are consumed, so memory tracks only replies not yet pulled.
//!
//! Uses `RefCell` for single-threaded runtimes.

use std::cell::RefCell;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::task::{Context, Poll, Waker};

use serde_json::Value;

use crate::wire::{ReplyFrame, RequestId};

/// A reply as handed to the consumer: raw status value plus payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    /// Raw status value, not yet validated.
    pub status: Value,
    /// Reply payload.
    pub message: Value,
}

/// One `(request, index)` cell. Never holds a value and a waiter at once.
#[derive(Debug)]
enum Slot {
    /// The listener delivered before the consumer asked.
    Delivered(Delivery),
    /// The consumer is suspended on this index.
    Waiting(Waker),
}

/// Registry of open calls on one channel (caller side).
#[derive(Debug, Default)]
pub struct CorrelationRegistry {
    inner: RefCell<RegistryInner>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    calls: HashMap<RequestId, HashMap<u64, Slot>>,

    /// Set once the channel's inbound side has ended.
    closed: bool,

    /// Replies dropped because their request was not registered.
    replies_dropped: u64,
}

impl CorrelationRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an entry for a new call.
    ///
    /// Returns `false` if `request_id` is already registered.
    pub fn register(&self, request_id: RequestId) -> bool {
        match self.inner.borrow_mut().calls.entry(request_id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(HashMap::new());
                true
            }
        }
    }

    /// Remove a call's entry and every slot it still holds.
    ///
    /// Returns `true` if the call was registered.
    pub fn deregister(&self, request_id: &RequestId) -> bool {
        self.inner.borrow_mut().calls.remove(request_id).is_some()
    }

    /// Route an inbound reply to its slot.
    ///
    /// Replies for unknown requests are dropped. A second delivery for an
    /// index that is still buffered is dropped as well; the channel is not
    /// supposed to duplicate frames.
    pub fn deliver(&self, reply: ReplyFrame) {
        let mut inner = self.inner.borrow_mut();

        let Some(slots) = inner.calls.get_mut(&reply.request_id) else {
            inner.replies_dropped += 1;
            tracing::debug!(
                request_id = %reply.request_id,
                index = reply.index,
                "reply for unknown request dropped"
            );
            return;
        };

        let delivery = Delivery {
            status: reply.status,
            message: reply.message,
        };

        match slots.entry(reply.index) {
            Entry::Vacant(entry) => {
                entry.insert(Slot::Delivered(delivery));
            }
            Entry::Occupied(mut entry) => {
                if matches!(entry.get(), Slot::Delivered(_)) {
                    tracing::warn!(
                        request_id = %reply.request_id,
                        index = reply.index,
                        "duplicate reply for buffered index dropped"
                    );
                } else if let Slot::Waiting(waker) = entry.insert(Slot::Delivered(delivery)) {
                    waker.wake();
                }
            }
        }
    }

    /// Poll for the reply at `index` of `request_id`.
    ///
    /// - `Ready(Some(delivery))`: the reply, removed from its slot
    /// - `Ready(None)`: no reply will ever arrive (channel closed, or the
    ///   request is not registered)
    /// - `Pending`: the waker is parked in the slot until delivery
    pub fn poll_reply(
        &self,
        request_id: &RequestId,
        index: u64,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Delivery>> {
        let mut inner = self.inner.borrow_mut();
        let closed = inner.closed;

        let Some(slots) = inner.calls.get_mut(request_id) else {
            return Poll::Ready(None);
        };

        if matches!(slots.get(&index), Some(Slot::Delivered(_))) {
            if let Some(Slot::Delivered(delivery)) = slots.remove(&index) {
                return Poll::Ready(Some(delivery));
            }
        }

        if closed {
            slots.remove(&index);
            return Poll::Ready(None);
        }

        slots.insert(index, Slot::Waiting(cx.waker().clone()));
        Poll::Pending
    }

    /// Mark the channel's inbound side as ended and wake every waiter.
    ///
    /// Replies already buffered stay consumable; anything not yet delivered
    /// resolves to `None`.
    pub fn close(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.closed = true;

        let mut woken = 0usize;
        for slots in inner.calls.values_mut() {
            slots.retain(|_, slot| match slot {
                Slot::Waiting(waker) => {
                    waker.wake_by_ref();
                    woken += 1;
                    false
                }
                Slot::Delivered(_) => true,
            });
        }
        tracing::debug!(
            open_calls = inner.calls.len(),
            woken,
            "correlation registry closed"
        );
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.borrow().closed
    }

    /// Whether `request_id` is currently registered.
    pub fn contains(&self, request_id: &RequestId) -> bool {
        self.inner.borrow().calls.contains_key(request_id)
    }

    /// Number of registered calls.
    pub fn open_calls(&self) -> usize {
        self.inner.borrow().calls.len()
    }

    /// Number of delivered-but-unconsumed replies buffered for a call.
    pub fn buffered(&self, request_id: &RequestId) -> usize {
        self.inner
            .borrow()
            .calls
            .get(request_id)
            .map(|slots| {
                slots
                    .values()
                    .filter(|slot| matches!(slot, Slot::Delivered(_)))
                    .count()
            })
            .unwrap_or(0)
    }

    /// Total replies dropped because their request was not registered.
    pub fn replies_dropped(&self) -> u64 {
        self.inner.borrow().replies_dropped
    }
}
