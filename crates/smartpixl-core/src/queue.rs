//! The drop-oldest bounded queue used at every stage boundary (spec §5:
//! "every queue in the system is bounded and drop-oldest under pressure").
//!
//! `tokio::sync::mpsc` is bounded but back-pressures the sender instead of
//! discarding; that is the wrong failure mode here — the edge must never
//! block a request thread on a full internal queue, and the engine must
//! never stall fast analyzers behind a slow downstream one. This is a small
//! ring-buffer guarded by a `Mutex` plus a `Notify`, grounded in the
//! mailbox pattern the teacher uses for its watcher channel
//! (`daemon/src/mailbox/mod.rs`, `mailbox/watcher.rs`), generalized from
//! "notify one waiting reader" to "drop the oldest item instead of
//! rejecting the newest".

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tokio::sync::Notify;

/// A bounded FIFO queue that, once full, evicts the oldest entry to make
/// room for the newest rather than rejecting the push. Every eviction is
/// counted so operators can see queue pressure (spec §8: "drop-oldest
/// invariant" is testable and observable).
pub struct DropOldestQueue<T> {
    capacity: usize,
    inner: Mutex<VecDeque<T>>,
    notify: Notify,
    dropped: AtomicU64,
    pushed: AtomicU64,
}

impl<T> DropOldestQueue<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "DropOldestQueue capacity must be nonzero");
        Self {
            capacity,
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            notify: Notify::new(),
            dropped: AtomicU64::new(0),
            pushed: AtomicU64::new(0),
        }
    }

    /// Push `item`. If the queue is already at capacity, the oldest item
    /// is dropped and returned to the caller for any bookkeeping (e.g.
    /// dead-letter) the caller wants to do; pushing never blocks.
    pub fn push(&self, item: T) -> Option<T> {
        self.pushed.fetch_add(1, Ordering::Relaxed);
        let evicted = {
            let mut guard = self.inner.lock().expect("DropOldestQueue mutex poisoned");
            let evicted = if guard.len() >= self.capacity {
                guard.pop_front()
            } else {
                None
            };
            guard.push_back(item);
            evicted
        };
        if evicted.is_some() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        self.notify.notify_one();
        evicted
    }

    /// Pop the oldest item if any is present, without waiting.
    pub fn try_pop(&self) -> Option<T> {
        self.inner
            .lock()
            .expect("DropOldestQueue mutex poisoned")
            .pop_front()
    }

    /// Pop the oldest item, waiting for one to become available.
    pub async fn pop(&self) -> T {
        loop {
            if let Some(item) = self.try_pop() {
                return item;
            }
            self.notify.notified().await;
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("DropOldestQueue mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total items evicted over the queue's lifetime.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Total items ever pushed, including ones later evicted.
    pub fn pushed_count(&self) -> u64 {
        self.pushed.load(Ordering::Relaxed)
    }

    /// Drain every item currently queued, oldest first. Used at shutdown
    /// to flush whatever is left before a process exits (spec §8: "no
    /// record loss under graceful shutdown").
    pub fn drain(&self) -> Vec<T> {
        self.inner
            .lock()
            .expect("DropOldestQueue mutex poisoned")
            .drain(..)
            .collect()
    }
}
