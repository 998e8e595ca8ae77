//! Bounded-contention single-producer/single-consumer queue.
//!
//! [`Queue<T>`] is the hand-off primitive [`MsgThread`](crate::core::msg_thread::MsgThread)
//! builds its in-queue and out-queue from. A naive "one mutex per push/pop" queue
//! dominates CPU time once message rates climb into the tens of thousands per second,
//! so this queue batches: each side keeps a private, lock-free local buffer and only
//! touches the shared, mutex-guarded staging buffer when its local buffer runs dry or
//! grows past a small threshold.
//!
//! # Safety contract (Invariant Q1)
//!
//! Exactly one thread may call [`Queue::put`] for the lifetime of a given queue, and
//! exactly one thread may call [`Queue::get`]. Those two threads may differ from each
//! other. Violating this — two producers, or a producer also calling `get` — is
//! undefined behaviour: the producer-local and consumer-local buffers are accessed
//! through an [`UnsafeCell`] with no further synchronization, on the assumption that
//! only one thread ever touches each one. This is the same trade-off made by the
//! lock-free SPSC ring buffers in the wild (e.g. glommio's `spsc_queue`): the `unsafe
//! impl Sync` is sound only under the single-producer/single-consumer discipline the
//! type's name promises.

use std::cell::UnsafeCell;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// Small-batch threshold: the producer flushes its local buffer to staging once it
/// accumulates this many items, rather than waiting for the consumer-empty hint.
pub const DEFAULT_BATCH_THRESHOLD: usize = 10;

/// Bounded wait on the consumer side so termination is always observable within one
/// timeout interval, even if the producer never sends again.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(50);

/// Snapshot of a queue's counters, for diagnostics and the `GetStats` contract.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub enqueued: u64,
    pub dequeued: u64,
}

impl QueueStats {
    /// Messages enqueued but not yet dequeued. Approximate: the two counters are read
    /// with relaxed ordering and are not snapshotted atomically together.
    pub fn pending(&self) -> u64 {
        self.enqueued.saturating_sub(self.dequeued)
    }
}

struct Staging<T> {
    items: VecDeque<T>,
}

pub struct Queue<T> {
    producer_local: UnsafeCell<VecDeque<T>>,
    consumer_local: UnsafeCell<VecDeque<T>>,
    staging: Mutex<Staging<T>>,
    not_empty: Condvar,
    enqueued: AtomicU64,
    dequeued: AtomicU64,
    /// Producer-readable hint: true once the consumer has drained its local buffer to
    /// empty. Lets `put` decide to flush early even before the batch threshold, per
    /// spec §4.1. Always safe to read stale (it only ever narrows the flush window).
    consumer_local_empty: AtomicBool,
    batch_threshold: usize,
    poll_timeout: Duration,
}

// SAFETY: `producer_local` is only ever touched from the single producer thread, and
// `consumer_local` only from the single consumer thread (Invariant Q1). The staging
// buffer is the only state shared without per-side exclusivity, and it is guarded by
// `staging`'s mutex.
unsafe impl<T: Send> Send for Queue<T> {}
unsafe impl<T: Send> Sync for Queue<T> {}

impl<T: Send> Queue<T> {
    pub fn new() -> Self {
        Self::with_config(DEFAULT_BATCH_THRESHOLD, DEFAULT_POLL_TIMEOUT)
    }

    pub fn with_config(batch_threshold: usize, poll_timeout: Duration) -> Self {
        Self {
            producer_local: UnsafeCell::new(VecDeque::new()),
            consumer_local: UnsafeCell::new(VecDeque::new()),
            staging: Mutex::new(Staging {
                items: VecDeque::new(),
            }),
            not_empty: Condvar::new(),
            enqueued: AtomicU64::new(0),
            dequeued: AtomicU64::new(0),
            consumer_local_empty: AtomicBool::new(true),
            batch_threshold: batch_threshold.max(1),
            poll_timeout,
        }
    }

    /// Producer side. Appends `value` to the producer-local buffer and, if the local
    /// buffer has grown past the batch threshold or the consumer is known to be
    /// starved, splices it onto the shared staging buffer and wakes the consumer.
    ///
    /// Must only be called by the single producer thread (Invariant Q1).
    pub fn put(&self, value: T) {
        // SAFETY: single-producer discipline (Q1) gives this thread exclusive access.
        let local = unsafe { &mut *self.producer_local.get() };
        local.push_back(value);
        self.enqueued.fetch_add(1, Ordering::Relaxed);

        let consumer_starved = self.consumer_local_empty.load(Ordering::Acquire);
        if local.len() >= self.batch_threshold || consumer_starved {
            self.flush_locked(local);
        }
    }

    fn flush_locked(&self, local: &mut VecDeque<T>) {
        if local.is_empty() {
            return;
        }
        let mut staging = self.staging.lock().unwrap_or_else(|p| p.into_inner());
        staging.items.extend(local.drain(..));
        drop(staging);
        self.not_empty.notify_one();
    }

    /// Consumer side. Pops the head of the consumer-local buffer if non-empty
    /// (lock-free fast path). Otherwise acquires the staging lock; if staging holds
    /// anything, swaps it wholesale into the consumer-local buffer and retries.
    /// Otherwise blocks on the condition variable for up to the configured poll
    /// timeout before giving up and returning `None`, so a caller spinning on
    /// `get()` can always observe a termination flag within one timeout interval.
    ///
    /// Must only be called by the single consumer thread (Invariant Q1).
    pub fn get(&self) -> Option<T> {
        // SAFETY: single-consumer discipline (Q1) gives this thread exclusive access.
        let local = unsafe { &mut *self.consumer_local.get() };

        if let Some(v) = local.pop_front() {
            self.note_local_emptiness(local);
            self.dequeued.fetch_add(1, Ordering::Relaxed);
            return Some(v);
        }

        let mut staging = self.staging.lock().unwrap_or_else(|p| p.into_inner());
        if staging.items.is_empty() {
            let (guard, _timeout) = self
                .not_empty
                .wait_timeout(staging, self.poll_timeout)
                .unwrap_or_else(|p| p.into_inner());
            staging = guard;
            if staging.items.is_empty() {
                drop(staging);
                return None;
            }
        }

        std::mem::swap(local, &mut staging.items);
        drop(staging);
        self.consumer_local_empty.store(false, Ordering::Release);

        let v = local.pop_front();
        self.note_local_emptiness(local);
        if v.is_some() {
            self.dequeued.fetch_add(1, Ordering::Relaxed);
        }
        v
    }

    fn note_local_emptiness(&self, local: &VecDeque<T>) {
        if local.is_empty() {
            self.consumer_local_empty.store(true, Ordering::Release);
        }
    }

    /// Consumer side. True iff the consumer-local buffer is non-empty, or (after
    /// taking the staging lock) the staging buffer is non-empty.
    pub fn ready(&self) -> bool {
        // SAFETY: consumer-only read of consumer-local length (Q1).
        let local = unsafe { &*self.consumer_local.get() };
        if !local.is_empty() {
            return true;
        }
        let staging = self.staging.lock().unwrap_or_else(|p| p.into_inner());
        !staging.items.is_empty()
    }

    /// Lock-free approximation of [`Queue::ready`]. May return true spuriously (e.g.
    /// a message was enqueued and already dequeued by the time the caller acts on
    /// it), but never false-negatives after a `put` has released the staging mutex
    /// at least once, because the two counters only diverge while work is in flight.
    pub fn maybe_ready(&self) -> bool {
        self.enqueued.load(Ordering::Relaxed) != self.dequeued.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            dequeued: self.dequeued.load(Ordering::Relaxed),
        }
    }
}

impl<T: Send> Default for Queue<T> {
    fn default() -> Self {
        Self::new()
    }
}
