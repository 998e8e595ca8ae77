//! Shared enqueue discipline for both the in-queue and the out-queue: "if terminating
//! and not forced, drop the message without ever putting it on the queue" (Invariant
//! M1). [`MsgThread`](crate::core::msg_thread::MsgThread) exposes this through its
//! `send_in`/`send_out` methods; [`HeartbeatMessage`](crate::heartbeat::HeartbeatMessage)
//! and diagnostic messages use a cloned handle internally to deliver their follow-on
//! messages from inside `process`.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use super::message::Envelope;
use super::queue::Queue;

pub(crate) struct Sender<T> {
    queue: Arc<Queue<Envelope<T>>>,
    terminating: Arc<AtomicBool>,
    sent: Arc<AtomicU64>,
}

impl<T: Send> Sender<T> {
    pub(crate) fn new(
        queue: Arc<Queue<Envelope<T>>>,
        terminating: Arc<AtomicBool>,
        sent: Arc<AtomicU64>,
    ) -> Self {
        Self {
            queue,
            terminating,
            sent,
        }
    }

    /// Returns `true` if the message was enqueued, `false` if it was dropped under
    /// the terminating/non-forced rule (Invariant M1).
    pub(crate) fn send(&self, msg: T, forced: bool) -> bool {
        if self.terminating.load(Ordering::Acquire) && !forced {
            return false;
        }
        self.queue.put(Envelope { msg, forced });
        self.sent.fetch_add(1, Ordering::Relaxed);
        true
    }
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
            terminating: self.terminating.clone(),
            sent: self.sent.clone(),
        }
    }
}
