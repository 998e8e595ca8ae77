//! The process-wide registry of live [`MsgThread`]s, used to drive heartbeats and
//! opportunistic output draining from the main thread without every call site needing
//! to keep its own list of threads around.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, Weak};
use std::time::SystemTime;

use crate::core::msg_thread::MsgThread;
use crate::heartbeat::AckHook;

/// Opaque handle identifying a registered thread. Never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistryId(u64);

/// Registration surface a [`Manager`] exposes to threads constructed against it.
/// Exists mainly so [`MsgThreadBuilder`](crate::core::msg_thread::MsgThreadBuilder)
/// doesn't need to depend on `Manager`'s concrete storage layout.
pub trait ThreadRegistry {
    fn register(&self, id: RegistryId, thread: Weak<MsgThread>);
    fn unregister(&self, id: RegistryId);
}

pub struct Manager {
    threads: Mutex<Vec<(RegistryId, Weak<MsgThread>)>>,
    next_id: AtomicU64,
}

impl Manager {
    pub fn new() -> Self {
        Self {
            threads: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    pub(crate) fn next_id(&self) -> RegistryId {
        RegistryId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Number of threads still reachable through the registry (their `Arc` lives
    /// somewhere other than just this registry's `Weak`).
    pub fn live_count(&self) -> usize {
        let threads = self.threads.lock().unwrap_or_else(|p| p.into_inner());
        threads.iter().filter(|(_, w)| w.strong_count() > 0).count()
    }

    /// Calls [`MsgThread::retrieve_out`] once for every registered thread still alive,
    /// up to `max_per_thread` messages each. Returns the total number of messages run.
    /// Threads whose `Arc` has since been dropped are pruned from the registry.
    pub fn drain_once(&self, max_per_thread: usize) -> usize {
        let mut threads = self.threads.lock().unwrap_or_else(|p| p.into_inner());
        threads.retain(|(_, w)| w.strong_count() > 0);
        threads
            .iter()
            .filter_map(|(_, w)| w.upgrade())
            .map(|t| t.retrieve_out(max_per_thread))
            .sum()
    }

    /// Enqueues a heartbeat into every registered thread still alive, carrying
    /// `network_time` and `wall_time`; `on_ack` is cloned into each one and runs
    /// wherever that thread's acks are next retrieved. Intended to be called on a
    /// regular interval by the embedding application (spec §6 `TickHeartbeat`).
    pub fn tick_heartbeat(&self, network_time: SystemTime, wall_time: SystemTime, on_ack: AckHook) {
        let threads = self.threads.lock().unwrap_or_else(|p| p.into_inner());
        for (_, w) in threads.iter() {
            if let Some(t) = w.upgrade() {
                t.heartbeat_at(network_time, wall_time, on_ack.clone());
            }
        }
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreadRegistry for Manager {
    fn register(&self, id: RegistryId, thread: Weak<MsgThread>) {
        self.threads.lock().unwrap_or_else(|p| p.into_inner()).push((id, thread));
    }

    fn unregister(&self, id: RegistryId) {
        self.threads
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .retain(|(existing, _)| *existing != id);
    }
}
