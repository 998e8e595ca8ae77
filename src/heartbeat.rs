//! The heartbeat round-trip: the main thread enqueues a [`HeartbeatMessage`] carrying
//! the two clocks it knows about — `network_time` (the simulation's own clock) and
//! `wall_time` (real time when main sent it) — the child thread runs its maintenance
//! hook against those exact values, then replies with a [`HeartbeatAck`] carrying
//! `wall_time` back alongside the time the child actually got to process it, giving
//! the main thread a measure of how far behind the child thread is running, not just
//! whether it's alive.

use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use crate::core::message::{InputMessage, Named, OutputMessage};
use crate::core::sender::Sender;

/// Invoked on the main thread (via [`crate::core::msg_thread::MsgThread::retrieve_out`])
/// with `(wall_time, processed_at)` once a heartbeat round-trip completes. This is the
/// Rust stand-in for the source design's overridable `Heartbeat()` main-side hook.
pub type AckHook = Arc<Mutex<dyn FnMut(SystemTime, SystemTime) + Send>>;

/// Invoked on the child thread, inline with `process`, before the ack is sent, with
/// the exact `(network_time, wall_time)` pair main supplied — not the child's own
/// clock. This is the Rust stand-in for the source design's overridable
/// `DoHeartbeat(network_time, current_time)` child-side maintenance hook — set once
/// per worker (via [`crate::core::msg_thread::MsgThreadBuilder::on_heartbeat`]),
/// unlike `AckHook`, which a caller supplies per `heartbeat`/`heartbeat_at` call.
pub type ChildHeartbeatHook = Arc<Mutex<dyn FnMut(SystemTime, SystemTime) + Send>>;

pub struct HeartbeatMessage {
    network_time: SystemTime,
    wall_time: SystemTime,
    out: Sender<Box<dyn OutputMessage>>,
    on_ack: AckHook,
    child_hook: Option<ChildHeartbeatHook>,
}

impl HeartbeatMessage {
    pub(crate) fn new(
        network_time: SystemTime,
        wall_time: SystemTime,
        out: Sender<Box<dyn OutputMessage>>,
        on_ack: AckHook,
        child_hook: Option<ChildHeartbeatHook>,
    ) -> Self {
        Self {
            network_time,
            wall_time,
            out,
            on_ack,
            child_hook,
        }
    }
}

impl Named for HeartbeatMessage {
    fn name(&self) -> &str {
        "internal::heartbeat"
    }
}

impl InputMessage for HeartbeatMessage {
    fn process(&mut self) -> bool {
        let processed_at = SystemTime::now();

        if let Some(hook) = &self.child_hook {
            let mut hook = hook.lock().unwrap_or_else(|p| p.into_inner());
            hook(self.network_time, self.wall_time);
        }

        let ack = HeartbeatAck {
            wall_time: self.wall_time,
            processed_at,
            on_ack: self.on_ack.clone(),
        };
        // Forced: a heartbeat ack is diagnostic data about the thread's own
        // responsiveness and should still reach the caller during shutdown drain.
        self.out.send(Box::new(ack), true);
        true
    }
}

struct HeartbeatAck {
    wall_time: SystemTime,
    processed_at: SystemTime,
    on_ack: AckHook,
}

impl Named for HeartbeatAck {
    fn name(&self) -> &str {
        "internal::heartbeat-ack"
    }
}

impl OutputMessage for HeartbeatAck {
    fn process(&mut self) -> bool {
        let mut hook = self.on_ack.lock().unwrap_or_else(|p| p.into_inner());
        hook(self.wall_time, self.processed_at);
        true
    }
}
