//! A synthetic data-source worker: generates a uniformly-distributed reading on its
//! own thread at a fixed interval and forwards it to a target worker's input queue.
//! Grounded in the teacher's simulated-signal input processor, minus the scheduling
//! machinery this crate doesn't carry (no async runtime, no stage graph).

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use crate::core::message::input_fn;
use crate::core::msg_thread::{MsgThread, MsgThreadBuilder};
use crate::manager::Manager;
use crate::workers::AccumulatorWorker;

pub struct SimulatedSensorWorker {
    thread: Arc<MsgThread>,
}

impl SimulatedSensorWorker {
    /// Spawns a worker that, once [`SimulatedSensorWorker::run`] is sent, generates
    /// `count` readings in `[min_value, max_value)` at `interval`, feeding each one
    /// into `target`.
    pub fn spawn(name: impl Into<String>, manager: &Arc<Manager>) -> Self {
        let thread = MsgThreadBuilder::new(name).build(manager);
        thread.start();
        Self { thread }
    }

    pub fn generate(&self, count: u32, min_value: f64, max_value: f64, interval: Duration, target: Arc<MsgThread>) {
        self.thread.send_in(
            input_fn("generate", move || {
                let mut rng = rand::rng();
                for _ in 0..count {
                    let value = rng.random_range(min_value..max_value);
                    let target = target.clone();
                    target.send_in(
                        input_fn("reading", move || {
                            tracing::trace!(value, "simulated reading delivered");
                            true
                        }),
                        false,
                    );
                    std::thread::sleep(interval);
                }
                true
            }),
            false,
        )
    }

    pub fn stop(&self) {
        self.thread.stop();
    }

    pub fn join(&self) -> std::thread::Result<()> {
        self.thread.join()
    }
}
