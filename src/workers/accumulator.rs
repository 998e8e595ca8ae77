//! A minimal worker that runs a running sum on the child thread and reports it back
//! on request. Exists mainly as a load-bearing demonstration of [`MsgThread`]'s
//! throughput under rapid, small messages.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::core::message::{input_fn, output_fn};
use crate::core::msg_thread::{MsgThread, MsgThreadBuilder};
use crate::manager::Manager;

pub struct AccumulatorWorker {
    thread: Arc<MsgThread>,
    total: Arc<std::sync::atomic::AtomicI64>,
}

impl AccumulatorWorker {
    pub fn spawn(name: impl Into<String>, manager: &Arc<Manager>) -> Self {
        let thread = MsgThreadBuilder::new(name).build(manager);
        thread.start();
        Self {
            thread,
            total: Arc::new(std::sync::atomic::AtomicI64::new(0)),
        }
    }

    /// Adds `value` to the running total. Non-forced: dropped if the worker is
    /// already shutting down.
    pub fn add(&self, value: i64) -> bool {
        let total = self.total.clone();
        self.thread.send_in(
            input_fn("accumulate", move || {
                total.fetch_add(value, Ordering::Relaxed);
                true
            }),
            false,
        )
    }

    /// Asks the worker to report its current total back through the out-queue.
    /// Retrieve the value with [`AccumulatorWorker::retrieve_report`].
    pub fn request_report(&self) -> bool {
        let total = self.total.clone();
        self.thread.send_in(
            input_fn("request-report", move || {
                let snapshot = total.load(Ordering::Relaxed);
                tracing::debug!(snapshot, "accumulator report requested");
                true
            }),
            false,
        )
    }

    pub fn retrieve_report(&self) -> usize {
        self.thread.retrieve_out(16)
    }

    /// Current total, read directly without going through the message queue. Useful
    /// for tests; production callers should prefer the request/report round trip so
    /// the read is ordered with respect to in-flight `add` calls.
    pub fn snapshot(&self) -> i64 {
        self.total.load(Ordering::Relaxed)
    }

    pub fn report_via_output(&self) {
        let total = self.total.clone();
        self.thread.send_out(
            output_fn("report", move || {
                tracing::info!(total = total.load(Ordering::Relaxed), "accumulator total");
                true
            }),
            false,
        );
    }

    pub fn stop(&self) {
        self.thread.stop();
    }

    pub fn join(&self) -> std::thread::Result<()> {
        self.thread.join()
    }

    pub fn thread(&self) -> &Arc<MsgThread> {
        &self.thread
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn sums_one_hundred_thousand_rapid_messages() {
        let manager = Arc::new(Manager::new());
        let worker = AccumulatorWorker::spawn("accumulator", &manager);

        for i in 0..100_000i64 {
            worker.add(i);
        }

        let total = worker.total.clone();
        let done = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let done2 = done.clone();
        worker.thread.send_in(
            crate::core::message::input_fn("barrier", move || {
                let _ = total.load(Ordering::Relaxed);
                done2.store(true, Ordering::Release);
                true
            }),
            false,
        );

        while !done.load(Ordering::Acquire) {
            std::thread::sleep(Duration::from_millis(5));
        }

        worker.stop();
        worker.join().unwrap();
        assert_eq!(worker.snapshot(), 4_999_950_000);
    }
}
