//! [`MsgThread`]: a [`BasicThread`] plus an in-queue and an out-queue, wired together
//! into the run loop described by the source design — block on the in-queue, process
//! one message, repeat until `process` signals stop or the thread is asked to
//! terminate, then drain what's left honoring the forced/non-forced rule, then exit.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use crate::diagnostics::debug_logger::{DebugLogger, NullDebugLogger};
use crate::diagnostics::messages::{DiagnosticLevel, DiagnosticMessage};
use crate::diagnostics::reporter::{Reporter, TracingReporter};
use crate::heartbeat::{AckHook, ChildHeartbeatHook, HeartbeatMessage};
use crate::manager::{Manager, RegistryId, ThreadRegistry};

use super::basic_thread::BasicThread;
use super::message::{Envelope, InputMessage, OutputMessage};
use super::queue::Queue;
use super::sender::Sender;

/// Point-in-time counters for a [`MsgThread`], exposed via [`MsgThread::stats`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadStats {
    pub sent_in: u64,
    pub sent_out: u64,
    pub dequeued_in: u64,
    pub dequeued_out: u64,
    pub pending_in: u64,
    pub pending_out: u64,
}

/// Child-side teardown hook, run once after the run loop has exited and the final
/// in-queue drain has completed, but before the terminal sentinel is sent and the OS
/// thread returns. The Rust stand-in for the source design's overridable `OnStop`.
pub type StopHook = Arc<dyn Fn() + Send + Sync>;

pub struct MsgThreadBuilder {
    name: String,
    batch_threshold: usize,
    poll_timeout: Duration,
    reporter: Arc<dyn Reporter>,
    debug_logger: Arc<dyn DebugLogger>,
    child_heartbeat_hook: Option<ChildHeartbeatHook>,
    on_stop: Option<StopHook>,
}

impl MsgThreadBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            batch_threshold: super::queue::DEFAULT_BATCH_THRESHOLD,
            poll_timeout: super::queue::DEFAULT_POLL_TIMEOUT,
            reporter: Arc::new(TracingReporter),
            debug_logger: Arc::new(NullDebugLogger),
            child_heartbeat_hook: None,
            on_stop: None,
        }
    }

    pub fn batch_threshold(mut self, n: usize) -> Self {
        self.batch_threshold = n;
        self
    }

    pub fn poll_timeout(mut self, d: Duration) -> Self {
        self.poll_timeout = d;
        self
    }

    pub fn reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn debug_logger(mut self, debug_logger: Arc<dyn DebugLogger>) -> Self {
        self.debug_logger = debug_logger;
        self
    }

    /// Sets the child-side heartbeat maintenance hook — the Rust stand-in for the
    /// source design's overridable `DoHeartbeat(network_time, current_time)`. Runs
    /// inline on the child thread every time a heartbeat reaches the front of the
    /// in-queue, before the ack is sent back to main.
    pub fn on_heartbeat(mut self, hook: ChildHeartbeatHook) -> Self {
        self.child_heartbeat_hook = Some(hook);
        self
    }

    /// Sets the child-side teardown hook, the Rust stand-in for the source design's
    /// overridable `OnStop`. Runs once, on the child thread, after the run loop exits
    /// and the final drain completes, before the thread returns.
    pub fn on_stop(mut self, hook: StopHook) -> Self {
        self.on_stop = Some(hook);
        self
    }

    /// Constructs the thread and registers it with `manager` before returning, using
    /// [`Arc::new_cyclic`] so the registry only ever holds a [`Weak`] reference to it —
    /// the manager must never be the thing keeping a `MsgThread` alive.
    pub fn build(self, manager: &Arc<Manager>) -> Arc<MsgThread> {
        let id = manager.next_id();
        let manager_for_ctor = manager.clone();

        Arc::new_cyclic(move |weak: &Weak<MsgThread>| {
            manager_for_ctor.register(id, weak.clone());

            MsgThread {
                basic: BasicThread::new(self.name),
                id,
                instance_id: uuid::Uuid::new_v4(),
                manager: Arc::downgrade(&manager_for_ctor),
                in_queue: Arc::new(Queue::with_config(self.batch_threshold, self.poll_timeout)),
                out_queue: Arc::new(Queue::with_config(self.batch_threshold, self.poll_timeout)),
                sent_in: Arc::new(AtomicU64::new(0)),
                sent_out: Arc::new(AtomicU64::new(0)),
                finished: std::sync::atomic::AtomicBool::new(false),
                reporter: self.reporter,
                debug_logger: self.debug_logger,
                child_heartbeat_hook: self.child_heartbeat_hook,
                on_stop: self.on_stop,
            }
        })
    }
}

pub struct MsgThread {
    basic: BasicThread,
    id: RegistryId,
    instance_id: uuid::Uuid,
    manager: Weak<Manager>,
    in_queue: Arc<Queue<Envelope<Box<dyn InputMessage>>>>,
    out_queue: Arc<Queue<Envelope<Box<dyn OutputMessage>>>>,
    sent_in: Arc<AtomicU64>,
    sent_out: Arc<AtomicU64>,
    finished: std::sync::atomic::AtomicBool,
    reporter: Arc<dyn Reporter>,
    debug_logger: Arc<dyn DebugLogger>,
    child_heartbeat_hook: Option<ChildHeartbeatHook>,
    on_stop: Option<StopHook>,
}

impl MsgThread {
    pub fn name(&self) -> &str {
        self.basic.name()
    }

    pub fn id(&self) -> RegistryId {
        self.id
    }

    /// Process-unique correlation id, stable for the lifetime of this thread. Useful
    /// for tying log lines together when several threads share the same `name`.
    pub fn instance_id(&self) -> uuid::Uuid {
        self.instance_id
    }

    pub fn terminating(&self) -> bool {
        self.basic.terminating()
    }

    pub fn finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    pub fn reporter(&self) -> &Arc<dyn Reporter> {
        &self.reporter
    }

    pub fn debug_logger(&self) -> &Arc<dyn DebugLogger> {
        &self.debug_logger
    }

    /// Enqueues a heartbeat round-trip carrying both `network_time` (the simulation's
    /// own clock) and `wall_time` (real time when main sent it). The child-side
    /// maintenance hook, if any, observes this exact pair (spec §4.2 `DoHeartbeat`);
    /// `on_ack` runs on whichever thread next calls [`MsgThread::retrieve_out`] with
    /// the `(wall_time, processed_at)` pair once the child thread gets to it.
    pub fn heartbeat_at(
        &self,
        network_time: std::time::SystemTime,
        wall_time: std::time::SystemTime,
        on_ack: AckHook,
    ) {
        let msg = HeartbeatMessage::new(
            network_time,
            wall_time,
            self.out_sender(),
            on_ack,
            self.child_heartbeat_hook.clone(),
        );
        self.send_in(msg, false);
    }

    /// Convenience for callers with no separate simulation clock: uses the current
    /// wall-clock time for both `network_time` and `wall_time`.
    pub fn heartbeat(&self, on_ack: AckHook) {
        let now = std::time::SystemTime::now();
        self.heartbeat_at(now, now, on_ack);
    }

    /// Child-thread-only. Constructs the matching [`DiagnosticMessage`] and sends it
    /// out for the main thread to dispatch to [`Reporter`]/[`DebugLogger`] — the
    /// child never calls those sinks directly (spec §4.2/§6), since they are not
    /// expected to be thread-safe. `FatalError`/`FatalErrorWithCore`/`InternalError`
    /// are sent forced: a thread that is already terminating must still surface why,
    /// since all three end the process on the main-thread side.
    fn diagnostic(&self, level: DiagnosticLevel, text: impl Into<String>) -> bool {
        let forced = matches!(
            level,
            DiagnosticLevel::FatalError
                | DiagnosticLevel::FatalErrorWithCore
                | DiagnosticLevel::InternalError
        );
        let msg = DiagnosticMessage::new(
            self.name().to_string(),
            level,
            text,
            self.reporter.clone(),
            self.debug_logger.clone(),
        );
        self.send_out(msg, forced)
    }

    /// Routine, informational diagnostic. Dispatches to [`Reporter::info`] on main.
    pub fn info(&self, text: impl Into<String>) -> bool {
        self.diagnostic(DiagnosticLevel::Info, text)
    }

    /// Recoverable-but-notable condition. Dispatches to [`Reporter::warning`] on main.
    pub fn warning(&self, text: impl Into<String>) -> bool {
        self.diagnostic(DiagnosticLevel::Warning, text)
    }

    /// Recoverable failure (spec §7 item 5): processing continues after this is
    /// reported. Dispatches to [`Reporter::error`] on main.
    pub fn error(&self, text: impl Into<String>) -> bool {
        self.diagnostic(DiagnosticLevel::Error, text)
    }

    /// Internal invariant violation that does not require aborting (spec §7 item 6).
    /// Dispatches to [`Reporter::internal_warning`] on main.
    pub fn internal_warning(&self, text: impl Into<String>) -> bool {
        self.diagnostic(DiagnosticLevel::InternalWarning, text)
    }

    /// Internal invariant violation severe enough to warrant a core dump (spec §7
    /// item 6). Dispatches to [`Reporter::internal_error`] on main, which aborts the
    /// process by default.
    pub fn internal_error(&self, text: impl Into<String>) -> bool {
        self.diagnostic(DiagnosticLevel::InternalError, text)
    }

    /// Unrecoverable failure. Once dispatched on main, [`Reporter::fatal_error`]
    /// terminates the process; implementations that call this should also return
    /// `false` from `process` so this thread's own run loop stops (Invariant M2).
    pub fn fatal_error(&self, text: impl Into<String>) -> bool {
        self.diagnostic(DiagnosticLevel::FatalError, text)
    }

    /// As [`MsgThread::fatal_error`], but dispatches to
    /// [`Reporter::fatal_error_with_core`], which aborts with a core dump instead of
    /// a clean exit.
    pub fn fatal_error_with_core(&self, text: impl Into<String>) -> bool {
        self.diagnostic(DiagnosticLevel::FatalErrorWithCore, text)
    }

    /// Debug-build-only verbose diagnostic. Compiles out entirely in release builds,
    /// matching the source design's debug-log-is-a-no-op-in-release convention.
    #[cfg(debug_assertions)]
    pub fn debug(&self, text: impl Into<String>) -> bool {
        self.diagnostic(DiagnosticLevel::Debug, text)
    }

    fn in_sender(&self) -> Sender<Box<dyn InputMessage>> {
        Sender::new(self.in_queue.clone(), self.basic.terminating_flag(), self.sent_in.clone())
    }

    pub(crate) fn out_sender(&self) -> Sender<Box<dyn OutputMessage>> {
        Sender::new(self.out_queue.clone(), self.basic.terminating_flag(), self.sent_out.clone())
    }

    /// Enqueues a message for the child thread to run. Dropped silently if the thread
    /// is terminating and `forced` is false (Invariant M1).
    pub fn send_in(&self, msg: impl InputMessage + 'static, forced: bool) -> bool {
        self.in_sender().send(Box::new(msg), forced)
    }

    /// Enqueues a message for the main thread to run via [`MsgThread::retrieve_out`].
    pub fn send_out(&self, msg: impl OutputMessage + 'static, forced: bool) -> bool {
        self.out_sender().send(Box::new(msg), forced)
    }

    /// Drains and runs up to `max` pending output messages on the calling (main)
    /// thread. Stops early if a message's `process` returns `false`. Returns the
    /// number of messages run.
    pub fn retrieve_out(&self, max: usize) -> usize {
        let mut n = 0;
        while n < max {
            match self.out_queue.get() {
                Some(envelope) => {
                    let mut msg = envelope.msg;
                    n += 1;
                    if !msg.process() {
                        break;
                    }
                }
                None => break,
            }
        }
        n
    }

    pub fn stats(&self) -> ThreadStats {
        let in_stats = self.in_queue.stats();
        let out_stats = self.out_queue.stats();
        ThreadStats {
            sent_in: self.sent_in.load(Ordering::Relaxed),
            sent_out: self.sent_out.load(Ordering::Relaxed),
            dequeued_in: in_stats.dequeued,
            dequeued_out: out_stats.dequeued,
            pending_in: in_stats.pending(),
            pending_out: out_stats.pending(),
        }
    }

    /// Spawns the OS thread running the default loop. May only be called once.
    pub fn start(self: &Arc<Self>) {
        let this = self.clone();
        self.basic.spawn(move || this.run_loop());
    }

    /// Requests termination. The thread will finish its current message, drain the
    /// in-queue honoring the forced/non-forced rule (Invariant M1), then exit.
    pub fn stop(&self) {
        self.basic.stop();
    }

    pub fn join(&self) -> std::thread::Result<()> {
        self.basic.join()
    }

    fn run_loop(self: Arc<Self>) {
        self.debug_logger.debug(self.name(), "run loop started");
        loop {
            match self.in_queue.get() {
                Some(envelope) => {
                    // Every dequeued message runs, forced or not: the terminating/
                    // non-forced drop rule applies only at send time (`Sender::send`)
                    // and to what's still queued after the loop exits (`drain_final`).
                    // A message that was already in the queue before `stop()` was
                    // called must still execute (spec §8 scenario 2; property P3) —
                    // the loop condition below ("terminating AND queue empty") is what
                    // ends the loop, not dropping what's already in flight.
                    let mut msg = envelope.msg;
                    if !msg.process() {
                        self.basic.stop();
                    }
                }
                None => {
                    if self.basic.terminating() {
                        break;
                    }
                }
            }
        }
        self.drain_final();
        if let Some(hook) = &self.on_stop {
            hook();
        }
        // Terminal sentinel: forced so it survives a racing drain, lets the manager
        // (or any caller retrieving output) observe that this thread has run its last
        // message and will not enqueue anything further.
        self.send_out(ShutdownSentinel, true);
        self.basic.mark_exited();
        self.finished.store(true, Ordering::Release);
        self.debug_logger.debug(self.name(), "run loop exited");
    }

    /// Runs every remaining message already in the in-queue. Forced messages always
    /// run; non-forced ones are dropped, since the thread is terminating by
    /// definition at this point (Invariant M1).
    fn drain_final(&self) {
        while let Some(envelope) = self.in_queue.get() {
            if !envelope.forced {
                continue;
            }
            let mut msg = envelope.msg;
            msg.process();
        }
    }
}

/// Enqueued once, forced, at the very end of the run loop so a caller draining the
/// out-queue (typically the manager) can observe that this thread has finished
/// cleanly, without having to poll [`MsgThread::finished`] separately.
struct ShutdownSentinel;

impl super::message::Named for ShutdownSentinel {
    fn name(&self) -> &str {
        "internal::shutdown-complete"
    }
}

impl OutputMessage for ShutdownSentinel {
    fn process(&mut self) -> bool {
        true
    }
}

impl Drop for MsgThread {
    fn drop(&mut self) {
        if let Some(manager) = self.manager.upgrade() {
            manager.unregister(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::{input_fn, output_fn};
    use std::sync::atomic::AtomicI64;
    use std::time::Duration as StdDuration;

    #[test]
    fn hundred_thousand_messages_sum_correctly() {
        let manager = Arc::new(Manager::new());
        let thread = MsgThreadBuilder::new("sum-worker").build(&manager);
        thread.start();

        let acc = Arc::new(AtomicI64::new(0));
        for i in 0..100_000i64 {
            let acc = acc.clone();
            thread.send_in(input_fn("add", move || {
                acc.fetch_add(i, Ordering::Relaxed);
                true
            }), false);
        }

        // Drain: send a sentinel that stops the loop once prior messages are spent.
        let done = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let done2 = done.clone();
        thread.send_in(input_fn("stop", move || {
            done2.store(true, Ordering::Release);
            false
        }), true);

        while !done.load(Ordering::Acquire) {
            std::thread::sleep(StdDuration::from_millis(5));
        }
        thread.join().unwrap();

        assert_eq!(acc.load(Ordering::SeqCst), 4_999_950_000);
    }

    #[test]
    fn stop_drops_non_forced_messages_sent_after_terminating() {
        let manager = Arc::new(Manager::new());
        let thread = MsgThreadBuilder::new("drop-worker").build(&manager);
        thread.start();
        thread.stop();
        // give the run loop a moment to observe terminating and exit
        std::thread::sleep(StdDuration::from_millis(100));

        let ran = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let ran2 = ran.clone();
        let accepted = thread.send_in(input_fn("late", move || {
            ran2.store(true, Ordering::Release);
            true
        }), false);

        thread.join().unwrap();
        assert!(!accepted);
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[test]
    fn forced_message_survives_final_drain() {
        let manager = Arc::new(Manager::new());
        let thread = MsgThreadBuilder::new("forced-worker").build(&manager);
        thread.start();
        thread.stop();

        let ran = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let ran2 = ran.clone();
        thread.send_in(input_fn("forced", move || {
            ran2.store(true, Ordering::Release);
            true
        }), true);

        thread.join().unwrap();
        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn retrieve_out_runs_pending_output_messages() {
        let manager = Arc::new(Manager::new());
        let thread = MsgThreadBuilder::new("out-worker").build(&manager);

        let seen = Arc::new(AtomicI64::new(0));
        for i in 0..5i64 {
            let seen = seen.clone();
            thread.send_out(output_fn("report", move || {
                seen.fetch_add(i, Ordering::Relaxed);
                true
            }), false);
        }

        let ran = thread.retrieve_out(10);
        assert_eq!(ran, 5);
        assert_eq!(seen.load(Ordering::SeqCst), 0 + 1 + 2 + 3 + 4);
    }

    #[test]
    fn stats_report_sent_and_pending_counts() {
        let manager = Arc::new(Manager::new());
        let thread = MsgThreadBuilder::new("stats-worker").build(&manager);
        thread.send_out(output_fn("noop", || true), false);
        thread.send_out(output_fn("noop", || true), false);
        thread.retrieve_out(1);

        let stats = thread.stats();
        assert_eq!(stats.sent_out, 2);
        assert_eq!(stats.dequeued_out, 1);
        assert_eq!(stats.pending_out, 1);
    }

    /// Boundary scenario: stop is requested only after all 1,000 sends complete, so
    /// terminating-drop never applies to any of them — every one must still run.
    #[test]
    fn shutdown_with_backlog_runs_every_message_sent_before_stop() {
        let manager = Arc::new(Manager::new());
        let thread = MsgThreadBuilder::new("backlog-worker").build(&manager);
        thread.start();

        let ran_count = Arc::new(AtomicI64::new(0));
        for _ in 0..1_000 {
            let ran_count = ran_count.clone();
            thread.send_in(input_fn("tick", move || {
                ran_count.fetch_add(1, Ordering::Relaxed);
                true
            }), false);
        }
        thread.stop();
        thread.join().unwrap();

        assert_eq!(ran_count.load(Ordering::SeqCst), 1_000);
    }

    /// Boundary scenario: terminating is set first, so every subsequent non-forced
    /// send is dropped without ever running, and none are reflected in sent stats.
    #[test]
    fn shutdown_races_send_drops_all_non_forced_attempts() {
        let manager = Arc::new(Manager::new());
        let thread = MsgThreadBuilder::new("race-worker").build(&manager);
        thread.start();
        thread.stop();
        std::thread::sleep(StdDuration::from_millis(100));

        let ran_count = Arc::new(AtomicI64::new(0));
        let mut accepted = 0;
        for _ in 0..10 {
            let ran_count = ran_count.clone();
            if thread.send_in(input_fn("late", move || {
                ran_count.fetch_add(1, Ordering::Relaxed);
                true
            }), false) {
                accepted += 1;
            }
        }

        thread.join().unwrap();
        assert_eq!(accepted, 0);
        assert_eq!(ran_count.load(Ordering::SeqCst), 0);
        assert_eq!(thread.stats().pending_in, 0);
    }

    /// Boundary scenario: Info/Warning/Info issued (conceptually) from the child must
    /// arrive at the main-side sink in the same order, each tagged with its own
    /// category.
    #[test]
    fn diagnostic_categories_arrive_in_issue_order() {
        use crate::diagnostics::reporter::Reporter;
        use std::sync::Mutex;

        struct RecordingReporter {
            log: Mutex<Vec<String>>,
        }
        impl Reporter for RecordingReporter {
            fn info(&self, _thread: &str, message: &str) {
                self.log.lock().unwrap().push(format!("info:{message}"));
            }
            fn warning(&self, _thread: &str, message: &str) {
                self.log.lock().unwrap().push(format!("warn:{message}"));
            }
            fn error(&self, _thread: &str, message: &str) {
                self.log.lock().unwrap().push(format!("error:{message}"));
            }
        }

        let manager = Arc::new(Manager::new());
        let reporter = Arc::new(RecordingReporter {
            log: Mutex::new(Vec::new()),
        });
        let thread = MsgThreadBuilder::new("diag-worker")
            .reporter(reporter.clone())
            .build(&manager);

        assert!(thread.info("a"));
        assert!(thread.warning("b"));
        assert!(thread.info("c"));

        let ran = thread.retrieve_out(10);
        assert_eq!(ran, 3);
        assert_eq!(
            reporter.log.lock().unwrap().as_slice(),
            ["info:a", "warn:b", "info:c"]
        );
    }

    #[test]
    fn fatal_error_is_sent_forced_even_while_terminating() {
        let manager = Arc::new(Manager::new());
        let thread = MsgThreadBuilder::new("fatal-worker").build(&manager);
        thread.start();
        thread.stop();
        std::thread::sleep(StdDuration::from_millis(100));

        // The run loop has already exited by now and enqueued its terminal sentinel;
        // drain it so it doesn't skew the count below.
        thread.retrieve_out(10);

        assert!(thread.fatal_error("boom"));
        assert_eq!(thread.retrieve_out(10), 1);

        thread.join().unwrap();
    }

    #[test]
    fn on_stop_hook_runs_once_and_sentinel_follows() {
        let manager = Arc::new(Manager::new());
        let teardown_ran = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let teardown_ran2 = teardown_ran.clone();
        let thread = MsgThreadBuilder::new("teardown-worker")
            .on_stop(Arc::new(move || {
                teardown_ran2.store(true, Ordering::Release);
            }))
            .build(&manager);
        thread.start();
        thread.stop();
        thread.join().unwrap();

        assert!(teardown_ran.load(Ordering::Acquire));
        // The sentinel is the only thing on the out-queue; retrieve_out must see it.
        assert_eq!(thread.retrieve_out(10), 1);
    }
}
