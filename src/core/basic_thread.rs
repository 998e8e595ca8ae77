//! OS-thread lifecycle wrapper: naming, the terminating latch, and join handling.
//! [`MsgThread`](crate::core::msg_thread::MsgThread) composes this rather than
//! inheriting from it (Rust has no inheritance); the terminating flag it owns is
//! shared with the queues and the run loop via `Arc`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

/// Lifecycle phase of a [`BasicThread`]. Transitions are strictly monotonic:
/// `Created` → `Running` → `Terminating` → `Joined`. Re-entry is prohibited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadPhase {
    Created,
    Running,
    Terminating,
    Joined,
}

pub struct BasicThread {
    name: String,
    terminating: Arc<AtomicBool>,
    phase: Mutex<ThreadPhase>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl BasicThread {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            terminating: Arc::new(AtomicBool::new(false)),
            phase: Mutex::new(ThreadPhase::Created),
            handle: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phase(&self) -> ThreadPhase {
        *self.phase.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Lock-free flag read, acquire-ordered against [`BasicThread::stop`]'s release.
    pub fn terminating(&self) -> bool {
        self.terminating.load(Ordering::Acquire)
    }

    pub(crate) fn terminating_flag(&self) -> Arc<AtomicBool> {
        self.terminating.clone()
    }

    /// Spawns the OS thread running `f`, named via `std::thread::Builder` so the name
    /// shows up in debuggers and panic messages. Transitions `Created` → `Running`.
    /// Panics if the thread has already been started.
    pub(crate) fn spawn<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut phase = self.phase.lock().unwrap_or_else(|p| p.into_inner());
        assert_eq!(
            *phase,
            ThreadPhase::Created,
            "BasicThread '{}' already started",
            self.name
        );

        let handle = std::thread::Builder::new()
            .name(self.name.clone())
            .spawn(f)
            .expect("failed to spawn OS thread");

        *self.handle.lock().unwrap_or_else(|p| p.into_inner()) = Some(handle);
        *phase = ThreadPhase::Running;
    }

    /// Sets the terminating latch. One-way: once set, it is never cleared. Safe to
    /// call multiple times or from a state that has already stopped.
    pub fn stop(&self) {
        self.terminating.store(true, Ordering::Release);
        let mut phase = self.phase.lock().unwrap_or_else(|p| p.into_inner());
        if *phase == ThreadPhase::Running {
            *phase = ThreadPhase::Terminating;
        }
    }

    /// Marks the run loop as exited (but not yet joined). Called by the child thread
    /// itself just before it returns, after `OnStop` has run.
    pub(crate) fn mark_exited(&self) {
        let mut phase = self.phase.lock().unwrap_or_else(|p| p.into_inner());
        *phase = ThreadPhase::Terminating;
    }

    /// Blocks until the OS thread has returned. Transitions to `Joined`. Safe to call
    /// more than once; the second call is a no-op returning `Ok(())`.
    pub fn join(&self) -> std::thread::Result<()> {
        let handle = self.handle.lock().unwrap_or_else(|p| p.into_inner()).take();
        let result = match handle {
            Some(h) => h.join(),
            None => Ok(()),
        };
        *self.phase.lock().unwrap_or_else(|p| p.into_inner()) = ThreadPhase::Joined;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    #[test]
    fn lifecycle_transitions_monotonically() {
        let bt = Arc::new(BasicThread::new("test-thread"));
        assert_eq!(bt.phase(), ThreadPhase::Created);

        let counter = Arc::new(AtomicU32::new(0));
        let bt2 = bt.clone();
        let counter2 = counter.clone();
        bt.spawn(move || {
            while !bt2.terminating() {
                std::thread::sleep(Duration::from_millis(5));
            }
            counter2.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(bt.phase(), ThreadPhase::Running);
        bt.stop();
        assert!(bt.terminating());
        bt.join().unwrap();
        assert_eq!(bt.phase(), ThreadPhase::Joined);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    #[should_panic(expected = "already started")]
    fn spawn_twice_panics() {
        let bt = BasicThread::new("double-spawn");
        bt.spawn(|| {});
        bt.spawn(|| {});
    }
}
