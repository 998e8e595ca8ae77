//! The diagnostic message a child thread sends back to the main thread so reporting
//! always happens through the main thread's [`Reporter`], never directly from the
//! child (keeping all diagnostic output serialized through one place, same as
//! ordinary output messages).

use std::sync::Arc;

use super::debug_logger::DebugLogger;
use super::reporter::Reporter;
use crate::core::message::Named;
use crate::core::message::OutputMessage;

/// Severity of a [`DiagnosticMessage`]. `Debug` only exists in debug builds, matching
/// the source design's `DBG_LOG`-is-a-no-op-in-release convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Info,
    Warning,
    Error,
    InternalWarning,
    InternalError,
    FatalError,
    FatalErrorWithCore,
    #[cfg(debug_assertions)]
    Debug,
}

pub struct DiagnosticMessage {
    thread_name: String,
    level: DiagnosticLevel,
    text: String,
    reporter: Arc<dyn Reporter>,
    debug_logger: Arc<dyn DebugLogger>,
}

impl DiagnosticMessage {
    pub fn new(
        thread_name: impl Into<String>,
        level: DiagnosticLevel,
        text: impl Into<String>,
        reporter: Arc<dyn Reporter>,
        debug_logger: Arc<dyn DebugLogger>,
    ) -> Self {
        Self {
            thread_name: thread_name.into(),
            level,
            text: text.into(),
            reporter,
            debug_logger,
        }
    }
}

impl Named for DiagnosticMessage {
    fn name(&self) -> &str {
        "internal::diagnostic"
    }
}

impl OutputMessage for DiagnosticMessage {
    fn process(&mut self) -> bool {
        match self.level {
            DiagnosticLevel::Info => self.reporter.info(&self.thread_name, &self.text),
            DiagnosticLevel::Warning => self.reporter.warning(&self.thread_name, &self.text),
            DiagnosticLevel::Error => self.reporter.error(&self.thread_name, &self.text),
            DiagnosticLevel::InternalWarning => {
                self.reporter.internal_warning(&self.thread_name, &self.text)
            }
            DiagnosticLevel::InternalError => {
                self.reporter.internal_error(&self.thread_name, &self.text)
            }
            DiagnosticLevel::FatalError => self.reporter.fatal_error(&self.thread_name, &self.text),
            DiagnosticLevel::FatalErrorWithCore => {
                self.reporter.fatal_error_with_core(&self.thread_name, &self.text)
            }
            #[cfg(debug_assertions)]
            DiagnosticLevel::Debug => self.debug_logger.debug(&self.thread_name, &self.text),
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::debug_logger::NullDebugLogger;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct RecordingReporter {
        infos: Mutex<Vec<String>>,
        warnings: AtomicUsize,
        errors: AtomicUsize,
        internal_warnings: AtomicUsize,
        log: Mutex<Vec<String>>,
    }

    impl RecordingReporter {
        fn new() -> Self {
            Self {
                infos: Mutex::new(Vec::new()),
                warnings: AtomicUsize::new(0),
                errors: AtomicUsize::new(0),
                internal_warnings: AtomicUsize::new(0),
                log: Mutex::new(Vec::new()),
            }
        }
    }

    impl Reporter for RecordingReporter {
        fn info(&self, _thread: &str, message: &str) {
            self.infos.lock().unwrap().push(message.to_string());
            self.log.lock().unwrap().push(format!("info:{message}"));
        }
        fn warning(&self, _thread: &str, message: &str) {
            self.warnings.fetch_add(1, Ordering::SeqCst);
            self.log.lock().unwrap().push(format!("warn:{message}"));
        }
        fn error(&self, _thread: &str, message: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
            self.log.lock().unwrap().push(format!("error:{message}"));
        }
        fn internal_warning(&self, _thread: &str, message: &str) {
            self.internal_warnings.fetch_add(1, Ordering::SeqCst);
            self.log.lock().unwrap().push(format!("internal_warn:{message}"));
        }

        // Overridden so the boundary test can observe the core-dump path without
        // actually aborting the test process.
        fn internal_error(&self, thread: &str, message: &str) -> ! {
            self.log.lock().unwrap().push(format!("internal_error:{thread}: {message}"));
            panic!("internal_error reached (test override, not a real abort)");
        }

        // Overridden so the boundary test can observe the fatal path without
        // actually terminating the test process.
        fn fatal_error(&self, thread: &str, message: &str) -> ! {
            self.log.lock().unwrap().push(format!("fatal:{thread}: {message}"));
            panic!("fatal_error reached (test override, not a real abort)");
        }
    }

    #[test]
    fn ordinary_levels_route_to_matching_reporter_method() {
        let reporter = Arc::new(RecordingReporter::new());
        let logger: Arc<dyn DebugLogger> = Arc::new(NullDebugLogger);

        let mut info = DiagnosticMessage::new(
            "worker",
            DiagnosticLevel::Info,
            "starting up",
            reporter.clone() as Arc<dyn Reporter>,
            logger.clone(),
        );
        assert!(info.process());
        assert_eq!(reporter.infos.lock().unwrap().as_slice(), ["starting up"]);

        let mut warn = DiagnosticMessage::new(
            "worker",
            DiagnosticLevel::Warning,
            "slow queue",
            reporter.clone() as Arc<dyn Reporter>,
            logger.clone(),
        );
        assert!(warn.process());
        assert_eq!(reporter.warnings.load(Ordering::SeqCst), 1);

        let mut err = DiagnosticMessage::new(
            "worker",
            DiagnosticLevel::Error,
            "write failed",
            reporter.clone() as Arc<dyn Reporter>,
            logger.clone(),
        );
        assert!(err.process());
        assert_eq!(reporter.errors.load(Ordering::SeqCst), 1);

        let mut internal_warn = DiagnosticMessage::new(
            "worker",
            DiagnosticLevel::InternalWarning,
            "cache drifted",
            reporter as Arc<dyn Reporter>,
            logger,
        );
        assert!(internal_warn.process());
        assert_eq!(reporter.internal_warnings.load(Ordering::SeqCst), 1);
    }

    #[test]
    #[should_panic(expected = "internal_error reached")]
    fn internal_error_level_routes_to_reporters_internal_error() {
        let reporter = Arc::new(RecordingReporter::new());
        let logger: Arc<dyn DebugLogger> = Arc::new(NullDebugLogger);
        let mut msg = DiagnosticMessage::new(
            "worker",
            DiagnosticLevel::InternalError,
            "invariant broken",
            reporter as Arc<dyn Reporter>,
            logger,
        );
        msg.process();
    }
}
