//! The main-thread-visible side of a thread's diagnostic reports: info, warnings,
//! internal invariant violations, and the two flavours of fatal error a child thread
//! can raise.

/// A sink for a thread's diagnostic output. The default implementation forwards to
/// `tracing`; applications embedding this crate can supply their own (to a metrics
/// system, an alert pipeline, whatever fits).
pub trait Reporter: Send + Sync {
    fn info(&self, thread: &str, message: &str);
    fn warning(&self, thread: &str, message: &str);
    fn error(&self, thread: &str, message: &str);

    /// An internal invariant violation that does not on its own warrant aborting.
    /// The default implementation logs at warning level.
    fn internal_warning(&self, thread: &str, message: &str) {
        tracing::warn!(thread, message, "internal warning");
    }

    /// An internal invariant violation severe enough to warrant a core dump for
    /// postmortem debugging. The default implementation never returns.
    fn internal_error(&self, thread: &str, message: &str) -> ! {
        tracing::error!(thread, message, "internal error, aborting with core dump");
        std::process::abort();
    }

    /// A fatal, non-core-dumping error: logs and terminates the process with exit
    /// code 1. The default implementation never returns.
    fn fatal_error(&self, thread: &str, message: &str) -> ! {
        tracing::error!(thread, message, "fatal error, exiting");
        std::process::exit(1);
    }

    /// A fatal error severe enough to warrant a core dump for postmortem debugging.
    /// The default implementation never returns.
    fn fatal_error_with_core(&self, thread: &str, message: &str) -> ! {
        tracing::error!(thread, message, "fatal error, aborting with core dump");
        std::process::abort();
    }
}

pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn info(&self, thread: &str, message: &str) {
        tracing::info!(thread, "{}", message);
    }

    fn warning(&self, thread: &str, message: &str) {
        tracing::warn!(thread, "{}", message);
    }

    fn error(&self, thread: &str, message: &str) {
        tracing::error!(thread, "{}", message);
    }
}

#[derive(serde::Serialize)]
struct JsonReport<'a> {
    thread: &'a str,
    level: &'a str,
    message: &'a str,
}

/// Emits each report as a single JSON line on stdout, for diagnostic sinks that sit
/// behind a log aggregator expecting structured records rather than `tracing`'s
/// formatted output.
pub struct JsonReporter;

impl JsonReporter {
    fn emit(&self, thread: &str, level: &str, message: &str) {
        let report = JsonReport { thread, level, message };
        match serde_json::to_string(&report) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::warn!("failed to serialize diagnostic report: {e}"),
        }
    }
}

impl Reporter for JsonReporter {
    fn info(&self, thread: &str, message: &str) {
        self.emit(thread, "info", message);
    }

    fn warning(&self, thread: &str, message: &str) {
        self.emit(thread, "warning", message);
    }

    fn error(&self, thread: &str, message: &str) {
        self.emit(thread, "error", message);
    }
}
