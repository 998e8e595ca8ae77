//! Verbose, developer-facing tracing, kept separate from [`Reporter`](super::reporter::Reporter)
//! so an application can silence one without silencing the other.

pub trait DebugLogger: Send + Sync {
    fn debug(&self, thread: &str, message: &str);
}

pub struct TracingDebugLogger;

impl DebugLogger for TracingDebugLogger {
    fn debug(&self, thread: &str, message: &str) {
        tracing::debug!(thread, "{}", message);
    }
}

/// Default for threads that don't opt into verbose logging.
pub struct NullDebugLogger;

impl DebugLogger for NullDebugLogger {
    fn debug(&self, _thread: &str, _message: &str) {}
}
