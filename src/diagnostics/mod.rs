pub mod debug_logger;
pub mod messages;
pub mod reporter;

pub use debug_logger::{DebugLogger, NullDebugLogger, TracingDebugLogger};
pub use messages::{DiagnosticLevel, DiagnosticMessage};
pub use reporter::{JsonReporter, Reporter, TracingReporter};
