pub mod basic_thread;
pub mod message;
pub mod msg_thread;
pub mod queue;
pub(crate) mod sender;

pub use basic_thread::{BasicThread, ThreadPhase};
pub use message::{input_fn, output_fn, InputMessage, Named, OutputMessage, TypedInputMessage, TypedOutputMessage};
pub use msg_thread::{MsgThread, MsgThreadBuilder, StopHook, ThreadStats};
pub use queue::{Queue, QueueStats};
