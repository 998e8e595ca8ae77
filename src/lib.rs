//! Bi-directional message-passing worker thread primitive.
//!
//! [`core::msg_thread::MsgThread`] pairs an OS thread with two batching queues — an
//! in-queue the owning (main) thread feeds and the child thread drains, and an
//! out-queue the child thread feeds and the main thread drains — so blocking work can
//! be offloaded without the main thread ever taking a lock to hand work off.

pub mod config;
pub mod core;
pub mod diagnostics;
pub mod heartbeat;
pub mod logging;
pub mod manager;
pub mod workers;

pub use crate::core::{InputMessage, MsgThread, MsgThreadBuilder, Named, OutputMessage, Queue, ThreadStats};
pub use crate::manager::{Manager, RegistryId};
