//! Configuration for the queues and threads this crate constructs.
//!
//! Values here only ever apply at construction time (a [`MsgThread`](crate::core::msg_thread::MsgThread)
//! doesn't re-read its config after it starts), so there's no hot-reload story — just
//! parse once, at startup, and hand the result to the relevant builder.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

/// Per-thread queue tuning. Mirrors the constructor knobs on
/// [`crate::core::queue::Queue`]; kept as a separate, `Deserialize`-able struct so it
/// can be loaded from TOML instead of hardcoded at every call site.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct QueueConfig {
    /// Local-buffer size at which a producer flushes to the shared staging queue.
    #[serde(default = "default_batch_threshold")]
    pub batch_threshold: usize,

    /// How long a consumer blocks on an empty queue before giving up and returning
    /// control to its caller, in milliseconds.
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,
}

impl QueueConfig {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            batch_threshold: default_batch_threshold(),
            poll_timeout_ms: default_poll_timeout_ms(),
        }
    }
}

fn default_batch_threshold() -> usize {
    crate::core::queue::DEFAULT_BATCH_THRESHOLD
}

fn default_poll_timeout_ms() -> u64 {
    crate::core::queue::DEFAULT_POLL_TIMEOUT.as_millis() as u64
}

/// Top-level configuration for a named worker thread.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct MsgThreadConfig {
    pub name: String,

    #[serde(default)]
    pub in_queue: QueueConfig,

    #[serde(default)]
    pub out_queue: QueueConfig,
}

/// A set of threads to bring up together, plus how often the manager should tick
/// heartbeats across all of them.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct ManagerConfig {
    #[serde(default)]
    pub threads: Vec<MsgThreadConfig>,

    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
}

impl ManagerConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            threads: Vec::new(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
        }
    }
}

fn default_heartbeat_interval_ms() -> u64 {
    1000
}

/// Loads a [`ManagerConfig`] from a TOML file on disk.
pub fn load_config<P: AsRef<Path>>(path: P) -> anyhow::Result<ManagerConfig> {
    let content = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("reading config file {}", path.as_ref().display()))?;
    load_config_from_string(&content)
}

/// Loads a [`ManagerConfig`] from a TOML string. Useful for tests and for
/// configuration sourced from somewhere other than the filesystem.
pub fn load_config_from_string(content: &str) -> anyhow::Result<ManagerConfig> {
    toml::from_str(content).context("parsing manager configuration")
}
