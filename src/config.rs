//! Configuration for BeingKV
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::time::Duration;

/// Largest UDP payload that fits in a single IPv4 datagram.
pub const MAX_UDP_PAYLOAD: usize = 65_507;

/// Main configuration for a BeingKV server instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Snapshot Configuration
    // -------------------------------------------------------------------------
    /// XML snapshot file loaded on startup and written on save/shutdown
    pub snapshot_path: PathBuf,

    /// Abort startup when the snapshot file is missing or unreadable
    pub require_snapshot: bool,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// UDP listen address
    pub listen_addr: String,

    /// Largest datagram accepted or produced (bytes); longer messages are
    /// split into fragments of this size
    pub max_datagram_size: usize,

    /// How many times a send that would block is retried before dropping
    pub send_retries: u32,

    /// Upper bound on how long the I/O loop sleeps in one poll (milliseconds)
    pub poll_interval_ms: u64,

    /// How long the fragments of an incomplete request are kept (milliseconds)
    pub reassembly_timeout_ms: u64,

    /// Incomplete multi-fragment requests held at once
    pub max_pending_messages: usize,

    // -------------------------------------------------------------------------
    // Worker Pool Configuration
    // -------------------------------------------------------------------------
    /// Threads decoding and executing requests
    pub read_workers: usize,

    /// Threads sending responses
    pub write_workers: usize,

    /// Pending jobs each pool accepts before applying backpressure
    pub queue_capacity: usize,

    /// Bound on waiting for the store lock, and the slow-task warning threshold
    /// (milliseconds)
    pub task_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from("./humanbeings.xml"),
            require_snapshot: false,
            listen_addr: "127.0.0.1:1448".to_string(),
            max_datagram_size: MAX_UDP_PAYLOAD,
            send_retries: 16,
            poll_interval_ms: 100,
            reassembly_timeout_ms: 10_000,
            max_pending_messages: 1024,
            read_workers: 4,
            write_workers: 2,
            queue_capacity: 256,
            task_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub fn task_timeout(&self) -> Duration {
        Duration::from_millis(self.task_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn reassembly_timeout(&self) -> Duration {
        Duration::from_millis(self.reassembly_timeout_ms)
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        if self.read_workers == 0 || self.write_workers == 0 {
            return Err(crate::BeingError::Config(
                "worker pools need at least one thread".to_string(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(crate::BeingError::Config(
                "queue capacity must be positive".to_string(),
            ));
        }
        if self.max_pending_messages == 0 {
            return Err(crate::BeingError::Config(
                "max pending messages must be positive".to_string(),
            ));
        }
        if self.max_datagram_size < 64 || self.max_datagram_size > MAX_UDP_PAYLOAD {
            return Err(crate::BeingError::Config(format!(
                "max datagram size must be within 64..={} bytes",
                MAX_UDP_PAYLOAD
            )));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the snapshot file path
    pub fn snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.snapshot_path = path.into();
        self
    }

    /// Make a missing snapshot file fatal at startup
    pub fn require_snapshot(mut self, required: bool) -> Self {
        self.config.require_snapshot = required;
        self
    }

    /// Set the UDP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the largest datagram size (in bytes)
    pub fn max_datagram_size(mut self, size: usize) -> Self {
        self.config.max_datagram_size = size;
        self
    }

    pub fn send_retries(mut self, retries: u32) -> Self {
        self.config.send_retries = retries;
        self
    }

    /// Set the poll interval (in milliseconds)
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    /// Set how long incomplete requests are kept (in milliseconds)
    pub fn reassembly_timeout_ms(mut self, ms: u64) -> Self {
        self.config.reassembly_timeout_ms = ms;
        self
    }

    pub fn max_pending_messages(mut self, count: usize) -> Self {
        self.config.max_pending_messages = count;
        self
    }

    /// Set the number of request workers
    pub fn read_workers(mut self, count: usize) -> Self {
        self.config.read_workers = count;
        self
    }

    /// Set the number of response workers
    pub fn write_workers(mut self, count: usize) -> Self {
        self.config.write_workers = count;
        self
    }

    /// Set the per-pool queue capacity
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    /// Set the task timeout (in milliseconds)
    pub fn task_timeout_ms(mut self, ms: u64) -> Self {
        self.config.task_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
