//! Relay configuration.
//!
//! Loaded from a TOML file (default `relay.toml`); every field is optional:
//!
//! ```toml
//! listen_addr = "127.0.0.1:5555"
//! serial_device = "/dev/ttyACM0"
//! serial_baud = 115200
//! serial_retry_ms = 5000
//! accept_retry_ms = 1000
//! max_line_bytes = 4194304
//! log_level = "info"
//! publish_stats = true
//! stats_interval_ms = 500
//! ```

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use statdeck_core::protocol::DEFAULT_MAX_LINE_BYTES;
use statdeck_link::transport::serial::DEFAULT_BAUD_RATE;

/// Stats interval used when none is configured or a tuning request names none.
pub const DEFAULT_STATS_INTERVAL_MS: u64 = 500;

/// Shortest stats interval the relay accepts.
pub const MIN_STATS_INTERVAL_MS: u64 = 100;

/// The publisher period for a requested interval, raised to the minimum.
pub fn stats_period(ms: u64) -> Duration {
    Duration::from_millis(ms.max(MIN_STATS_INTERVAL_MS))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Where the designer connects.  Loopback by default: the link carries
    /// no authentication.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
    /// The display host's USB serial device.
    #[serde(default = "default_serial_device")]
    pub serial_device: PathBuf,
    /// Ignored by USB ACM gadgets; needed for real UARTs.
    #[serde(default = "default_serial_baud")]
    pub serial_baud: u32,
    /// Fixed delay before reopening the serial device.
    #[serde(default = "default_serial_retry_ms")]
    pub serial_retry_ms: u64,
    /// Fixed delay before accepting again after a designer session ends.
    #[serde(default = "default_accept_retry_ms")]
    pub accept_retry_ms: u64,
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Sample this machine and send `stats` to the display.
    #[serde(default = "default_publish_stats")]
    pub publish_stats: bool,
    /// Starting stats period; `update_tuning` changes it at runtime.
    #[serde(default = "default_stats_interval_ms")]
    pub stats_interval_ms: u64,
}

impl RelayConfig {
    pub fn serial_retry(&self) -> Duration {
        Duration::from_millis(self.serial_retry_ms)
    }

    pub fn accept_retry(&self) -> Duration {
        Duration::from_millis(self.accept_retry_ms)
    }

    pub fn stats_interval(&self) -> Duration {
        stats_period(self.stats_interval_ms)
    }
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, 5555))
}
fn default_serial_device() -> PathBuf {
    PathBuf::from("/dev/ttyACM0")
}
fn default_serial_baud() -> u32 {
    DEFAULT_BAUD_RATE
}
fn default_serial_retry_ms() -> u64 {
    5000
}
fn default_accept_retry_ms() -> u64 {
    1000
}
fn default_max_line_bytes() -> usize {
    DEFAULT_MAX_LINE_BYTES
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_publish_stats() -> bool {
    true
}
fn default_stats_interval_ms() -> u64 {
    DEFAULT_STATS_INTERVAL_MS
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            serial_device: default_serial_device(),
            serial_baud: default_serial_baud(),
            serial_retry_ms: default_serial_retry_ms(),
            accept_retry_ms: default_accept_retry_ms(),
            max_line_bytes: default_max_line_bytes(),
            log_level: default_log_level(),
            publish_stats: default_publish_stats(),
            stats_interval_ms: default_stats_interval_ms(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
