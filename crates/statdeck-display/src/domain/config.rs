//! Display configuration, shared by the host and frontend roles.
//!
//! ```toml
//! serial_device = "/dev/ttyGS0"
//! serial_baud = 115200
//! push_listen_addr = "127.0.0.1:3001"
//! push_url = "ws://127.0.0.1:3001"
//! layout_path = "layout.json"
//! watchdog_ms = 3000
//! long_press_ms = 800
//! cooldown_ms = 300
//! ```
//!
//! `cooldown_ms` protects the desktop side from action floods.  Slower
//! serial peers have needed values up to 1500.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use statdeck_core::protocol::DEFAULT_MAX_LINE_BYTES;
use statdeck_core::GestureConfig;
use statdeck_link::transport::serial::DEFAULT_BAUD_RATE;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayConfig {
    // Host
    #[serde(default = "default_serial_device")]
    pub serial_device: PathBuf,
    #[serde(default = "default_serial_baud")]
    pub serial_baud: u32,
    #[serde(default = "default_serial_retry_ms")]
    pub serial_retry_ms: u64,
    #[serde(default = "default_push_listen_addr")]
    pub push_listen_addr: SocketAddr,
    /// Delay before accepting the next frontend after one disconnects.
    #[serde(default = "default_accept_retry_ms")]
    pub accept_retry_ms: u64,
    #[serde(default = "default_layout_path")]
    pub layout_path: PathBuf,
    /// Period of the host's `status` report to the relay.
    #[serde(default = "default_status_interval_ms")]
    pub status_interval_ms: u64,

    // Frontend
    #[serde(default = "default_push_url")]
    pub push_url: String,
    #[serde(default = "default_push_retry_ms")]
    pub push_retry_ms: u64,
    #[serde(default = "default_long_press_ms")]
    pub long_press_ms: u64,
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,

    // Both
    /// Telemetry silence after which the PC is considered gone.
    #[serde(default = "default_watchdog_ms")]
    pub watchdog_ms: u64,
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl DisplayConfig {
    pub fn serial_retry(&self) -> Duration {
        Duration::from_millis(self.serial_retry_ms)
    }

    pub fn accept_retry(&self) -> Duration {
        Duration::from_millis(self.accept_retry_ms)
    }

    pub fn push_retry(&self) -> Duration {
        Duration::from_millis(self.push_retry_ms)
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_millis(self.status_interval_ms)
    }

    pub fn watchdog(&self) -> Duration {
        Duration::from_millis(self.watchdog_ms)
    }

    pub fn gesture(&self) -> GestureConfig {
        GestureConfig {
            long_press: Duration::from_millis(self.long_press_ms),
            cooldown: Duration::from_millis(self.cooldown_ms),
        }
    }
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_serial_device() -> PathBuf {
    PathBuf::from("/dev/ttyGS0")
}
fn default_serial_baud() -> u32 {
    DEFAULT_BAUD_RATE
}
fn default_serial_retry_ms() -> u64 {
    5000
}
fn default_push_listen_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, 3001))
}
fn default_accept_retry_ms() -> u64 {
    1000
}
fn default_layout_path() -> PathBuf {
    PathBuf::from("layout.json")
}
fn default_status_interval_ms() -> u64 {
    5000
}
fn default_push_url() -> String {
    "ws://127.0.0.1:3001".to_string()
}
fn default_push_retry_ms() -> u64 {
    3000
}
fn default_long_press_ms() -> u64 {
    800
}
fn default_cooldown_ms() -> u64 {
    300
}
fn default_watchdog_ms() -> u64 {
    3000
}
fn default_max_line_bytes() -> usize {
    DEFAULT_MAX_LINE_BYTES
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            serial_device: default_serial_device(),
            serial_baud: default_serial_baud(),
            serial_retry_ms: default_serial_retry_ms(),
            push_listen_addr: default_push_listen_addr(),
            accept_retry_ms: default_accept_retry_ms(),
            layout_path: default_layout_path(),
            status_interval_ms: default_status_interval_ms(),
            push_url: default_push_url(),
            push_retry_ms: default_push_retry_ms(),
            long_press_ms: default_long_press_ms(),
            cooldown_ms: default_cooldown_ms(),
            watchdog_ms: default_watchdog_ms(),
            max_line_bytes: default_max_line_bytes(),
            log_level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gesture_defaults() {
        let gesture = DisplayConfig::default().gesture();
        assert_eq!(gesture.long_press, Duration::from_millis(800));
        assert_eq!(gesture.cooldown, Duration::from_millis(300));
    }

    #[test]
    fn test_push_url_matches_listen_addr_by_default() {
        let cfg = DisplayConfig::default();
        assert_eq!(cfg.push_url, format!("ws://{}", cfg.push_listen_addr));
    }

    #[test]
    fn test_watchdog_default_is_three_seconds() {
        assert_eq!(DisplayConfig::default().watchdog(), Duration::from_secs(3));
    }

    #[test]
    fn test_serial_baud_defaults_to_115200() {
        assert_eq!(DisplayConfig::default().serial_baud, 115_200);
    }
}
