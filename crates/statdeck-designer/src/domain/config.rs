//! Designer configuration.
//!
//! ```toml
//! relay_addr = "127.0.0.1:5555"
//! reconnect_ms = 3000
//! request_timeout_ms = 10000
//! ```

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use statdeck_core::protocol::DEFAULT_MAX_LINE_BYTES;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignerConfig {
    /// The relay's designer socket.
    #[serde(default = "default_relay_addr")]
    pub relay_addr: SocketAddr,
    /// Fixed delay between connection attempts.
    #[serde(default = "default_reconnect_ms")]
    pub reconnect_ms: u64,
    /// How long `config`, `get_layout` and `get_status` wait for an answer.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl DesignerConfig {
    pub fn reconnect(&self) -> Duration {
        Duration::from_millis(self.reconnect_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_relay_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, 5555))
}
fn default_reconnect_ms() -> u64 {
    3000
}
fn default_request_timeout_ms() -> u64 {
    10_000
}
fn default_max_line_bytes() -> usize {
    DEFAULT_MAX_LINE_BYTES
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DesignerConfig {
    fn default() -> Self {
        Self {
            relay_addr: default_relay_addr(),
            reconnect_ms: default_reconnect_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            max_line_bytes: default_max_line_bytes(),
            log_level: default_log_level(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
