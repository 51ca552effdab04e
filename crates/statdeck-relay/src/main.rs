//! StatDeck relay: entry point.
//!
//! Bridges the designer's local TCP socket to the display host's USB serial
//! link.
//!
//! # Usage
//!
//! ```text
//! statdeck-relay [OPTIONS]
//!
//! Options:
//!   --config <PATH>          TOML config file [default: relay.toml]
//!   --listen-addr <ADDR>     Designer socket address
//!   --serial-device <PATH>   Display serial device
//!   --serial-baud <BAUD>     Serial baud rate
//!   --stats-interval-ms <MS> Stats publishing period
//!   --log-level <LEVEL>      Log level when RUST_LOG is unset
//! ```
//!
//! Precedence is CLI argument, then environment variable, then the config
//! file, then built-in defaults.
//!
//! | Variable | Overrides |
//! |---|---|
//! | `STATDECK_RELAY_CONFIG` | `--config` |
//! | `STATDECK_LISTEN_ADDR` | `listen_addr` |
//! | `STATDECK_SERIAL_DEVICE` | `serial_device` |
//! | `STATDECK_SERIAL_BAUD` | `serial_baud` |
//! | `STATDECK_STATS_INTERVAL_MS` | `stats_interval_ms` |
//! | `STATDECK_LOG_LEVEL` | `log_level` |

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use statdeck_relay::domain::RelayConfig;
use statdeck_relay::infrastructure::run_relay;

// ── CLI argument definitions ──────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(
    name = "statdeck-relay",
    about = "Relay between the StatDeck designer and the display's serial link",
    version
)]
struct Cli {
    /// Path to the TOML config file.  A missing file means "all defaults".
    #[arg(long, default_value = "relay.toml", env = "STATDECK_RELAY_CONFIG")]
    config: PathBuf,

    /// Address the designer connects to.
    #[arg(long, env = "STATDECK_LISTEN_ADDR")]
    listen_addr: Option<SocketAddr>,

    /// Serial device of the display host, e.g. /dev/ttyACM0.
    #[arg(long, env = "STATDECK_SERIAL_DEVICE")]
    serial_device: Option<PathBuf>,

    #[arg(long, env = "STATDECK_SERIAL_BAUD")]
    serial_baud: Option<u32>,

    /// How often to send a stats sample to the display, in milliseconds.
    #[arg(long, env = "STATDECK_STATS_INTERVAL_MS")]
    stats_interval_ms: Option<u64>,

    /// Log level used when RUST_LOG is not set.
    #[arg(long, env = "STATDECK_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Cli {
    /// Loads the config file and applies the CLI overrides on top.
    fn into_relay_config(self) -> anyhow::Result<RelayConfig> {
        let mut config: RelayConfig = statdeck_link::load_toml(&self.config)
            .with_context(|| format!("loading {}", self.config.display()))?;
        if let Some(addr) = self.listen_addr {
            config.listen_addr = addr;
        }
        if let Some(device) = self.serial_device {
            config.serial_device = device;
        }
        if let Some(baud) = self.serial_baud {
            config.serial_baud = baud;
        }
        if let Some(ms) = self.stats_interval_ms {
            config.stats_interval_ms = ms;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_relay_config()?;
    statdeck_link::logging::init(&config.log_level);

    info!(
        "statdeck relay starting: designer socket {}, serial {}",
        config.listen_addr,
        config.serial_device.display()
    );

    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("received Ctrl+C, shutting down"),
            Err(e) => tracing::error!("failed to listen for Ctrl+C signal: {e}"),
        }
    };
    run_relay(&config, shutdown)
        .await
        .context("relay failed to start")?;

    info!("statdeck relay stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
