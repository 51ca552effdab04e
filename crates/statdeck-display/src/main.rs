//! StatDeck display: entry point.
//!
//! Runs the display host, the touchscreen frontend link, or both in one
//! process (the usual deployment on the board).
//!
//! # Usage
//!
//! ```text
//! statdeck-display [OPTIONS]
//!
//! Options:
//!   --role <ROLE>               host | frontend | both [default: both]
//!   --config <PATH>             TOML config file [default: display.toml]
//!   --serial-device <PATH>      Serial gadget device towards the relay
//!   --push-listen-addr <ADDR>   Host push channel bind address
//!   --push-url <URL>            Frontend push channel URL
//!   --layout-path <PATH>        Persisted layout file
//!   --log-level <LEVEL>         Log level when RUST_LOG is unset
//! ```
//!
//! Without a renderer attached the frontend logs what it would draw and
//! reads `press <tile>` / `release <tile>` lines from stdin.

use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tokio::sync::watch;
use tracing::info;

use statdeck_display::domain::DisplayConfig;
use statdeck_display::infrastructure::console::{spawn_stdin_input, LogObserver};
use statdeck_display::infrastructure::{run_frontend, run_host};

// ── CLI argument definitions ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Role {
    Host,
    Frontend,
    Both,
}

#[derive(Debug, Parser)]
#[command(
    name = "statdeck-display",
    about = "StatDeck display host and touchscreen frontend",
    version
)]
struct Cli {
    /// Which side of the push channel to run.
    #[arg(long, value_enum, default_value_t = Role::Both, env = "STATDECK_DISPLAY_ROLE")]
    role: Role,

    /// Path to the TOML config file.  A missing file means "all defaults".
    #[arg(long, default_value = "display.toml", env = "STATDECK_DISPLAY_CONFIG")]
    config: PathBuf,

    #[arg(long, env = "STATDECK_SERIAL_DEVICE")]
    serial_device: Option<PathBuf>,

    #[arg(long, env = "STATDECK_PUSH_LISTEN_ADDR")]
    push_listen_addr: Option<SocketAddr>,

    #[arg(long, env = "STATDECK_PUSH_URL")]
    push_url: Option<String>,

    #[arg(long, env = "STATDECK_LAYOUT_PATH")]
    layout_path: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set.
    #[arg(long, env = "STATDECK_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Cli {
    fn into_display_config(self) -> anyhow::Result<(Role, DisplayConfig)> {
        let mut config: DisplayConfig = statdeck_link::load_toml(&self.config)
            .with_context(|| format!("loading {}", self.config.display()))?;
        if let Some(device) = self.serial_device {
            config.serial_device = device;
        }
        if let Some(addr) = self.push_listen_addr {
            config.push_listen_addr = addr;
        }
        if let Some(url) = self.push_url {
            config.push_url = url;
        }
        if let Some(path) = self.layout_path {
            config.layout_path = path;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        Ok((self.role, config))
    }
}

/// A future that resolves once `rx` has seen `true`.
fn stopped(mut rx: watch::Receiver<bool>) -> impl Future<Output = ()> {
    async move {
        // An Err means the sender is gone, which is also a stop.
        let _ = rx.wait_for(|stop| *stop).await;
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (role, config) = Cli::parse().into_display_config()?;
    statdeck_link::logging::init(&config.log_level);

    info!(
        "statdeck display starting as {:?}: serial {}, push {}",
        role,
        config.serial_device.display(),
        config.push_listen_addr
    );

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("received Ctrl+C, shutting down"),
            Err(e) => tracing::error!("failed to listen for Ctrl+C signal: {e}"),
        }
        stop_tx.send_replace(true);
    });

    match role {
        Role::Host => {
            run_host(&config, stopped(stop_rx))
                .await
                .context("display host failed to start")?;
        }
        Role::Frontend => {
            run_frontend(
                &config,
                Arc::new(LogObserver),
                spawn_stdin_input(),
                stopped(stop_rx),
            )
            .await;
        }
        Role::Both => {
            let host = run_host(&config, stopped(stop_rx.clone()));
            let frontend = run_frontend(
                &config,
                Arc::new(LogObserver),
                spawn_stdin_input(),
                stopped(stop_rx),
            );
            let (host_result, ()) = tokio::join!(host, frontend);
            host_result.context("display host failed to start")?;
        }
    }

    info!("statdeck display stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
