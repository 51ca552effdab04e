//! StatDeck designer link: entry point.
//!
//! # Usage
//!
//! ```text
//! statdeck-designer [OPTIONS] <COMMAND>
//!
//! Commands:
//!   push <LAYOUT>     Send a layout file to the display
//!   pull [--out F]    Print (or save) the layout the relay holds
//!   status            Print the relay's status report
//!   tune <MS>         Set the relay's stats period
//!   watch             Stay connected, log taps and dispatch their actions
//!
//! Options:
//!   --config <PATH>       TOML config file [default: designer.toml]
//!   --relay-addr <ADDR>   Relay designer socket
//!   --log-level <LEVEL>   Log level when RUST_LOG is unset
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use statdeck_core::LayoutDocument;
use tracing::{info, warn};

use statdeck_designer::domain::DesignerConfig;
use statdeck_designer::infrastructure::console::{LogObserver, LogRunner};
use statdeck_designer::infrastructure::{start_designer, DesignerSession};

// ── CLI argument definitions ──────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(
    name = "statdeck-designer",
    about = "Push layouts to a StatDeck display and react to its taps",
    version
)]
struct Cli {
    /// Path to the TOML config file.  A missing file means "all defaults".
    #[arg(long, default_value = "designer.toml", env = "STATDECK_DESIGNER_CONFIG")]
    config: PathBuf,

    #[arg(long, env = "STATDECK_RELAY_ADDR")]
    relay_addr: Option<SocketAddr>,

    /// Log level used when RUST_LOG is not set.
    #[arg(long, env = "STATDECK_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
enum Command {
    /// Validate a layout file and push it to the display.
    Push { layout: PathBuf },
    /// Read back the layout the relay holds.
    Pull {
        /// Write the layout here instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print the relay's status report.
    Status,
    /// Set how often the relay publishes stats, in milliseconds.
    Tune { stats_rate_ms: u64 },
    /// Stay connected and dispatch tile actions until Ctrl+C.
    Watch {
        /// Resolve actions against this layout until one is pulled.
        #[arg(long)]
        layout: Option<PathBuf>,
    },
}

impl Cli {
    fn into_parts(self) -> anyhow::Result<(DesignerConfig, Command)> {
        let mut config: DesignerConfig = statdeck_link::load_toml(&self.config)
            .with_context(|| format!("loading {}", self.config.display()))?;
        if let Some(addr) = self.relay_addr {
            config.relay_addr = addr;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        Ok((config, self.command))
    }
}

fn read_layout(path: &Path) -> anyhow::Result<LayoutDocument> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    LayoutDocument::from_json(text).with_context(|| format!("parsing {}", path.display()))
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (config, command) = Cli::parse().into_parts()?;
    statdeck_link::logging::init(&config.log_level);

    let session = start_designer(&config, Arc::new(LogObserver), Arc::new(LogRunner));
    let result = run(&session, &config, command).await;
    session.shutdown().await;
    result
}

async fn run(
    session: &DesignerSession,
    config: &DesignerConfig,
    command: Command,
) -> anyhow::Result<()> {
    let service = session.service();

    if let Command::Watch { layout: Some(path) } = &command {
        service.remember_layout(read_layout(path)?);
    }

    service
        .wait_connected(config.request_timeout())
        .await
        .with_context(|| format!("no relay at {}", config.relay_addr))?;

    match command {
        Command::Push { layout } => {
            let document = read_layout(&layout)?;
            service.send_config(document).await?;
            info!("{} pushed", layout.display());
        }
        Command::Pull { out } => {
            let layout = service.get_layout().await?;
            match out {
                Some(path) => std::fs::write(&path, layout.as_json())
                    .with_context(|| format!("writing {}", path.display()))?,
                None => println!("{}", layout.as_json()),
            }
        }
        Command::Status => {
            let report = service.get_status().await?;
            println!("{}", serde_json::to_string_pretty(report.fields())?);
        }
        Command::Tune { stats_rate_ms } => {
            let applied = service.update_tuning(stats_rate_ms).await?;
            info!("relay publishes stats every {applied} ms");
        }
        Command::Watch { .. } => {
            match service.get_layout().await {
                Ok(layout) => info!("using relay layout ({} tile(s))", layout.tile_count()),
                Err(e) => warn!("could not pull the current layout: {e}"),
            }
            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for Ctrl+C")?;
            info!("received Ctrl+C, shutting down");
        }
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
