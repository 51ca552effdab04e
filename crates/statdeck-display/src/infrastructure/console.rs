//! Headless frontend adapters used by the binary.
//!
//! The touchscreen renderer is a separate program.  Without it, the
//! frontend role logs what it would render and reads touch events as text
//! lines from stdin.

use statdeck_core::{LayoutDocument, Payload};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::application::DisplayObserver;
use crate::domain::InputEvent;

/// [`DisplayObserver`] that writes everything to the log.
#[derive(Debug, Default)]
pub struct LogObserver;

impl DisplayObserver for LogObserver {
    fn on_config_received(&self, layout: &LayoutDocument) {
        match layout.validate() {
            Ok(summary) => info!(
                "render layout: {} page(s), {} tile(s)",
                summary.pages, summary.tiles
            ),
            Err(e) => warn!("received unusable layout: {e}"),
        }
    }

    fn on_stats_received(&self, data: &Payload, timestamp: u64) {
        debug!("stats @{timestamp}: {:?}", data);
    }

    fn on_connection_state_changed(&self, connected: bool) {
        if connected {
            info!("showing live telemetry");
        } else {
            info!("showing disconnected indicator");
        }
    }
}

/// Reads `press <tile>` / `release <tile>` / `cancel <tile>` lines from
/// stdin until EOF.
pub fn spawn_stdin_input() -> mpsc::UnboundedReceiver<InputEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    warn!("stdin: {e}");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<InputEvent>() {
                Ok(event) => {
                    if tx.send(event).is_err() {
                        break;
                    }
                }
                Err(e) => warn!("{e}"),
            }
        }
        debug!("stdin closed, no more touch input");
    });
    rx
}
