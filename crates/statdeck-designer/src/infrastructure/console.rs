//! Log-only observer and runner used by the command-line binary.
//!
//! Executing actions on the desktop belongs to the designer application;
//! the binary only reports what would run.

use statdeck_core::{ActionType, Payload};
use tracing::{debug, info};

use crate::application::{ActionRunner, DesignerObserver, RunError};
use crate::domain::ActionRequest;

#[derive(Debug, Default)]
pub struct LogObserver;

impl DesignerObserver for LogObserver {
    fn on_action_received(&self, tile_id: &str, action_type: ActionType) {
        info!("{action_type} on {tile_id}");
    }

    fn on_stats_received(&self, data: &Payload, timestamp: u64) {
        debug!("stats @{timestamp}: {} bytes", data.as_json().len());
    }

    fn on_connection_state_changed(&self, connected: bool) {
        info!(
            "relay {}",
            if connected { "connected" } else { "disconnected" }
        );
    }
}

#[derive(Debug, Default)]
pub struct LogRunner;

impl ActionRunner for LogRunner {
    fn run(&self, request: &ActionRequest) -> Result<(), RunError> {
        info!("would run {} with {}", request.kind, request.config);
        Ok(())
    }
}
