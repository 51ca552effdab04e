//! Infrastructure layer for statdeck-relay.
//!
//! Opens the designer listener and the serial device, spawns one link task
//! for each, and pumps their events into the [`crate::application::RelayRouter`].
//! Host telemetry for the stats publisher is read here too.

pub mod relay_loop;
pub mod system_stats;

pub use relay_loop::{run_relay, run_relay_with, RelayError};
pub use system_stats::SystemStats;
