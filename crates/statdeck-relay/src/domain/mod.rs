//! Domain layer for statdeck-relay.
//!
//! Only the configuration schema lives here; the message types come from
//! `statdeck-core`.

pub mod config;

pub use config::RelayConfig;
