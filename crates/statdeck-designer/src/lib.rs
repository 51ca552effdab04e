//! statdeck-designer library crate.
//!
//! The designer is where layouts are authored.  This crate is its link to
//! the relay: push a layout, read it back, ask for status, and react to
//! taps coming back from the display.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! [statdeck-designer]
//!   ├── domain/           DesignerConfig, tile action resolution
//!   ├── application/      DesignerService (requests), DesignerRouter
//!   │                     (inbound events), ActionDispatcher
//!   └── infrastructure/   link task startup, log-only adapters
//!         ↕  NDJSON over TCP
//! Relay (127.0.0.1:5555)
//! ```
//!
//! # Usage (for beginners)
//!
//! ```ignore
//! let session = start_designer(&config, observer, runner);
//! session.service().wait_connected(Duration::from_secs(5)).await?;
//! session.service().send_config(layout).await?;
//! session.shutdown().await;
//! ```
//!
//! Requests are answered in the order the relay sends them, matched by
//! message type.  Only one request of each type may be outstanding.

/// Domain layer: config schema and action resolution.
pub mod domain;

/// Application layer: requests, inbound routing, action dispatch.
pub mod application;

/// Infrastructure layer: link startup and console adapters.
pub mod infrastructure;
