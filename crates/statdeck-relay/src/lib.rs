//! statdeck-relay library crate.
//!
//! The relay runs on the desktop next to the designer.  It owns the physical
//! serial link to the display host and exposes a local TCP socket for the
//! designer, so the designer never touches the serial device directly.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Designer (NDJSON over TCP 127.0.0.1:5555)
//!         ↕
//! [statdeck-relay]
//!   ├── domain/           RelayConfig (TOML schema)
//!   ├── application/      RelayRouter: config validation, layout cache,
//!   │                     forwarding rules, status reporting
//!   └── infrastructure/   Link tasks for both sides and the event loop
//!         ↕
//! Display Host (NDJSON over USB serial, /dev/ttyACM0)
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O.
//! - `application` sees both links only through
//!   [`statdeck_link::MessageSink`], so every routing rule is tested with
//!   recording doubles.
//! - `infrastructure` spawns the link tasks and feeds their events to the
//!   router.

/// Domain layer: configuration schema.
pub mod domain;

/// Application layer: routing between the designer and the display.
pub mod application;

/// Infrastructure layer: link tasks and the relay event loop.
pub mod infrastructure;
