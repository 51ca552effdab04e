//! statdeck-display library crate.
//!
//! The display is a small embedded board with a touchscreen.  Two roles run
//! on it, usually in the same process:
//!
//! ```text
//! Relay (desktop) ──USB serial── Display Host ──WebSocket── Display Frontend
//!                                 /dev/ttyGS0    :3001        touchscreen UI
//! ```
//!
//! - The **host** keeps the layout on disk, forwards telemetry to the
//!   frontend, and watches for the telemetry stream going silent.
//! - The **frontend** shows what the host pushes and turns touches into
//!   tap / long-press actions, rate-limited so the serial peer is never
//!   flooded.
//!
//! # Architecture (clean architecture)
//!
//! - `domain/`: config schema and touch input events.
//! - `application/`: `HostRouter`, `FrontendController`, and the
//!   `LayoutStore` / `DisplayObserver` seams.
//! - `infrastructure/`: layout file, event loops, headless adapters.

/// Domain layer: config and input types (no I/O).
pub mod domain;

/// Application layer: host and frontend rules.
pub mod application;

/// Infrastructure layer: files, link tasks, event loops.
pub mod infrastructure;
