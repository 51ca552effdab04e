//! # statdeck-link
//!
//! The async half of the StatDeck device link layer, built on tokio.
//!
//! `statdeck-core` defines *what* a link does (framing, the connection state
//! machine, request correlation) as plain synchronous types.  This crate
//! runs those types against real I/O:
//!
//! - **`transport`** – How bytes get in and out: TCP connect and accept,
//!   the serial device file, and WebSocket connect and accept.  Every
//!   transport implements [`Transport`], which opens one session at a time.
//!
//! - **`link`** – [`spawn_link`] starts a task that owns one transport and
//!   one [`statdeck_core::ConnectionStateMachine`], reconnects with a fixed
//!   backoff, and reports [`LinkEvent`]s on a channel.  The returned
//!   [`LinkHandle`] sends messages and fails fast while disconnected.
//!
//! - **`correlator`** – [`Correlator::request`] sends a request and waits
//!   for the response of the matching type, with a timeout.
//!
//! - **`config`** / **`logging`** / **`clock`** – Shared plumbing for the
//!   role binaries: TOML config files, `tracing` setup, and time helpers
//!   that respect tokio's paused clock in tests.

pub mod clock;
pub mod config;
pub mod correlator;
pub mod link;
pub mod logging;
pub mod transport;

pub use config::{load_toml, save_toml, ConfigError};
pub use correlator::{Correlator, RequestError};
pub use link::{spawn_link, LinkConfig, LinkError, LinkEvent, LinkHandle, MessageSink};
pub use transport::{ChunkReader, ChunkWriter, Session, Transport};
