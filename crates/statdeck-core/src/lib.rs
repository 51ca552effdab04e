//! # statdeck-core
//!
//! Shared library for StatDeck containing the line-delimited JSON wire
//! protocol, the layout document type, and the pure state machines that make
//! up the device link layer.
//!
//! This crate is used by the relay, the display host/frontend, and the
//! designer.  It has no dependencies on sockets, serial ports, or an async
//! runtime: every state machine takes the current time as an argument, so
//! the timing rules can be tested without sleeping.
//!
//! # Architecture overview
//!
//! StatDeck drives a small touchscreen "stat deck".  A desktop designer
//! pushes a tile layout through a relay process, over a serial link, to a
//! display host, which renders live telemetry and sends taps back upstream.
//! Every hop speaks the same format: one JSON object per line.
//!
//! - **`protocol`** – The [`Message`] type, the single-line codec, and the
//!   streaming [`LineDecoder`] that turns arbitrary byte chunks into
//!   messages while isolating corrupt lines.
//!
//! - **`domain`** – The [`LayoutDocument`] payload.  The link layer carries
//!   it verbatim; it only checks the page/tile skeleton and tile id
//!   uniqueness.
//!
//! - **`link`** – The per-link [`ConnectionStateMachine`] and the
//!   type-keyed [`PendingTable`] used to correlate requests with responses.
//!
//! - **`gesture`** – Tap / long-press classification with a global
//!   [`FloodGate`] protecting the slow embedded peer.
//!
//! - **`watchdog`** – Liveness detection for the telemetry stream,
//!   independent of transport-level disconnects.

pub mod domain;
pub mod gesture;
pub mod link;
pub mod protocol;
pub mod watchdog;

// Re-export the most-used types at the crate root so callers can write
// `statdeck_core::Message` instead of `statdeck_core::protocol::messages::Message`.
pub use domain::layout::{LayoutDocument, LayoutError, LayoutSummary};
pub use gesture::{FloodGate, Gesture, GestureConfig, GestureDetector, PressOutcome};
pub use link::connection::{ConnectionState, ConnectionStateMachine, StateError, Transition};
pub use link::correlation::{CorrelationError, PendingRequest, PendingTable};
pub use protocol::codec::{decode_message, encode_message, DecodeError, EncodeError};
pub use protocol::framing::LineDecoder;
pub use protocol::messages::{
    ActionType, Extras, Message, MessageKind, Payload, StatusReport, TileAction,
};
pub use watchdog::Watchdog;
