//! Application layer for statdeck-display.
//!
//! # Responsibilities
//!
//! - [`HostRouter`]: serial ↔ push-channel rules on the display host,
//!   including layout persistence and the telemetry watchdog.
//! - [`FrontendController`]: push-channel messages to [`DisplayObserver`]
//!   calls, and touch input to flood-controlled `action` messages.
//!
//! Both depend only on traits ([`statdeck_link::MessageSink`],
//! [`LayoutStore`], [`DisplayObserver`]) and take the current time as an
//! argument, so they are tested without sockets or sleeping.

pub mod frontend;
pub mod host_router;
pub mod layout_store;

pub use frontend::{DisplayObserver, FrontendController};
pub use host_router::HostRouter;
pub use layout_store::{LayoutStore, StoreError};
