//! Application layer for statdeck-relay.
//!
//! The routing rules know *what* to send where; the link tasks in the
//! infrastructure layer know *how*.  The router only depends on the
//! [`statdeck_link::MessageSink`] trait.

pub mod relay_router;
pub mod telemetry;

pub use relay_router::RelayRouter;
pub use telemetry::StatsSource;
