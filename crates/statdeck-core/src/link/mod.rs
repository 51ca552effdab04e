//! Runtime-independent link state.
//!
//! Both types here are plain data structures driven by explicit events and
//! an explicit clock.  The async driver in `statdeck-link` owns one of each
//! per connection and feeds them real I/O outcomes and `Instant`s.

pub mod connection;
pub mod correlation;

pub use connection::{ConnectionState, ConnectionStateMachine, StateError, Transition};
pub use correlation::{CorrelationError, PendingRequest, PendingTable};
