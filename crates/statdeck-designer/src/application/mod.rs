//! Application layer for statdeck-designer.
//!
//! - `service`: request/response calls to the relay.
//! - `router`: inbound link events, observer notifications.
//! - `dispatch`: tile actions to the injected [`ActionRunner`].

pub mod dispatch;
pub mod router;
pub mod service;

pub use dispatch::{ActionDispatcher, ActionRunner, RunError};
pub use router::{DesignerObserver, DesignerRouter};
pub use service::{DesignerError, DesignerService};
