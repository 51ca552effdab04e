//! Domain layer for statdeck-designer: config schema and tile action
//! resolution.  No I/O.

pub mod action;
pub mod config;

pub use action::{resolve_action, ActionKind, ActionRequest, ResolveError};
pub use config::DesignerConfig;
