//! Domain layer for statdeck-display: the config schema and input events.

pub mod config;
pub mod input;

pub use config::DisplayConfig;
pub use input::{InputEvent, ParseInputError};
