//! Infrastructure layer for statdeck-display.
//!
//! - `file_store`: the layout file with atomic replace.
//! - `host_loop` / `frontend_loop`: link tasks plus the role event loops.
//! - `console`: log-based observer and stdin touch input for headless runs.

pub mod console;
pub mod file_store;
pub mod frontend_loop;
pub mod host_loop;

pub use file_store::FileLayoutStore;
pub use frontend_loop::{run_frontend, run_frontend_with};
pub use host_loop::{run_host, run_host_with, HostError};
