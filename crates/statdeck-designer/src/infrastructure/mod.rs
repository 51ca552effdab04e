//! Infrastructure layer for statdeck-designer.

pub mod console;
pub mod designer_loop;

pub use designer_loop::{start_designer, start_designer_with, DesignerSession};
