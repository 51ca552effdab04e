//! Persistence seam for the host's layout.

use std::path::PathBuf;

use statdeck_core::{LayoutDocument, LayoutError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error accessing layout at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("stored layout is not usable: {0}")]
    Invalid(#[from] LayoutError),
}

/// Where the display host keeps the last layout it received.
///
/// The production implementation is a JSON file; tests use an in-memory
/// double.
pub trait LayoutStore: Send + Sync {
    /// Returns the stored layout, or `None` if nothing has been stored yet.
    fn load(&self) -> Result<Option<LayoutDocument>, StoreError>;

    /// Replaces the stored layout.  Must not leave a partial file behind.
    fn save(&self, layout: &LayoutDocument) -> Result<(), StoreError>;
}
