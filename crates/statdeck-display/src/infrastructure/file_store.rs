//! [`LayoutStore`] backed by a JSON file.
//!
//! Writes go to a sibling `.tmp` file that is then renamed over the target,
//! so a power cut during a save leaves either the old or the new layout,
//! never half of one.

use std::io;
use std::path::{Path, PathBuf};

use statdeck_core::LayoutDocument;

use crate::application::{LayoutStore, StoreError};

#[derive(Debug, Clone)]
pub struct FileLayoutStore {
    path: PathBuf,
}

impl FileLayoutStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "layout.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, path: &Path, source: io::Error) -> StoreError {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl LayoutStore for FileLayoutStore {
    fn load(&self) -> Result<Option<LayoutDocument>, StoreError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(&self.path, e)),
        };
        let layout = LayoutDocument::from_json(text)?;
        layout.validate()?;
        Ok(Some(layout))
    }

    fn save(&self, layout: &LayoutDocument) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| self.io_error(dir, e))?;
        }
        let temp = self.temp_path();
        std::fs::write(&temp, layout.as_json()).map_err(|e| self.io_error(&temp, e))?;
        std::fs::rename(&temp, &self.path).map_err(|e| self.io_error(&self.path, e))
    }
}
