//! JSON rendering of the legacy/auth mapping.
//!
//! The output format is a pretty-printed array:
//!
//! ```json
//! [
//!   {
//!     "legacy_id": 42,
//!     "auth_id": "6f1c..."
//!   }
//! ]
//! ```

use std::path::Path;

use tracing::{debug, info};

use crate::errors::MappingError;
use crate::models::MappingEntry;

/// Utilities for rendering and saving the mapping.
pub struct MappingFile;

impl MappingFile {
    /// Render the mapping as indented JSON.
    pub fn render(entries: &[MappingEntry]) -> Result<String, MappingError> {
        Ok(serde_json::to_string_pretty(entries)?)
    }

    /// Write the rendered mapping to `path`, followed by a newline.
    pub fn save<P: AsRef<Path>>(path: P, entries: &[MappingEntry]) -> Result<(), MappingError> {
        let path = path.as_ref();
        info!(path = %path.display(), "saving mapping file");

        let mut rendered = Self::render(entries)?;
        rendered.push('\n');
        std::fs::write(path, rendered).map_err(|source| MappingError::Write {
            path: path.display().to_string(),
            source,
        })?;

        debug!(count = entries.len(), "saved mapping entries");
        Ok(())
    }
}
