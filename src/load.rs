//! Reading API definitions from disk.
//!
//! `.yaml` and `.yml` files are parsed as YAML, everything else as JSON.
//! Anchors and merge keys are resolved by `serde_yaml` before the document
//! becomes a [`Value`].

use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::error::{OasError, Result};
use crate::oas::Oas;

/// Serialization a definition file is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    /// Decide by file extension; unknown extensions are treated as JSON.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("yaml" | "yml") => Format::Yaml,
            _ => Format::Json,
        }
    }
}

/// Parse `content` as a definition.
///
/// # Errors
///
/// Parse failures, reported as [`OasError::Load`] against `path`.
pub fn parse_definition(content: &str, format: Format, path: &Path) -> Result<Value> {
    let parsed = match format {
        Format::Yaml => serde_yaml::from_str::<Value>(content).map_err(|err| err.to_string()),
        Format::Json => serde_json::from_str::<Value>(content).map_err(|err| err.to_string()),
    };
    parsed.map_err(|message| OasError::Load {
        path: path.to_path_buf(),
        message,
    })
}

/// Read and parse the definition at `path`.
///
/// # Errors
///
/// [`OasError::Load`] when the file cannot be read or parsed.
pub fn load_definition(path: impl AsRef<Path>) -> Result<Value> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|err| OasError::Load {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    let format = Format::from_path(path);
    debug!(path = %path.display(), ?format, bytes = content.len(), "loading definition");
    parse_definition(&content, format, path)
}

/// [`load_definition`] wrapped in an [`Oas`] for `user`.
///
/// # Errors
///
/// See [`load_definition`].
pub fn load_oas(path: impl AsRef<Path>, user: Value) -> Result<Oas> {
    Ok(Oas::new(load_definition(path)?, user))
}
