use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Name of the store directory under the workspace root.
pub const STORE_DIR: &str = ".cascade";
/// Store settings file, inside [`STORE_DIR`].
pub const CONFIG_FILE: &str = "config.toml";
/// Object directory, inside [`STORE_DIR`].
pub const OBJECTS_DIR: &str = "objects";
/// Provenance log file, inside [`STORE_DIR`].
pub const LOG_FILE: &str = "log.jsonl";

/// Per-store settings, fixed when the store is initialized.
///
/// Written to `.cascade/config.toml` by `init` and read back by `open`, so a
/// store keeps one hashing policy for its whole life.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Rewrite CRLF/CR line endings to LF before hashing objects.
    pub normalize_line_endings: bool,
    /// `fsync` the log after each append.
    pub sync_log: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            normalize_line_endings: false,
            sync_log: true,
        }
    }
}

impl StoreConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn to_toml_string(&self) -> StoreResult<String> {
        toml::to_string(self).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Load from `path`, or the default when the file does not exist.
    pub fn load_or_default(path: &Path) -> StoreResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(StoreError::io(path))?;
        Self::from_toml_str(&text).map_err(|e| StoreError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}
