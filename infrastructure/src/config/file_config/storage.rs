//! Snapshot storage (`[storage]` section)

use parley_application::config::session_params::DEFAULT_SNAPSHOT_KEY;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw storage configuration from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStorageConfig {
    /// Directory for snapshot files (default: `<data dir>/parley`)
    pub snapshot_dir: Option<PathBuf>,
    /// Key of the conversation list snapshot
    pub snapshot_key: String,
}

impl Default for FileStorageConfig {
    fn default() -> Self {
        Self {
            snapshot_dir: None,
            snapshot_key: DEFAULT_SNAPSHOT_KEY.to_string(),
        }
    }
}

impl FileStorageConfig {
    /// Configured directory, or the platform data directory.
    pub fn resolved_snapshot_dir(&self) -> Option<PathBuf> {
        self.snapshot_dir
            .clone()
            .or_else(|| dirs::data_dir().map(|d| d.join("parley")))
    }
}
