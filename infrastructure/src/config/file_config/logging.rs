//! Log destinations (`[logging]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw logging configuration from TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Also write diagnostic logs to this file
    pub log_file: Option<PathBuf>,
    /// Append structured session events (JSONL) to this file
    pub session_log: Option<PathBuf>,
}
