//! API endpoint configuration (`[api]` section)

use parley_application::config::client_params::DEFAULT_BASE_URL;
use serde::{Deserialize, Serialize};

/// Raw API configuration from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileApiConfig {
    /// Base URL every endpoint is joined onto
    pub base_url: String,
    /// Per-request timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for FileApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_seconds: 30,
        }
    }
}
