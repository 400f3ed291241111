//! Resilience tuning (`[client]` section)

use parley_application::ClientParams;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw client configuration from TOML
///
/// Durations are plain integers so the file stays readable:
///
/// ```toml
/// [client]
/// cache_ttl_seconds = 30
/// min_request_interval_ms = 1000
/// max_retries = 3
/// retry_base_delay_ms = 1000
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileClientConfig {
    pub cache_ttl_seconds: u64,
    pub min_request_interval_ms: u64,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
}

impl Default for FileClientConfig {
    fn default() -> Self {
        let params = ClientParams::default();
        Self {
            cache_ttl_seconds: params.cache_ttl.as_secs(),
            min_request_interval_ms: params.min_request_interval.as_millis() as u64,
            max_retries: params.max_retries,
            retry_base_delay_ms: params.retry_base_delay.as_millis() as u64,
        }
    }
}

impl FileClientConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.min_request_interval_ms)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}
