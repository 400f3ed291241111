//! Client parameters: resilience tuning for [`ResilientClient`].
//!
//! [`ClientParams`] groups the static parameters that control caching, rate
//! limiting and retries in
//! [`ResilientClient`](crate::client::resilient::ResilientClient).

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";

/// Resilience parameters for one client instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientParams {
    /// Prefix joined with every endpoint.
    pub base_url: String,
    /// How long a successful read stays fresh.
    pub cache_ttl: Duration,
    /// Minimum spacing between two calls with the same request key.
    pub min_request_interval: Duration,
    /// Retries after the first attempt, for rate-limited calls only.
    pub max_retries: u32,
    /// First backoff delay; doubled on every further retry.
    pub retry_base_delay: Duration,
}

impl Default for ClientParams {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_ttl: Duration::from_secs(30),
            min_request_interval: Duration::from_secs(1),
            max_retries: 3,
            retry_base_delay: Duration::from_secs(1),
        }
    }
}

impl ClientParams {
    // ==================== Builder Methods ====================

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_min_request_interval(mut self, interval: Duration) -> Self {
        self.min_request_interval = interval;
        self
    }

    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    /// Join `endpoint` onto the base URL with exactly one slash.
    pub fn url_for(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let params = ClientParams::default();
        assert_eq!(params.base_url, DEFAULT_BASE_URL);
        assert_eq!(params.cache_ttl, Duration::from_secs(30));
        assert_eq!(params.min_request_interval, Duration::from_secs(1));
        assert_eq!(params.max_retries, 3);
        assert_eq!(params.retry_base_delay, Duration::from_secs(1));
    }

    #[test]
    fn test_builder() {
        let params = ClientParams::default()
            .with_base_url("https://api.example.com/v1/")
            .with_cache_ttl(Duration::from_secs(5))
            .with_max_retries(1);

        assert_eq!(params.cache_ttl, Duration::from_secs(5));
        assert_eq!(params.max_retries, 1);
        assert_eq!(
            params.url_for("/conversations"),
            "https://api.example.com/v1/conversations"
        );
    }
}
