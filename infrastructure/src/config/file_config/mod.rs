//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and converted into application parameters.

mod api;
mod auth;
mod client;
mod logging;
mod output;
mod storage;

pub use api::FileApiConfig;
pub use auth::FileAuthConfig;
pub use client::FileClientConfig;
pub use logging::FileLoggingConfig;
pub use output::{FileOutputConfig, FileOutputFormat};
pub use storage::FileStorageConfig;

use parley_application::{ClientParams, SessionParams};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry counts above this make a rate-limited call block for minutes.
const MAX_SENSIBLE_RETRIES: u32 = 8;

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Remote API endpoint
    pub api: FileApiConfig,
    /// Cache, rate limit and retry tuning
    pub client: FileClientConfig,
    /// Credentials
    pub auth: FileAuthConfig,
    /// Snapshot storage
    pub storage: FileStorageConfig,
    /// Log destinations
    pub logging: FileLoggingConfig,
    /// Output settings
    pub output: FileOutputConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// A problem found while validating [`FileConfig`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub severity: Severity,
    /// Dotted path of the offending field, e.g. `api.base_url`
    pub field: String,
    pub message: String,
}

impl ConfigIssue {
    fn error(field: &str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            field: field.to_string(),
            message: message.into(),
        }
    }

    fn warning(field: &str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    ///
    /// Errors make the configuration unusable; warnings are reported and the
    /// value is used as given.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        let base_url = self.api.base_url.trim();
        if base_url.is_empty() {
            issues.push(ConfigIssue::error("api.base_url", "cannot be empty"));
        } else if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            issues.push(ConfigIssue::error(
                "api.base_url",
                format!("'{}' must start with http:// or https://", base_url),
            ));
        }

        if self.api.timeout_seconds == 0 {
            issues.push(ConfigIssue::error("api.timeout_seconds", "cannot be 0"));
        }

        if self.client.cache_ttl_seconds == 0 {
            issues.push(ConfigIssue::warning(
                "client.cache_ttl_seconds",
                "0 disables response caching",
            ));
        }

        if self.client.max_retries > MAX_SENSIBLE_RETRIES {
            issues.push(ConfigIssue::warning(
                "client.max_retries",
                format!(
                    "{} retries with exponential backoff can wait for a very long time",
                    self.client.max_retries
                ),
            ));
        }

        if self.auth.token.is_some() != self.auth.user_id.is_some() {
            issues.push(ConfigIssue::warning(
                "auth",
                "token and user_id must be set together; credentials ignored",
            ));
        }

        if self.storage.snapshot_key.trim().is_empty() {
            issues.push(ConfigIssue::error("storage.snapshot_key", "cannot be empty"));
        }

        issues
    }

    pub fn has_errors(issues: &[ConfigIssue]) -> bool {
        issues.iter().any(|i| i.severity == Severity::Error)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_seconds)
    }

    pub fn to_client_params(&self) -> ClientParams {
        ClientParams::default()
            .with_base_url(self.api.base_url.trim())
            .with_cache_ttl(self.client.cache_ttl())
            .with_min_request_interval(self.client.min_request_interval())
            .with_max_retries(self.client.max_retries)
            .with_retry_base_delay(self.client.retry_base_delay())
    }

    pub fn to_session_params(&self) -> SessionParams {
        SessionParams::default().with_snapshot_key(self.storage.snapshot_key.trim())
    }

    /// Copy safe to print: the token is masked.
    pub fn redacted(&self) -> Self {
        Self {
            auth: self.auth.redacted(),
            ..self.clone()
        }
    }
}
