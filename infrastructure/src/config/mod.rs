//! Configuration file loading for parley
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `PARLEY_*` environment variables, e.g. `PARLEY_AUTH__TOKEN`
//! 2. `--config <path>` specified file
//! 3. Project root: `./parley.toml` or `./.parley.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/parley/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigIssue, FileApiConfig, FileAuthConfig, FileClientConfig, FileConfig, FileLoggingConfig,
    FileOutputConfig, FileOutputFormat, FileStorageConfig, Severity,
};
pub use loader::{ConfigError, ConfigLoader};
