//! Infrastructure layer for parley
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: the HTTP transport, snapshot stores, credentials,
//! the session event log, and configuration file loading.

pub mod auth;
pub mod config;
pub mod http;
pub mod logging;
pub mod storage;

// Re-export commonly used types
pub use auth::{CredentialStore, Credentials};
pub use config::{
    ConfigError, ConfigIssue, ConfigLoader, FileApiConfig, FileAuthConfig, FileClientConfig, FileConfig,
    FileLoggingConfig, FileOutputConfig, FileOutputFormat, FileStorageConfig, Severity,
};
pub use http::ReqwestTransport;
pub use logging::JsonlSessionEventLogger;
pub use storage::{FileSnapshotStore, MemorySnapshotStore};
