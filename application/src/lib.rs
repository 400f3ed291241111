//! Application layer for parley
//!
//! This crate contains the resilient client, the conversation session use case,
//! port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod client;
pub mod config;
pub mod ports;
pub mod use_cases;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use client::{
    AuthMode, CallOptions, ResilientClient, cache::ResponseCache, dedup::RequestDeduplicator,
    rate_limiter::RateLimiter, retry::RetryPolicy,
};
pub use config::{ClientParams, SessionParams};
pub use ports::{
    auth_token_source::{AuthTokenSource, NoAuth, StaticTokenSource},
    session_event_logger::{NoSessionEventLogger, SessionEventLogger, SessionLogEvent},
    session_listener::{NoSessionListener, SessionInvalidationListener},
    snapshot_store::{NoSnapshotStore, SnapshotStore, StoreError},
    transport::{Transport, TransportError, TransportRequest, TransportResponse},
};
pub use use_cases::conversation_session::{ConversationSession, Outcome, api::ConversationApi};
