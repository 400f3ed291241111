//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod auth_token_source;
pub mod session_event_logger;
pub mod session_listener;
pub mod snapshot_store;
pub mod transport;
