//! Application-level configuration.
//!
//! - [`ClientParams`]: cache TTL, rate limit spacing, retry backoff
//! - [`SessionParams`]: conversation session settings

pub mod client_params;
pub mod session_params;

pub use client_params::ClientParams;
pub use session_params::SessionParams;
