//! Resilient access to the remote API.
//!
//! - [`cache::ResponseCache`]: TTL cache of successful reads
//! - [`dedup::RequestDeduplicator`]: one network call per concurrent logical request
//! - [`rate_limiter::RateLimiter`]: minimum spacing per request key
//! - [`retry::RetryPolicy`]: bounded exponential backoff for rate-limited calls
//! - [`resilient::ResilientClient`]: composes all of the above around a transport

pub mod cache;
pub mod dedup;
pub mod rate_limiter;
pub mod resilient;
pub mod retry;

pub use resilient::{AuthMode, CallOptions, ResilientClient};
