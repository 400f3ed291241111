//! Normalized outcome of a remote call.
//!
//! Every call made through the resilient client resolves to an [`ApiResult`]:
//! either the envelope's `data` payload or an [`ApiError`] whose
//! [`ErrorKind`] tells the caller what went wrong. Nothing below the client
//! boundary panics or throws; transport faults, HTTP failures and malformed
//! bodies all end up here.

use crate::conversation::subscription::SubscriptionError;
use serde_json::Value;
use thiserror::Error;

/// Result of a call through the resilient client.
///
/// `Clone` so that every caller collapsed onto one in-flight request observes
/// the identical value.
pub type ApiResult = Result<Value, ApiError>;

/// Why an authenticated call could not proceed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// Auth was required but no bearer token was available. No request was sent.
    MissingToken,
    /// The server rejected the credential (HTTP 401).
    SessionExpired,
}

/// Error taxonomy for remote calls
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    /// No response reached the client, or the body was not a valid envelope.
    Connectivity,
    /// The server asked us to slow down (HTTP 429). The only retryable kind.
    RateLimited,
    /// Missing or rejected credentials.
    Authentication(AuthFailure),
    /// Any other non-success response.
    Server { status: u16 },
    /// Subscription-gated failure, kept with its full payload.
    Subscription(SubscriptionError),
    /// A fault that should never happen (task panic, undecodable payload).
    Unexpected,
}

/// A failed remote call
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn connectivity(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Connectivity, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RateLimited, message)
    }

    pub fn missing_token() -> Self {
        Self::new(
            ErrorKind::Authentication(AuthFailure::MissingToken),
            "Authentication required",
        )
    }

    pub fn session_expired() -> Self {
        Self::new(
            ErrorKind::Authentication(AuthFailure::SessionExpired),
            "Session expired",
        )
    }

    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Server { status }, message)
    }

    pub fn subscription(payload: SubscriptionError) -> Self {
        let message = payload.message.clone();
        Self::new(ErrorKind::Subscription(payload), message)
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unexpected, message)
    }

    /// Only server-side rate limiting is retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, ErrorKind::RateLimited)
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Authentication(AuthFailure::SessionExpired)
        )
    }

    pub fn subscription_payload(&self) -> Option<&SubscriptionError> {
        match &self.kind {
            ErrorKind::Subscription(payload) => Some(payload),
            _ => None,
        }
    }
}
