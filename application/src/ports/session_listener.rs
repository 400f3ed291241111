//! Port for session invalidation signals.
//!
//! Raised by the resilient client whenever the server rejects the credential
//! (HTTP 401). The call itself still resolves to a failed result.

pub trait SessionInvalidationListener: Send + Sync {
    fn on_session_invalidated(&self);
}

/// No-op implementation for tests and when nothing needs to react.
pub struct NoSessionListener;

impl SessionInvalidationListener for NoSessionListener {
    fn on_session_invalidated(&self) {}
}
