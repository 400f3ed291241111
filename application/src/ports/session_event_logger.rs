//! Port for structured session event logging.
//!
//! Defines the [`SessionEventLogger`] trait for recording what the
//! conversation session did (conversations created, messages sent, failures)
//! to a structured log.
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostic messages, while this port captures a
//! machine-readable record of session activity (JSONL).

use serde_json::Value;

/// A structured session event for logging.
///
/// Each event has a type string and a JSON payload with event-specific fields.
/// Implementations add the timestamp.
pub struct SessionLogEvent {
    /// Event type identifier (e.g., "conversation_created", "message_failed").
    pub event_type: &'static str,
    /// JSON payload with event-specific data.
    pub payload: Value,
}

impl SessionLogEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }
}

/// Port for logging session events to a structured log.
///
/// `log` is synchronous and infallible; logging failures are ignored.
pub trait SessionEventLogger: Send + Sync {
    fn log(&self, event: SessionLogEvent);
}

/// No-op implementation for tests and when logging is disabled.
pub struct NoSessionEventLogger;

impl SessionEventLogger for NoSessionEventLogger {
    fn log(&self, _event: SessionLogEvent) {}
}
