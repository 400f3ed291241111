//! Conversation session state.
//!
//! [`SessionState`] is the single source of truth for what the UI shows. It is
//! only ever produced by [`reduce`](super::reducer::reduce); consumers get
//! read-only copies.

use crate::conversation::entities::{Conversation, Message};
use crate::conversation::subscription::{SubscriptionError, SubscriptionErrorCode};
use crate::request::outcome::{ApiError, AuthFailure, ErrorKind};
use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};
use thiserror::Error;

/// Busy indicators
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionFlags {
    /// Conversation list load or creation in progress
    pub loading: bool,
    /// Message list load in progress
    pub loading_messages: bool,
    /// Switching to another conversation
    pub transitioning: bool,
    /// A sent message is waiting for the assistant's reply
    pub typing: bool,
}

/// Coarse phase of the session state machine, derived from flags and error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    Loading,
    Transitioning,
    Typing,
    Error,
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Loading => "loading",
            SessionPhase::Transitioning => "transitioning",
            SessionPhase::Typing => "typing",
            SessionPhase::Error => "error",
        };
        f.write_str(s)
    }
}

/// Discriminant of a [`SessionError`], as the UI switches on it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionErrorType {
    Unauthenticated,
    SessionExpired,
    SubscriptionExpired,
    NoSubscription,
    Generic,
}

impl SessionErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionErrorType::Unauthenticated => "UNAUTHENTICATED",
            SessionErrorType::SessionExpired => "SESSION_EXPIRED",
            SessionErrorType::SubscriptionExpired => "SUBSCRIPTION_EXPIRED",
            SessionErrorType::NoSubscription => "NO_SUBSCRIPTION",
            SessionErrorType::Generic => "GENERIC",
        }
    }
}

impl std::fmt::Display for SessionErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error shown to the user by the session
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("You need to sign in first")]
    Unauthenticated,

    #[error("Your session has expired, please sign in again")]
    SessionExpired,

    #[error("{}", .0.message)]
    Subscription(SubscriptionError),

    #[error("{message}")]
    Generic { message: String },
}

impl SessionError {
    pub fn generic(message: impl Into<String>) -> Self {
        SessionError::Generic {
            message: message.into(),
        }
    }

    pub fn error_type(&self) -> SessionErrorType {
        match self {
            SessionError::Unauthenticated => SessionErrorType::Unauthenticated,
            SessionError::SessionExpired => SessionErrorType::SessionExpired,
            SessionError::Subscription(payload) => match payload.error_code {
                SubscriptionErrorCode::SubscriptionExpired => SessionErrorType::SubscriptionExpired,
                SubscriptionErrorCode::NoSubscription => SessionErrorType::NoSubscription,
            },
            SessionError::Generic { .. } => SessionErrorType::Generic,
        }
    }

    pub fn subscription(&self) -> Option<&SubscriptionError> {
        match self {
            SessionError::Subscription(payload) => Some(payload),
            _ => None,
        }
    }
}

/// Serialized as `{ "type": ..., "message": ..., "payload"?: ... }` so the
/// UI can switch on `type` directly.
impl Serialize for SessionError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let payload = self.subscription();
        let mut map = serializer.serialize_map(Some(if payload.is_some() { 3 } else { 2 }))?;
        map.serialize_entry("type", &self.error_type())?;
        map.serialize_entry("message", &self.to_string())?;
        if let Some(payload) = payload {
            map.serialize_entry("payload", payload)?;
        }
        map.end()
    }
}

impl From<ApiError> for SessionError {
    fn from(error: ApiError) -> Self {
        match error.kind {
            ErrorKind::Authentication(AuthFailure::MissingToken) => SessionError::Unauthenticated,
            ErrorKind::Authentication(AuthFailure::SessionExpired) => SessionError::SessionExpired,
            ErrorKind::Subscription(payload) => SessionError::Subscription(payload),
            ErrorKind::Connectivity
            | ErrorKind::RateLimited
            | ErrorKind::Server { .. }
            | ErrorKind::Unexpected => SessionError::Generic {
                message: error.message,
            },
        }
    }
}

/// Everything the UI renders for the active chat session
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionState {
    pub conversations: Vec<Conversation>,
    pub current_conversation: Option<Conversation>,
    /// The conversation the user asked for most recently. Set before the
    /// conversation itself may be known, and used to fence late results.
    pub selected_conversation_id: Option<String>,
    pub messages: Vec<Message>,
    pub flags: SessionFlags,
    pub error: Option<SessionError>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> SessionPhase {
        if self.error.is_some() {
            SessionPhase::Error
        } else if self.flags.typing {
            SessionPhase::Typing
        } else if self.flags.transitioning {
            SessionPhase::Transitioning
        } else if self.flags.loading || self.flags.loading_messages {
            SessionPhase::Loading
        } else {
            SessionPhase::Idle
        }
    }

    pub fn find_conversation(&self, id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected_conversation_id.as_deref() == Some(id)
    }

    pub fn current_conversation_id(&self) -> Option<&str> {
        self.current_conversation.as_ref().map(|c| c.id.as_str())
    }

    pub fn optimistic_count(&self) -> usize {
        self.messages.iter().filter(|m| m.is_optimistic()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_prefers_error() {
        let mut state = SessionState::new();
        state.flags.typing = true;
        assert_eq!(state.phase(), SessionPhase::Typing);
        state.error = Some(SessionError::generic("boom"));
        assert_eq!(state.phase(), SessionPhase::Error);
    }

    #[test]
    fn phase_defaults_to_idle() {
        assert_eq!(SessionState::new().phase(), SessionPhase::Idle);
    }

    #[test]
    fn api_errors_map_to_session_errors() {
        assert_eq!(
            SessionError::from(ApiError::missing_token()),
            SessionError::Unauthenticated
        );
        assert_eq!(
            SessionError::from(ApiError::session_expired()),
            SessionError::SessionExpired
        );
        assert_eq!(
            SessionError::from(ApiError::server(500, "Internal error")),
            SessionError::generic("Internal error")
        );
    }

    #[test]
    fn subscription_error_type_follows_code() {
        let payload = SubscriptionError::new(SubscriptionErrorCode::NoSubscription, "Subscribe", "asst_1");
        let error = SessionError::from(ApiError::subscription(payload));
        assert_eq!(error.error_type(), SessionErrorType::NoSubscription);
        assert_eq!(error.to_string(), "Subscribe");
        assert_eq!(error.subscription().unwrap().assistant_id, "asst_1");
    }

    #[test]
    fn session_error_serializes_with_type_tag() {
        let value = serde_json::to_value(SessionError::generic("oops")).unwrap();
        assert_eq!(value["type"], "GENERIC");
        assert_eq!(value["message"], "oops");
        assert!(value.get("payload").is_none());

        let payload = SubscriptionError::new(SubscriptionErrorCode::SubscriptionExpired, "Renew", "asst_3");
        let value = serde_json::to_value(SessionError::Subscription(payload)).unwrap();
        assert_eq!(value["type"], "SUBSCRIPTION_EXPIRED");
        assert_eq!(value["payload"]["assistant_id"], "asst_3");
    }
}
