//! Domain layer for parley
//!
//! This crate contains the core business logic, entities, and value objects.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Requests
//!
//! Every remote call is identified by a [`RequestKey`] derived from method,
//! endpoint and a canonical form of the body. The key drives caching,
//! deduplication and per-request retry accounting. Every call ends in an
//! [`ApiResult`]: data on success, a classified [`ApiError`] otherwise.
//!
//! ## Conversation session
//!
//! A [`SessionState`] holds the conversation list, the current conversation,
//! its messages, busy flags and the last error. It only changes through
//! [`reduce`], one [`SessionEvent`] at a time.

pub mod conversation;
pub mod core;
pub mod request;
pub mod session;

// Re-export commonly used types
pub use conversation::{
    entities::{AssistantSummary, Conversation, Message, MessageId, Role},
    snapshot::ConversationSnapshot,
    subscription::{SubscriptionError, SubscriptionErrorCode},
};
pub use core::{
    error::DomainError,
    text::{MAX_TITLE_LEN, normalize_title, preview},
};
pub use request::{
    envelope::ApiEnvelope,
    key::RequestKey,
    method::HttpMethod,
    outcome::{ApiError, ApiResult, AuthFailure, ErrorKind},
};
pub use session::{
    event::SessionEvent,
    reducer::reduce,
    state::{SessionError, SessionErrorType, SessionFlags, SessionPhase, SessionState},
    token::SelectionToken,
};
