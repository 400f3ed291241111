//! Events applied to [`SessionState`](super::state::SessionState) by the reducer.

use super::state::SessionError;
use crate::conversation::entities::{Conversation, Message};

/// Every state transition of a conversation session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    // === Conversation list ===
    /// A persisted snapshot was found and painted before the network answers
    ConversationsSeeded(Vec<Conversation>),
    ConversationsRequested,
    ConversationsLoaded(Vec<Conversation>),
    /// List load failed; `seeded` tells whether an optimistic snapshot is shown
    ConversationsFailed { error: SessionError, seeded: bool },

    // === Creation ===
    CreateRequested,
    ConversationCreated(Conversation),
    CreateFailed(SessionError),

    // === Selection ===
    SelectionStarted { conversation_id: String },
    SelectionFailed(SessionError),

    // === Messages ===
    MessagesRequested,
    MessagesLoaded {
        conversation_id: String,
        messages: Vec<Message>,
    },
    MessagesFailed(SessionError),

    // === Sending ===
    MessageQueued(Message),
    MessageDelivered {
        local_id: u64,
        confirmed: Vec<Message>,
    },
    MessageFailed { local_id: u64, error: SessionError },

    // === Server-confirmed mutations ===
    ConversationUpdated(Conversation),
    ConversationRemoved(String),

    // === Errors ===
    /// A failure that is not tied to a busy flag (delete, rename)
    Failed(SessionError),
    ErrorCleared,
}

impl SessionEvent {
    /// Short name used in logs and the session event log.
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::ConversationsSeeded(_) => "conversations_seeded",
            SessionEvent::ConversationsRequested => "conversations_requested",
            SessionEvent::ConversationsLoaded(_) => "conversations_loaded",
            SessionEvent::ConversationsFailed { .. } => "conversations_failed",
            SessionEvent::CreateRequested => "create_requested",
            SessionEvent::ConversationCreated(_) => "conversation_created",
            SessionEvent::CreateFailed(_) => "create_failed",
            SessionEvent::SelectionStarted { .. } => "selection_started",
            SessionEvent::SelectionFailed(_) => "selection_failed",
            SessionEvent::MessagesRequested => "messages_requested",
            SessionEvent::MessagesLoaded { .. } => "messages_loaded",
            SessionEvent::MessagesFailed(_) => "messages_failed",
            SessionEvent::MessageQueued(_) => "message_queued",
            SessionEvent::MessageDelivered { .. } => "message_delivered",
            SessionEvent::MessageFailed { .. } => "message_failed",
            SessionEvent::ConversationUpdated(_) => "conversation_updated",
            SessionEvent::ConversationRemoved(_) => "conversation_removed",
            SessionEvent::Failed(_) => "failed",
            SessionEvent::ErrorCleared => "error_cleared",
        }
    }

    /// The error carried by this event, if any.
    pub fn error(&self) -> Option<&SessionError> {
        match self {
            SessionEvent::ConversationsFailed { error, .. }
            | SessionEvent::MessageFailed { error, .. }
            | SessionEvent::CreateFailed(error)
            | SessionEvent::SelectionFailed(error)
            | SessionEvent::MessagesFailed(error)
            | SessionEvent::Failed(error) => Some(error),
            _ => None,
        }
    }
}
