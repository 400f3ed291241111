//! Pure state transitions for a conversation session.
//!
//! `reduce(state, event) -> state` has no side effects, so every transition of
//! the session state machine can be tested without a transport. The driver in
//! the application layer decides *whether* an event should be applied (for
//! example after a supersession check); the reducer decides *how*.

use super::event::SessionEvent;
use super::state::SessionState;
use crate::conversation::entities::{Conversation, Message, MessageId};

/// Apply one event to the session state.
pub fn reduce(mut state: SessionState, event: SessionEvent) -> SessionState {
    match event {
        SessionEvent::ConversationsSeeded(conversations) => {
            state.conversations = conversations;
            resolve_current(&mut state);
        }
        SessionEvent::ConversationsRequested => {
            state.flags.loading = true;
        }
        SessionEvent::ConversationsLoaded(conversations) => {
            state.flags.loading = false;
            state.conversations = conversations;
            resolve_current(&mut state);
        }
        SessionEvent::ConversationsFailed { error, seeded } => {
            state.flags.loading = false;
            if !seeded {
                state.conversations.clear();
                resolve_current(&mut state);
            }
            state.error = Some(error);
        }

        SessionEvent::CreateRequested => {
            // Selection and messaging work was cancelled along with this request
            state.flags.loading = true;
            state.flags.transitioning = false;
            state.flags.loading_messages = false;
            state.flags.typing = false;
            state.messages.clear();
            state.error = None;
        }
        SessionEvent::ConversationCreated(conversation) => {
            state.flags.loading = false;
            state.flags.transitioning = false;
            state.flags.loading_messages = false;
            state.flags.typing = false;
            state.conversations.retain(|c| c.id != conversation.id);
            state.selected_conversation_id = Some(conversation.id.clone());
            state.current_conversation = Some(conversation.clone());
            state.conversations.insert(0, conversation);
            state.messages.clear();
        }
        SessionEvent::CreateFailed(error) => {
            // The previous selection lost its messages; leave it selectable again.
            state.flags.loading = false;
            state.selected_conversation_id = None;
            state.current_conversation = None;
            state.error = Some(error);
        }

        SessionEvent::SelectionStarted { conversation_id } => {
            state.current_conversation = state.find_conversation(&conversation_id).cloned();
            state.selected_conversation_id = Some(conversation_id);
            state.messages.clear();
            state.flags.transitioning = true;
            state.flags.typing = false;
            state.error = None;
        }
        SessionEvent::SelectionFailed(error) => {
            state.flags.transitioning = false;
            state.flags.loading_messages = false;
            state.error = Some(error);
        }

        SessionEvent::MessagesRequested => {
            state.flags.loading_messages = true;
        }
        SessionEvent::MessagesLoaded {
            conversation_id,
            messages,
        } => {
            // Late results for a conversation that is no longer selected never land.
            if state.is_selected(&conversation_id) {
                state.messages = messages;
                state.flags.loading_messages = false;
                state.flags.transitioning = false;
            }
        }
        SessionEvent::MessagesFailed(error) => {
            state.flags.loading_messages = false;
            state.flags.transitioning = false;
            state.error = Some(error);
        }

        SessionEvent::MessageQueued(message) => {
            state.messages.push(message);
            state.flags.typing = true;
            state.error = None;
        }
        SessionEvent::MessageDelivered {
            local_id,
            confirmed,
        } => {
            remove_optimistic(&mut state.messages, local_id);
            for message in confirmed {
                append_unique(&mut state.messages, message);
            }
            state.flags.typing = false;
        }
        SessionEvent::MessageFailed { local_id, error } => {
            remove_optimistic(&mut state.messages, local_id);
            state.flags.typing = false;
            state.error = Some(error);
        }

        SessionEvent::ConversationUpdated(conversation) => {
            if let Some(existing) = state.conversations.iter_mut().find(|c| c.id == conversation.id) {
                *existing = conversation.clone();
            }
            if state.current_conversation_id() == Some(conversation.id.as_str()) {
                state.current_conversation = Some(conversation);
            }
        }
        SessionEvent::ConversationRemoved(id) => {
            state.conversations.retain(|c| c.id != id);
            if state.is_selected(&id) || state.current_conversation_id() == Some(id.as_str()) {
                state.selected_conversation_id = None;
                state.current_conversation = None;
                state.messages.clear();
                state.flags.transitioning = false;
                state.flags.loading_messages = false;
                state.flags.typing = false;
            }
        }

        SessionEvent::Failed(error) => {
            state.error = Some(error);
        }
        SessionEvent::ErrorCleared => {
            state.error = None;
        }
    }
    state
}

/// Point `current_conversation` at the selected id within the (new) list.
fn resolve_current(state: &mut SessionState) {
    let resolved: Option<Conversation> = state
        .selected_conversation_id
        .as_deref()
        .and_then(|id| state.find_conversation(id))
        .cloned();
    state.current_conversation = resolved;
}

fn remove_optimistic(messages: &mut Vec<Message>, local_id: u64) {
    messages.retain(|m| m.id != MessageId::Optimistic { local_id });
}

fn append_unique(messages: &mut Vec<Message>, message: Message) {
    if messages.iter().any(|m| m.id == message.id) {
        return;
    }
    messages.push(message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::entities::Role;
    use crate::session::state::{SessionError, SessionPhase};
    use chrono::Utc;

    fn conversation(id: &str) -> Conversation {
        Conversation::new(id, "u1", "asst_1").with_title(format!("Conversation {}", id))
    }

    fn apply(state: SessionState, events: Vec<SessionEvent>) -> SessionState {
        events.into_iter().fold(state, reduce)
    }

    #[test]
    fn created_conversation_is_prepended_and_current() {
        let state = apply(
            SessionState::new(),
            vec![
                SessionEvent::ConversationsLoaded(vec![conversation("c0")]),
                SessionEvent::CreateRequested,
                SessionEvent::ConversationCreated(conversation("c1")),
            ],
        );

        assert_eq!(state.conversations[0].id, "c1");
        assert_eq!(state.conversations.len(), 2);
        assert_eq!(state.current_conversation_id(), Some("c1"));
        assert_eq!(state.phase(), SessionPhase::Idle);
    }

    #[test]
    fn create_request_drops_flags_of_cancelled_work() {
        let state = apply(
            SessionState::new(),
            vec![
                SessionEvent::ConversationsLoaded(vec![conversation("c1"), conversation("c2")]),
                SessionEvent::SelectionStarted {
                    conversation_id: "c2".to_string(),
                },
                SessionEvent::MessagesRequested,
                SessionEvent::MessageQueued(Message::optimistic(1, "c2", "hi", Utc::now())),
                SessionEvent::CreateRequested,
            ],
        );

        assert!(state.messages.is_empty());
        assert!(!state.flags.transitioning);
        assert!(!state.flags.loading_messages);
        assert!(!state.flags.typing);
        assert_eq!(state.phase(), SessionPhase::Loading);
    }

    #[test]
    fn failed_create_releases_previous_selection() {
        let state = apply(
            SessionState::new(),
            vec![
                SessionEvent::ConversationsLoaded(vec![conversation("c1")]),
                SessionEvent::SelectionStarted {
                    conversation_id: "c1".to_string(),
                },
                SessionEvent::CreateRequested,
                SessionEvent::CreateFailed(SessionError::generic("boom")),
            ],
        );

        assert!(state.selected_conversation_id.is_none());
        assert!(state.current_conversation.is_none());
        assert_eq!(state.conversations.len(), 1);
        assert!(!state.flags.loading);
        assert_eq!(state.error, Some(SessionError::generic("boom")));
    }

    #[test]
    fn selection_clears_messages_and_transitions() {
        let state = apply(
            SessionState::new(),
            vec![
                SessionEvent::ConversationsLoaded(vec![conversation("c1"), conversation("c2")]),
                SessionEvent::SelectionStarted {
                    conversation_id: "c1".to_string(),
                },
                SessionEvent::MessagesLoaded {
                    conversation_id: "c1".to_string(),
                    messages: vec![Message::confirmed("m1", "c1", Role::User, "hi")],
                },
                SessionEvent::SelectionStarted {
                    conversation_id: "c2".to_string(),
                },
            ],
        );

        assert!(state.messages.is_empty());
        assert!(state.flags.transitioning);
        assert_eq!(state.phase(), SessionPhase::Transitioning);
        assert_eq!(state.current_conversation_id(), Some("c2"));
    }

    #[test]
    fn messages_for_unselected_conversation_are_ignored() {
        let state = apply(
            SessionState::new(),
            vec![
                SessionEvent::ConversationsLoaded(vec![conversation("c1"), conversation("c2")]),
                SessionEvent::SelectionStarted {
                    conversation_id: "c2".to_string(),
                },
                SessionEvent::MessagesLoaded {
                    conversation_id: "c1".to_string(),
                    messages: vec![Message::confirmed("m1", "c1", Role::User, "late")],
                },
            ],
        );

        assert!(state.messages.is_empty());
        assert!(state.flags.transitioning);
    }

    #[test]
    fn delivery_replaces_the_optimistic_entry() {
        let state = apply(
            SessionState::new(),
            vec![
                SessionEvent::MessageQueued(Message::optimistic(1, "c1", "hi", Utc::now())),
                SessionEvent::MessageDelivered {
                    local_id: 1,
                    confirmed: vec![
                        Message::confirmed("m1", "c1", Role::User, "hi"),
                        Message::confirmed("m2", "c1", Role::Assistant, "hello"),
                    ],
                },
            ],
        );

        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.optimistic_count(), 0);
        assert!(!state.flags.typing);
    }

    #[test]
    fn failed_send_rolls_back_and_records_error() {
        let state = apply(
            SessionState::new(),
            vec![
                SessionEvent::MessageQueued(Message::optimistic(3, "c1", "hi", Utc::now())),
                SessionEvent::MessageFailed {
                    local_id: 3,
                    error: SessionError::generic("offline"),
                },
            ],
        );

        assert!(state.messages.is_empty());
        assert_eq!(state.error, Some(SessionError::generic("offline")));
        assert_eq!(state.phase(), SessionPhase::Error);
    }

    #[test]
    fn failed_list_load_without_seed_empties_list() {
        let seeded = apply(
            SessionState::new(),
            vec![
                SessionEvent::ConversationsSeeded(vec![conversation("c1")]),
                SessionEvent::ConversationsRequested,
                SessionEvent::ConversationsFailed {
                    error: SessionError::generic("offline"),
                    seeded: true,
                },
            ],
        );
        assert_eq!(seeded.conversations.len(), 1);

        let unseeded = apply(
            seeded,
            vec![SessionEvent::ConversationsFailed {
                error: SessionError::generic("offline"),
                seeded: false,
            }],
        );
        assert!(unseeded.conversations.is_empty());
    }

    #[test]
    fn removing_current_conversation_clears_selection() {
        let state = apply(
            SessionState::new(),
            vec![
                SessionEvent::ConversationsLoaded(vec![conversation("c1"), conversation("c2")]),
                SessionEvent::SelectionStarted {
                    conversation_id: "c1".to_string(),
                },
                SessionEvent::ConversationRemoved("c1".to_string()),
            ],
        );

        assert_eq!(state.conversations.len(), 1);
        assert!(state.current_conversation.is_none());
        assert!(state.selected_conversation_id.is_none());
        assert!(!state.flags.transitioning);
    }

    #[test]
    fn clearing_error_returns_to_operational_phase() {
        let state = apply(
            SessionState::new(),
            vec![
                SessionEvent::ConversationsRequested,
                SessionEvent::Failed(SessionError::generic("boom")),
            ],
        );
        assert_eq!(state.phase(), SessionPhase::Error);

        let state = reduce(state, SessionEvent::ErrorCleared);
        assert_eq!(state.phase(), SessionPhase::Loading);
    }

    #[test]
    fn update_refreshes_current_conversation() {
        let state = apply(
            SessionState::new(),
            vec![
                SessionEvent::ConversationsLoaded(vec![conversation("c1")]),
                SessionEvent::SelectionStarted {
                    conversation_id: "c1".to_string(),
                },
                SessionEvent::ConversationUpdated(conversation("c1").with_title("Renamed")),
            ],
        );

        assert_eq!(state.conversations[0].title, "Renamed");
        assert_eq!(state.current_conversation.unwrap().title, "Renamed");
    }
}
