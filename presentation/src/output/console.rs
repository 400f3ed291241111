//! Console output formatter for conversations and session errors

use colored::Colorize;
use parley_domain::{Conversation, Message, Role, SessionError, SessionErrorType, preview};
use serde::Serialize;

/// Width of list titles before they are cut
const TITLE_WIDTH: usize = 40;

/// Formats session data for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Turn colors off globally (for `--json`, `output.color = false`, or pipes).
    pub fn set_color(enabled: bool) {
        if !enabled {
            colored::control::set_override(false);
        }
    }

    /// One line per conversation, newest first as the server returns them.
    pub fn conversation_list(conversations: &[Conversation]) -> String {
        if conversations.is_empty() {
            return format!("{}\n", "No conversations yet.".dimmed());
        }

        let mut output = Self::header("Conversations");
        for conversation in conversations {
            output.push_str(&format!(
                "  {}  {}  {}\n",
                conversation.id.yellow(),
                preview(conversation.display_title(), TITLE_WIDTH).bold(),
                Self::assistant_label(conversation).dimmed(),
            ));
        }
        output
    }

    /// A conversation header followed by its messages.
    pub fn conversation(conversation: &Conversation, messages: &[Message]) -> String {
        let mut output = Self::header(conversation.display_title());
        output.push_str(&format!(
            "{} {}  {} {}\n",
            "Id:".cyan().bold(),
            conversation.id,
            "Assistant:".cyan().bold(),
            Self::assistant_label(conversation),
        ));
        output.push_str(&format!(
            "{} {}\n",
            "Updated:".cyan().bold(),
            conversation.updated_at.format("%Y-%m-%d %H:%M UTC"),
        ));

        if messages.is_empty() {
            output.push_str(&format!("\n{}\n", "No messages yet.".dimmed()));
        } else {
            output.push('\n');
            output.push_str(&Self::messages(messages));
        }
        output
    }

    pub fn messages(messages: &[Message]) -> String {
        messages.iter().map(Self::message).collect()
    }

    pub fn message(message: &Message) -> String {
        let author = match message.role {
            Role::User => "You".green().bold(),
            Role::Assistant => "Assistant".cyan().bold(),
        };
        let pending = if message.is_optimistic() {
            format!(" {}", "(sending)".dimmed())
        } else {
            String::new()
        };
        format!("{}{}\n{}\n\n", author, pending, message.content)
    }

    /// A short confirmation such as "Deleted conversation c1".
    pub fn notice(text: &str) -> String {
        format!("{} {}\n", "✓".green().bold(), text)
    }

    /// A session error, with a hint for the kinds the user can act on.
    pub fn error(error: &SessionError) -> String {
        let mut output = format!("{} {}\n", "Error:".red().bold(), error);
        let hint = match error.error_type() {
            SessionErrorType::Unauthenticated | SessionErrorType::SessionExpired => {
                Some("Set PARLEY_AUTH__TOKEN and PARLEY_AUTH__USER_ID, then try again.".to_string())
            }
            SessionErrorType::NoSubscription | SessionErrorType::SubscriptionExpired => error
                .subscription()
                .map(|payload| format!("Subscribe to assistant {} to continue.", payload.assistant_id)),
            SessionErrorType::Generic => None,
        };
        if let Some(hint) = hint {
            output.push_str(&format!("{}\n", hint.dimmed()));
        }
        output
    }

    /// Pretty JSON for `--json`.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> String {
        serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
    }

    fn assistant_label(conversation: &Conversation) -> String {
        conversation
            .assistant_summary
            .as_ref()
            .map(|a| a.name.trim())
            .filter(|name| !name.is_empty())
            .unwrap_or(conversation.assistant_id.as_str())
            .to_string()
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}\n", line.cyan(), title.bold(), line.cyan())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_domain::{AssistantSummary, SubscriptionError, SubscriptionErrorCode};

    #[test]
    fn test_empty_list() {
        assert!(ConsoleFormatter::conversation_list(&[]).contains("No conversations yet."));
    }

    #[test]
    fn test_list_shows_id_title_and_assistant() {
        let mut conversation = Conversation::new("c1", "u1", "asst_1").with_title("Trip planning");
        conversation.assistant_summary = Some(AssistantSummary {
            name: "Travel Agent".to_string(),
            ..Default::default()
        });

        let output = ConsoleFormatter::conversation_list(&[
            conversation,
            Conversation::new("c2", "u1", "asst_2"),
        ]);

        assert!(output.contains("c1"));
        assert!(output.contains("Trip planning"));
        assert!(output.contains("Travel Agent"));
        assert!(output.contains("Untitled conversation"));
        assert!(output.contains("asst_2"));
    }

    #[test]
    fn test_pending_message_is_marked() {
        let message = Message::optimistic(1, "c1", "hi", chrono::Utc::now());
        let output = ConsoleFormatter::message(&message);
        assert!(output.contains("(sending)"));
        assert!(output.contains("hi"));

        let confirmed = Message::confirmed("m1", "c1", Role::Assistant, "hello");
        assert!(!ConsoleFormatter::message(&confirmed).contains("(sending)"));
    }

    #[test]
    fn test_subscription_error_hint_names_assistant() {
        let error = SessionError::Subscription(SubscriptionError::new(
            SubscriptionErrorCode::NoSubscription,
            "No active subscription",
            "asst_9",
        ));

        let output = ConsoleFormatter::error(&error);
        assert!(output.contains("No active subscription"));
        assert!(output.contains("asst_9"));
    }

    #[test]
    fn test_generic_error_has_no_hint() {
        let output = ConsoleFormatter::error(&SessionError::generic("boom"));
        assert_eq!(output.lines().count(), 1);
    }

    #[test]
    fn test_json_of_error_uses_type_tag() {
        let output = ConsoleFormatter::json(&SessionError::SessionExpired);
        assert!(output.contains("\"SESSION_EXPIRED\""));
    }
}
