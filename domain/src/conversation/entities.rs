//! Conversation domain entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Role of a message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Short description of the assistant a conversation is held with
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantSummary {
    pub id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub avatar_url: Option<String>,
}

/// A chat conversation between a user and an assistant (Entity)
///
/// Only ever mutated with server-confirmed data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    pub assistant_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "thread_id", skip_serializing_if = "Option::is_none")]
    pub thread_ref: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    #[serde(default, alias = "assistant", skip_serializing_if = "Option::is_none")]
    pub assistant_summary: Option<AssistantSummary>,
}

impl Conversation {
    pub fn new(id: impl Into<String>, user_id: impl Into<String>, assistant_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            user_id: user_id.into(),
            assistant_id: assistant_id.into(),
            title: String::new(),
            thread_ref: None,
            created_at: now,
            updated_at: now,
            assistant_summary: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Title to show when the server left it blank.
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            "Untitled conversation"
        } else {
            &self.title
        }
    }
}

/// Identity of a message
///
/// User messages start life as `Optimistic` entries with a locally generated
/// id and are replaced by `Confirmed` entries once the server answers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageId {
    Optimistic { local_id: u64 },
    Confirmed { server_id: String },
}

impl MessageId {
    pub fn is_optimistic(&self) -> bool {
        matches!(self, MessageId::Optimistic { .. })
    }

    pub fn server_id(&self) -> Option<&str> {
        match self {
            MessageId::Confirmed { server_id } => Some(server_id),
            MessageId::Optimistic { .. } => None,
        }
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageId::Optimistic { local_id } => write!(f, "pending#{}", local_id),
            MessageId::Confirmed { server_id } => f.write_str(server_id),
        }
    }
}

/// A single chat message (Entity)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(deserialize_with = "deserialize_message_id")]
    pub id: MessageId,
    #[serde(default)]
    pub conversation_id: String,
    pub role: Role,
    pub content: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// A user message shown before the server has confirmed it.
    pub fn optimistic(
        local_id: u64,
        conversation_id: impl Into<String>,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MessageId::Optimistic { local_id },
            conversation_id: conversation_id.into(),
            role: Role::User,
            content: content.into(),
            created_at,
        }
    }

    pub fn confirmed(
        server_id: impl Into<String>,
        conversation_id: impl Into<String>,
        role: Role,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: MessageId::Confirmed {
                server_id: server_id.into(),
            },
            conversation_id: conversation_id.into(),
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn is_optimistic(&self) -> bool {
        self.id.is_optimistic()
    }
}

/// Server ids arrive as plain strings or numbers; the tagged form is accepted
/// too so serialized state can be read back.
fn deserialize_message_id<'de, D>(deserializer: D) -> Result<MessageId, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::String(server_id) => Ok(MessageId::Confirmed { server_id }),
        Value::Number(n) => Ok(MessageId::Confirmed {
            server_id: n.to_string(),
        }),
        tagged @ Value::Object(_) => {
            serde_json::from_value(tagged).map_err(serde::de::Error::custom)
        }
        other => Err(serde::de::Error::custom(format!(
            "invalid message id: {}",
            other
        ))),
    }
}
