//! Typed conversation endpoints on top of the resilient client.

use crate::client::resilient::decode;
use crate::client::{CallOptions, ResilientClient};
use parley_domain::{ApiError, Conversation, HttpMethod, Message};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

pub const CONVERSATIONS: &str = "/conversations";

pub fn conversation_path(id: &str) -> String {
    format!("{}/{}", CONVERSATIONS, id)
}

pub fn messages_path(id: &str) -> String {
    format!("{}/{}/messages", CONVERSATIONS, id)
}

/// Server reply to a sent message
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SentMessages {
    #[serde(default, alias = "userMessage")]
    pub user_message: Option<Message>,
    #[serde(default, alias = "assistantMessage")]
    pub assistant_message: Option<Message>,
}

impl SentMessages {
    /// Both confirmed messages, in display order, if the server sent both.
    pub fn confirmed(self) -> Option<Vec<Message>> {
        match (self.user_message, self.assistant_message) {
            (Some(user), Some(assistant)) => Some(vec![user, assistant]),
            _ => None,
        }
    }
}

/// Conversation endpoints
#[derive(Clone)]
pub struct ConversationApi {
    client: ResilientClient,
}

impl ConversationApi {
    pub fn new(client: ResilientClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ResilientClient {
        &self.client
    }

    pub async fn list(&self, options: CallOptions) -> Result<Vec<Conversation>, ApiError> {
        let data = self.client.get(CONVERSATIONS, options).await?;
        decode_list(data, "conversations")
    }

    pub async fn create(&self, assistant_id: &str, title: Option<&str>) -> Result<Conversation, ApiError> {
        let body = json!({ "assistant_id": assistant_id, "title": title });
        self.client
            .call_as(CONVERSATIONS, HttpMethod::Post, Some(body), CallOptions::default())
            .await
    }

    pub async fn rename(&self, id: &str, title: &str) -> Result<Conversation, ApiError> {
        let body = json!({ "title": title });
        self.client
            .call_as(&conversation_path(id), HttpMethod::Patch, Some(body), CallOptions::default())
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .delete(&conversation_path(id), CallOptions::default())
            .await
            .map(|_| ())
    }

    pub async fn messages(&self, id: &str, options: CallOptions) -> Result<Vec<Message>, ApiError> {
        let data = self.client.get(&messages_path(id), options).await?;
        let mut messages: Vec<Message> = decode_list(data, "messages")?;
        for message in &mut messages {
            if message.conversation_id.is_empty() {
                message.conversation_id = id.to_string();
            }
        }
        Ok(messages)
    }

    pub async fn send(&self, id: &str, content: &str) -> Result<SentMessages, ApiError> {
        let body = json!({ "content": content });
        let data = self
            .client
            .call(&messages_path(id), HttpMethod::Post, Some(body), CallOptions::default())
            .await?;
        if data.is_null() {
            return Ok(SentMessages::default());
        }
        let mut sent: SentMessages = decode(data)?;
        for message in sent.user_message.iter_mut().chain(sent.assistant_message.iter_mut()) {
            if message.conversation_id.is_empty() {
                message.conversation_id = id.to_string();
            }
        }
        Ok(sent)
    }

    pub fn invalidate_list(&self) {
        self.client.invalidate_reads(CONVERSATIONS);
    }

    pub fn invalidate_messages(&self, id: &str) {
        self.client.invalidate_reads(&messages_path(id));
    }
}

/// Lists arrive either bare or wrapped as `{ "<field>": [...] }`.
fn decode_list<T: DeserializeOwned>(data: Value, field: &str) -> Result<Vec<T>, ApiError> {
    match data {
        Value::Null => Ok(Vec::new()),
        Value::Object(mut map) if map.contains_key(field) => {
            decode(map.remove(field).unwrap_or(Value::Null))
        }
        other => decode(other),
    }
}
