//! Persisted conversation list snapshot.
//!
//! Written after every authoritative list change and read once, at the start
//! of a list load, to paint the last known conversations before the network
//! answers.

use super::entities::Conversation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSnapshot {
    pub conversations: Vec<Conversation>,
    pub last_updated: DateTime<Utc>,
    pub user_id: String,
}

impl ConversationSnapshot {
    pub fn new(user_id: impl Into<String>, conversations: Vec<Conversation>) -> Self {
        Self {
            conversations,
            last_updated: Utc::now(),
            user_id: user_id.into(),
        }
    }

    /// A snapshot is only a valid seed for the user who wrote it.
    pub fn belongs_to(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}
