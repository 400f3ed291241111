//! Session parameters.

use serde::{Deserialize, Serialize};

pub const DEFAULT_SNAPSHOT_KEY: &str = "conversations";

/// Parameters for [`ConversationSession`](crate::use_cases::conversation_session::ConversationSession).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionParams {
    /// Key under which the conversation list snapshot is persisted.
    pub snapshot_key: String,
}

impl Default for SessionParams {
    fn default() -> Self {
        Self {
            snapshot_key: DEFAULT_SNAPSHOT_KEY.to_string(),
        }
    }
}

impl SessionParams {
    pub fn with_snapshot_key(mut self, key: impl Into<String>) -> Self {
        self.snapshot_key = key.into();
        self
    }
}
