//! Selection fence.
//!
//! Every selection bumps a sequence number. Work started for an older
//! selection carries the older token and is dropped when it completes.

/// Identity of one selection attempt
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SelectionToken {
    pub conversation_id: String,
    pub seq: u64,
}

impl SelectionToken {
    pub fn new(conversation_id: impl Into<String>, seq: u64) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            seq,
        }
    }

    /// Whether this token is still the latest selection.
    pub fn is_current(&self, latest_seq: u64) -> bool {
        self.seq == latest_seq
    }
}
