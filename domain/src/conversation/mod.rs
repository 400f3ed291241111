//! Conversation domain.
//!
//! - [`entities::Conversation`]: a chat with one assistant
//! - [`entities::Message`]: a single message, optimistic or confirmed
//! - [`subscription::SubscriptionError`]: structured subscription-gated failure
//! - [`snapshot::ConversationSnapshot`]: persisted list used as an optimistic seed

pub mod entities;
pub mod snapshot;
pub mod subscription;
