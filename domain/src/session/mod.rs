//! Conversation session state machine.
//!
//! - [`state::SessionState`]: what the UI renders
//! - [`event::SessionEvent`]: every transition the session can make
//! - [`reducer::reduce`]: pure `(state, event) -> state`
//! - [`token::SelectionToken`]: fence against late selection results

pub mod event;
pub mod reducer;
pub mod state;
pub mod token;
