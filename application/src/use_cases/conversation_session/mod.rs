//! Conversation session use case.
//!
//! [`ConversationSession`] drives the pure session reducer with effects: it
//! calls the conversation API through the resilient client, persists the
//! conversation list snapshot, and publishes every new state to subscribers.
//!
//! # Supersession
//!
//! Work is split into two categories, each with its own
//! [`CancellationToken`]: *selection* (switching conversation, loading its
//! messages) and *messaging* (sending). Starting a selection cancels the
//! previous one; creating a conversation cancels both. Every selection also
//! bumps a sequence number captured in a [`SelectionToken`]; results whose
//! token is no longer current are dropped without touching state. Superseded
//! work resolves to [`Outcome::Superseded`] and never records an error.
//!
//! State lives behind a `std::sync::Mutex` that is never held across an
//! `.await`, so every transition is atomic with respect to the others.

pub mod api;

use crate::client::{CallOptions, ResilientClient};
use crate::config::SessionParams;
use crate::ports::auth_token_source::AuthTokenSource;
use crate::ports::session_event_logger::{NoSessionEventLogger, SessionEventLogger, SessionLogEvent};
use crate::ports::snapshot_store::{NoSnapshotStore, SnapshotStore};
use api::ConversationApi;
use chrono::Utc;
use parley_domain::{
    Conversation, ConversationSnapshot, Message, SelectionToken, SessionError, SessionEvent,
    SessionState, normalize_title, reduce,
};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How a session operation ended, when it did not fail
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The operation ran and its result was applied.
    Completed(T),
    /// Nothing to do; the requested state is already in place.
    Unchanged,
    /// A newer operation took over; the result was discarded.
    Superseded,
    /// Another operation of the same kind is still running.
    Busy,
    /// The input was blank.
    Ignored,
}

impl<T> Outcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed(_))
    }

    pub fn completed(self) -> Option<T> {
        match self {
            Outcome::Completed(value) => Some(value),
            _ => None,
        }
    }
}

/// Cancellation handles and the selection sequence
struct Control {
    selection: CancellationToken,
    messaging: CancellationToken,
    selection_seq: u64,
}

impl Control {
    fn new() -> Self {
        Self {
            selection: CancellationToken::new(),
            messaging: CancellationToken::new(),
            selection_seq: 0,
        }
    }

    fn supersede_selection(&mut self) -> CancellationToken {
        self.selection.cancel();
        self.selection = CancellationToken::new();
        self.selection_seq += 1;
        self.selection.clone()
    }

    fn supersede_messaging(&mut self) -> CancellationToken {
        self.messaging.cancel();
        self.messaging = CancellationToken::new();
        self.messaging.clone()
    }
}

/// The conversation session state machine
pub struct ConversationSession {
    api: ConversationApi,
    auth: Arc<dyn AuthTokenSource>,
    store: Arc<dyn SnapshotStore>,
    logger: Arc<dyn SessionEventLogger>,
    params: SessionParams,
    state: Mutex<SessionState>,
    updates: watch::Sender<SessionState>,
    control: Mutex<Control>,
    next_local_id: AtomicU64,
}

impl ConversationSession {
    pub fn new(client: ResilientClient) -> Self {
        let (updates, _) = watch::channel(SessionState::new());
        Self {
            auth: Arc::clone(client.auth()),
            api: ConversationApi::new(client),
            store: Arc::new(NoSnapshotStore),
            logger: Arc::new(NoSessionEventLogger),
            params: SessionParams::default(),
            state: Mutex::new(SessionState::new()),
            updates,
            control: Mutex::new(Control::new()),
            next_local_id: AtomicU64::new(1),
        }
    }

    pub fn with_snapshot_store(mut self, store: Arc<dyn SnapshotStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_event_logger(mut self, logger: Arc<dyn SessionEventLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_params(mut self, params: SessionParams) -> Self {
        self.params = params;
        self
    }

    pub fn api(&self) -> &ConversationApi {
        &self.api
    }

    // ==================== Read access ====================

    /// Copy of the current state.
    pub fn state(&self) -> SessionState {
        self.lock_state().clone()
    }

    /// Receiver that sees every published state.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.updates.subscribe()
    }

    // ==================== Operations ====================

    /// Create a conversation with `assistant_id` and make it current.
    pub async fn create_conversation(
        &self,
        assistant_id: &str,
        title: Option<&str>,
    ) -> Result<Conversation, SessionError> {
        let Some(user_id) = self.auth.current_user_id().await else {
            return Err(self.fail(SessionEvent::Failed, SessionError::Unauthenticated));
        };
        let title = normalize_title(title)
            .map_err(|e| self.fail(SessionEvent::Failed, SessionError::generic(e.to_string())))?;

        {
            let mut control = self.lock_control();
            control.supersede_selection();
            control.supersede_messaging();
        }
        self.apply(SessionEvent::CreateRequested);

        match self.api.create(assistant_id, title.as_deref()).await {
            Ok(mut conversation) => {
                if conversation.user_id.is_empty() {
                    conversation.user_id = user_id.clone();
                }
                info!("Created conversation {}", conversation.id);
                self.apply(SessionEvent::ConversationCreated(conversation.clone()));
                self.api.invalidate_list();
                self.persist_snapshot(&user_id);
                Ok(conversation)
            }
            Err(e) => Err(self.fail(SessionEvent::CreateFailed, e.into())),
        }
    }

    /// Load the conversation list, painting the persisted snapshot first.
    pub async fn load_conversations(&self) -> Result<Vec<Conversation>, SessionError> {
        let user_id = self.auth.current_user_id().await;

        let seed = user_id.as_deref().and_then(|id| self.read_snapshot(id));
        let seeded = seed.is_some();
        if let Some(snapshot) = seed {
            debug!("Seeding {} conversations from snapshot", snapshot.conversations.len());
            self.apply(SessionEvent::ConversationsSeeded(snapshot.conversations));
        }
        self.apply(SessionEvent::ConversationsRequested);

        match self.api.list(CallOptions::default()).await {
            Ok(conversations) => {
                self.apply(SessionEvent::ConversationsLoaded(conversations.clone()));
                if let Some(user_id) = &user_id {
                    self.persist_snapshot(user_id);
                }
                Ok(conversations)
            }
            Err(e) => {
                let error: SessionError = e.into();
                warn!("Loading conversations failed: {}", error);
                self.apply(SessionEvent::ConversationsFailed {
                    error: error.clone(),
                    seeded,
                });
                Err(error)
            }
        }
    }

    /// Switch to conversation `id` and load its messages.
    pub async fn select_conversation(&self, id: &str) -> Result<Outcome<Vec<Message>>, SessionError> {
        let Some((token, cancel)) = self.begin_selection(id) else {
            debug!("Conversation {} already selected", id);
            return Ok(Outcome::Unchanged);
        };

        let known = self.lock_state().find_conversation(id).is_some();
        if !known {
            debug!("Conversation {} not in list, refetching", id);
            let listed = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(Outcome::Superseded),
                listed = self.api.list(CallOptions::default().skip_cache()) => listed,
            };
            if !self.is_current(&token) {
                return Ok(Outcome::Superseded);
            }
            match listed {
                Ok(conversations) => {
                    self.apply(SessionEvent::ConversationsLoaded(conversations));
                    if let Some(user_id) = self.auth.current_user_id().await {
                        self.persist_snapshot(&user_id);
                    }
                }
                Err(e) => return Err(self.fail(SessionEvent::SelectionFailed, e.into())),
            }
            if self.lock_state().find_conversation(id).is_none() {
                return Err(self.fail(
                    SessionEvent::SelectionFailed,
                    SessionError::generic("Conversation not found"),
                ));
            }
        }

        self.fetch_messages(&token, &cancel, CallOptions::default()).await
    }

    /// Fetch the messages of `id`.
    ///
    /// The message list in state is only replaced when `id` is the selected
    /// conversation; otherwise the messages are just returned.
    pub async fn load_messages(&self, id: &str) -> Result<Outcome<Vec<Message>>, SessionError> {
        let fence = {
            let control = self.lock_control();
            let selected = self.lock_state().is_selected(id);
            selected.then(|| {
                (
                    SelectionToken::new(id, control.selection_seq),
                    control.selection.clone(),
                )
            })
        };

        match fence {
            Some((token, cancel)) => self.fetch_messages(&token, &cancel, CallOptions::default()).await,
            None => self
                .api
                .messages(id, CallOptions::default())
                .await
                .map(Outcome::Completed)
                .map_err(SessionError::from),
        }
    }

    /// Send `content` to the current conversation.
    pub async fn send_message(&self, content: &str) -> Result<Outcome<Vec<Message>>, SessionError> {
        let content = content.trim();

        let (conversation_id, local_id, seq, cancel) = {
            let mut control = self.lock_control();
            let (conversation_id, typing) = {
                let state = self.lock_state();
                (
                    state.current_conversation_id().map(str::to_string),
                    state.flags.typing,
                )
            };
            let Some(conversation_id) = conversation_id else {
                drop(control);
                return Err(self.fail(
                    SessionEvent::Failed,
                    SessionError::generic("No conversation selected"),
                ));
            };
            if typing {
                return Ok(Outcome::Busy);
            }
            if content.is_empty() {
                return Ok(Outcome::Ignored);
            }

            let local_id = self.next_local_id.fetch_add(1, Ordering::Relaxed);
            let cancel = control.supersede_messaging();
            self.apply(SessionEvent::MessageQueued(Message::optimistic(
                local_id,
                conversation_id.clone(),
                content,
                Utc::now(),
            )));
            (conversation_id, local_id, control.selection_seq, cancel)
        };

        let sent = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(Outcome::Superseded),
            sent = self.api.send(&conversation_id, content) => sent,
        };

        if sent.is_ok() {
            self.api.invalidate_messages(&conversation_id);
        }
        if !self.still_on(&conversation_id, seq) {
            debug!("Dropping send result for {}, selection changed", conversation_id);
            return Ok(Outcome::Superseded);
        }

        match sent {
            Ok(sent) => match sent.confirmed() {
                Some(confirmed) => {
                    self.apply(SessionEvent::MessageDelivered {
                        local_id,
                        confirmed: confirmed.clone(),
                    });
                    Ok(Outcome::Completed(confirmed))
                }
                None => {
                    debug!("Send reply without messages, reloading {}", conversation_id);
                    let token = SelectionToken::new(conversation_id.as_str(), seq);
                    let reload_cancel = self.lock_control().selection.clone();
                    let reloaded = self
                        .fetch_messages(&token, &reload_cancel, CallOptions::default().skip_cache())
                        .await;
                    if self.still_on(&conversation_id, seq) {
                        self.apply(SessionEvent::MessageDelivered {
                            local_id,
                            confirmed: Vec::new(),
                        });
                    }
                    reloaded
                }
            },
            Err(e) => {
                let error: SessionError = e.into();
                warn!("Sending to {} failed: {}", conversation_id, error);
                self.apply(SessionEvent::MessageFailed {
                    local_id,
                    error: error.clone(),
                });
                Err(error)
            }
        }
    }

    /// Delete conversation `id`, clearing the selection if it was current.
    pub async fn delete_conversation(&self, id: &str) -> Result<(), SessionError> {
        if let Err(e) = self.api.delete(id).await {
            return Err(self.fail(SessionEvent::Failed, e.into()));
        }

        {
            let mut control = self.lock_control();
            if self.lock_state().is_selected(id) {
                control.supersede_selection();
                control.supersede_messaging();
            }
        }
        info!("Deleted conversation {}", id);
        self.apply(SessionEvent::ConversationRemoved(id.to_string()));
        self.api.invalidate_list();
        self.api.invalidate_messages(id);
        if let Some(user_id) = self.auth.current_user_id().await {
            self.persist_snapshot(&user_id);
        }
        Ok(())
    }

    /// Rename conversation `id` and apply the server-confirmed result.
    pub async fn rename_conversation(&self, id: &str, title: &str) -> Result<Conversation, SessionError> {
        let title = match normalize_title(Some(title)) {
            Ok(Some(title)) => title,
            Ok(None) => {
                return Err(self.fail(SessionEvent::Failed, SessionError::generic("Title cannot be empty")));
            }
            Err(e) => return Err(self.fail(SessionEvent::Failed, SessionError::generic(e.to_string()))),
        };

        match self.api.rename(id, &title).await {
            Ok(conversation) => {
                self.apply(SessionEvent::ConversationUpdated(conversation.clone()));
                self.api.invalidate_list();
                if let Some(user_id) = self.auth.current_user_id().await {
                    self.persist_snapshot(&user_id);
                }
                Ok(conversation)
            }
            Err(e) => Err(self.fail(SessionEvent::Failed, e.into())),
        }
    }

    /// Dismiss the current error.
    pub fn clear_error(&self) {
        self.apply(SessionEvent::ErrorCleared);
    }

    // ==================== Internals ====================

    /// Start a selection of `id`, or `None` when it is already selected and
    /// either current or still loading.
    fn begin_selection(&self, id: &str) -> Option<(SelectionToken, CancellationToken)> {
        let mut control = self.lock_control();
        {
            let state = self.lock_state();
            let already = state.is_selected(id)
                && (state.flags.transitioning || state.current_conversation_id() == Some(id));
            if already {
                return None;
            }
        }
        let cancel = control.supersede_selection();
        let token = SelectionToken::new(id, control.selection_seq);
        self.apply(SessionEvent::SelectionStarted {
            conversation_id: id.to_string(),
        });
        Some((token, cancel))
    }

    async fn fetch_messages(
        &self,
        token: &SelectionToken,
        cancel: &CancellationToken,
        options: CallOptions,
    ) -> Result<Outcome<Vec<Message>>, SessionError> {
        self.apply(SessionEvent::MessagesRequested);
        let loaded = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(Outcome::Superseded),
            loaded = self.api.messages(&token.conversation_id, options) => loaded,
        };
        if !self.is_current(token) {
            debug!("Dropping stale messages for {}", token.conversation_id);
            return Ok(Outcome::Superseded);
        }

        match loaded {
            Ok(messages) => {
                self.apply(SessionEvent::MessagesLoaded {
                    conversation_id: token.conversation_id.clone(),
                    messages: messages.clone(),
                });
                Ok(Outcome::Completed(messages))
            }
            Err(e) => Err(self.fail(SessionEvent::MessagesFailed, e.into())),
        }
    }

    fn is_current(&self, token: &SelectionToken) -> bool {
        token.is_current(self.lock_control().selection_seq)
    }

    /// Whether the selection is unchanged since `seq` and still shows `conversation_id`.
    fn still_on(&self, conversation_id: &str, seq: u64) -> bool {
        let control = self.lock_control();
        control.selection_seq == seq && self.lock_state().current_conversation_id() == Some(conversation_id)
    }

    /// Apply `event`, publish the new state, and log it.
    fn apply(&self, event: SessionEvent) {
        debug!("Session event: {}", event.name());
        self.logger
            .log(SessionLogEvent::new(event.name(), log_payload(&event)));

        let next = {
            let mut state = self.lock_state();
            let next = reduce(std::mem::take(&mut *state), event);
            *state = next.clone();
            next
        };
        self.updates.send_replace(next);
    }

    /// Record `error` through the event built by `event` and hand it back.
    fn fail(&self, event: fn(SessionError) -> SessionEvent, error: SessionError) -> SessionError {
        self.apply(event(error.clone()));
        error
    }

    fn read_snapshot(&self, user_id: &str) -> Option<ConversationSnapshot> {
        let value = match self.store.get(&self.params.snapshot_key) {
            Ok(value) => value?,
            Err(e) => {
                warn!("Reading conversation snapshot failed: {}", e);
                return None;
            }
        };
        match serde_json::from_value::<ConversationSnapshot>(value) {
            Ok(snapshot) if snapshot.belongs_to(user_id) => Some(snapshot),
            Ok(_) => None,
            Err(e) => {
                warn!("Ignoring unreadable conversation snapshot: {}", e);
                None
            }
        }
    }

    fn persist_snapshot(&self, user_id: &str) {
        let conversations = self.lock_state().conversations.clone();
        let snapshot = ConversationSnapshot::new(user_id, conversations);
        let result = serde_json::to_value(&snapshot)
            .map_err(Into::into)
            .and_then(|value| self.store.set(&self.params.snapshot_key, value));
        if let Err(e) = result {
            warn!("Persisting conversation snapshot failed: {}", e);
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_control(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Structured payload for the session event log.
fn log_payload(event: &SessionEvent) -> Value {
    if let Some(error) = event.error() {
        return json!({ "error": error });
    }
    match event {
        SessionEvent::ConversationsSeeded(list) | SessionEvent::ConversationsLoaded(list) => {
            json!({ "count": list.len() })
        }
        SessionEvent::ConversationCreated(conversation) | SessionEvent::ConversationUpdated(conversation) => {
            json!({
                "conversation_id": conversation.id,
                "assistant_id": conversation.assistant_id,
                "title": conversation.title,
            })
        }
        SessionEvent::SelectionStarted { conversation_id } => json!({ "conversation_id": conversation_id }),
        SessionEvent::ConversationRemoved(id) => json!({ "conversation_id": id }),
        SessionEvent::MessagesLoaded {
            conversation_id,
            messages,
        } => json!({ "conversation_id": conversation_id, "count": messages.len() }),
        SessionEvent::MessageQueued(message) => json!({
            "conversation_id": message.conversation_id,
            "message_id": message.id.to_string(),
            "length": message.content.len(),
        }),
        SessionEvent::MessageDelivered { local_id, confirmed } => {
            json!({ "local_id": local_id, "confirmed": confirmed.len() })
        }
        _ => json!({}),
    }
}
