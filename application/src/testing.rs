//! Hand-written port doubles shared by the application tests.

use crate::ports::auth_token_source::AuthTokenSource;
use crate::ports::session_listener::SessionInvalidationListener;
use crate::ports::snapshot_store::{SnapshotStore, StoreError};
use crate::ports::transport::{Transport, TransportError, TransportRequest, TransportResponse};
use async_trait::async_trait;
use parley_domain::HttpMethod;
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;

pub const BASE_URL: &str = "http://test.local/api";

type Reply = Result<TransportResponse, TransportError>;

#[derive(Clone)]
struct Scripted {
    reply: Reply,
    delay: Duration,
}

/// A request as the transport saw it
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: HttpMethod,
    pub path: String,
    pub request: TransportRequest,
    pub at: Instant,
}

/// Transport answering from per-route scripts.
///
/// Each route replays its replies in order; the last one repeats. Unknown
/// routes answer 404.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<(HttpMethod, String), VecDeque<Scripted>>>,
    recorded: Mutex<Vec<Recorded>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, method: HttpMethod, path: &str, reply: Reply) -> Self {
        self.on_delayed(method, path, Duration::ZERO, reply)
    }

    pub fn on_delayed(self, method: HttpMethod, path: &str, delay: Duration, reply: Reply) -> Self {
        self.push(method, path, delay, reply);
        self
    }

    /// Add a reply to a route after construction.
    pub fn push(&self, method: HttpMethod, path: &str, delay: Duration, reply: Reply) {
        self.routes
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(Scripted { reply, delay });
    }

    pub fn calls(&self, method: HttpMethod, path: &str) -> usize {
        self.recorded
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.recorded.lock().unwrap().len()
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.recorded.lock().unwrap().clone()
    }

    fn next_reply(&self, method: HttpMethod, path: &str) -> Scripted {
        let mut routes = self.routes.lock().unwrap();
        match routes.get_mut(&(method, path.to_string())) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) if !queue.is_empty() => queue[0].clone(),
            _ => Scripted {
                reply: status(404, json!({"success": false, "error": "Not found"})),
                delay: Duration::ZERO,
            },
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn perform(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let path = request
            .url
            .strip_prefix(BASE_URL)
            .unwrap_or(&request.url)
            .to_string();
        self.recorded.lock().unwrap().push(Recorded {
            method: request.method,
            path: path.clone(),
            request: request.clone(),
            at: Instant::now(),
        });
        let scripted = self.next_reply(request.method, &path);
        if !scripted.delay.is_zero() {
            tokio::time::sleep(scripted.delay).await;
        }
        scripted.reply
    }
}

/// `200 {"success": true, "data": data}`
pub fn ok(data: Value) -> Reply {
    status(200, json!({"success": true, "data": data}))
}

pub fn status(code: u16, body: Value) -> Reply {
    Ok(TransportResponse::new(code, body.to_string()))
}

pub fn raw(code: u16, body: &str) -> Reply {
    Ok(TransportResponse::new(code, body))
}

pub fn offline() -> Reply {
    Err(TransportError::Connection("connection refused".to_string()))
}

/// Token source whose credentials can change during a test.
pub struct TestAuth {
    token: Mutex<Option<String>>,
    user_id: Mutex<Option<String>>,
}

impl TestAuth {
    pub fn signed_in(user_id: &str) -> Self {
        Self {
            token: Mutex::new(Some(format!("token-{}", user_id))),
            user_id: Mutex::new(Some(user_id.to_string())),
        }
    }

    pub fn signed_out() -> Self {
        Self {
            token: Mutex::new(None),
            user_id: Mutex::new(None),
        }
    }
}

#[async_trait]
impl AuthTokenSource for TestAuth {
    async fn current_token(&self) -> Option<String> {
        self.token.lock().unwrap().clone()
    }

    async fn current_user_id(&self) -> Option<String> {
        self.user_id.lock().unwrap().clone()
    }
}

/// Counts invalidation signals.
#[derive(Default)]
pub struct CountingListener {
    count: AtomicUsize,
}

impl CountingListener {
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl SessionInvalidationListener for CountingListener {
    fn on_session_invalidated(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

/// In-memory snapshot store.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl SnapshotStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.entries.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}
