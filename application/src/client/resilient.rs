//! Resilient client: the single entry point for remote calls.
//!
//! Per call, in order:
//!
//! 1. compute the [`RequestKey`]
//! 2. answer reads from the [`ResponseCache`] unless told to skip it
//! 3. hand the call to the [`RequestDeduplicator`], whose task runs the
//!    [`RetryPolicy`] around a single attempt: rate limit wait, auth header,
//!    transport call, classification
//! 4. store successful reads in the cache
//!
//! Every call resolves to an [`ApiResult`]; transport faults, HTTP failures
//! and malformed bodies are all classified into an [`ApiError`].

use super::cache::ResponseCache;
use super::dedup::RequestDeduplicator;
use super::rate_limiter::RateLimiter;
use super::retry::RetryPolicy;
use crate::config::ClientParams;
use crate::ports::auth_token_source::AuthTokenSource;
use crate::ports::session_listener::{NoSessionListener, SessionInvalidationListener};
use crate::ports::transport::{Transport, TransportRequest, TransportResponse};
use parley_domain::{ApiEnvelope, ApiError, ApiResult, HttpMethod, RequestKey, SubscriptionError};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Whether a call needs a bearer token
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthMode {
    /// No token means the call fails without touching the network.
    #[default]
    Required,
    /// No token means the call goes out unauthenticated.
    Optional,
}

/// Per-call options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallOptions {
    pub auth: AuthMode,
    pub skip_cache: bool,
}

impl CallOptions {
    pub fn optional_auth(mut self) -> Self {
        self.auth = AuthMode::Optional;
        self
    }

    pub fn skip_cache(mut self) -> Self {
        self.skip_cache = true;
        self
    }
}

/// The pieces of a call that every attempt reuses
struct PreparedCall {
    method: HttpMethod,
    url: String,
    body: Option<Value>,
    auth: AuthMode,
}

/// Cache, deduplication, rate limiting and retries around a [`Transport`].
///
/// Cloning is cheap and clones share all state. Independently constructed
/// clients share nothing.
#[derive(Clone)]
pub struct ResilientClient {
    params: Arc<ClientParams>,
    transport: Arc<dyn Transport>,
    auth: Arc<dyn AuthTokenSource>,
    listener: Arc<dyn SessionInvalidationListener>,
    cache: Arc<ResponseCache>,
    rate_limiter: Arc<RateLimiter>,
    retry: Arc<RetryPolicy>,
    dedup: Arc<RequestDeduplicator>,
}

impl ResilientClient {
    pub fn new(transport: Arc<dyn Transport>, auth: Arc<dyn AuthTokenSource>, params: ClientParams) -> Self {
        Self {
            cache: Arc::new(ResponseCache::new(params.cache_ttl)),
            rate_limiter: Arc::new(RateLimiter::new(params.min_request_interval)),
            retry: Arc::new(RetryPolicy::new(params.max_retries, params.retry_base_delay)),
            dedup: Arc::new(RequestDeduplicator::new()),
            params: Arc::new(params),
            transport,
            auth,
            listener: Arc::new(NoSessionListener),
        }
    }

    /// Set the listener notified when the server rejects the credential.
    pub fn with_invalidation_listener(mut self, listener: Arc<dyn SessionInvalidationListener>) -> Self {
        self.listener = listener;
        self
    }

    pub fn params(&self) -> &ClientParams {
        &self.params
    }

    pub fn auth(&self) -> &Arc<dyn AuthTokenSource> {
        &self.auth
    }

    // ==================== Calls ====================

    /// Perform one logical request.
    pub async fn call(
        &self,
        endpoint: &str,
        method: HttpMethod,
        body: Option<Value>,
        options: CallOptions,
    ) -> ApiResult {
        let key = RequestKey::new(method, endpoint, body.as_ref());

        if method.is_read() && !options.skip_cache {
            if let Some(cached) = self.cache.get(&key) {
                return Ok(cached);
            }
        }

        let call = PreparedCall {
            method,
            url: self.params.url_for(endpoint),
            body,
            auth: options.auth,
        };
        let client = self.clone();
        let task_key = key.clone();

        self.dedup
            .run(key, move || async move {
                let result = client
                    .retry
                    .execute(&task_key, || client.attempt(&task_key, &call))
                    .await;
                if call.method.is_read() {
                    if let Ok(value) = &result {
                        client.cache.set(task_key.clone(), value.clone());
                    }
                }
                result
            })
            .await
    }

    /// Like [`call`](Self::call), decoding `data` into `T`.
    ///
    /// A payload that does not match `T` is an `Unexpected` failure.
    pub async fn call_as<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        method: HttpMethod,
        body: Option<Value>,
        options: CallOptions,
    ) -> Result<T, ApiError> {
        let value = self.call(endpoint, method, body, options).await?;
        decode(value)
    }

    pub async fn get(&self, endpoint: &str, options: CallOptions) -> ApiResult {
        self.call(endpoint, HttpMethod::Get, None, options).await
    }

    pub async fn post(&self, endpoint: &str, body: Value, options: CallOptions) -> ApiResult {
        self.call(endpoint, HttpMethod::Post, Some(body), options).await
    }

    pub async fn patch(&self, endpoint: &str, body: Value, options: CallOptions) -> ApiResult {
        self.call(endpoint, HttpMethod::Patch, Some(body), options).await
    }

    pub async fn delete(&self, endpoint: &str, options: CallOptions) -> ApiResult {
        self.call(endpoint, HttpMethod::Delete, None, options).await
    }

    // ==================== Cache control ====================

    /// Drop cached responses whose key starts with `prefix` (all when `None`).
    pub fn invalidate(&self, prefix: Option<&str>) -> usize {
        self.cache.invalidate(prefix)
    }

    /// Drop cached reads of `endpoint` and everything below it.
    pub fn invalidate_reads(&self, endpoint: &str) -> usize {
        let prefix = RequestKey::prefix(HttpMethod::Get, endpoint);
        self.cache.invalidate(Some(&prefix))
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    pub fn in_flight(&self) -> usize {
        self.dedup.in_flight()
    }

    // ==================== Single attempt ====================

    async fn attempt(&self, key: &RequestKey, call: &PreparedCall) -> ApiResult {
        self.rate_limiter.wait(key).await;

        let mut request = TransportRequest::new(call.method, &call.url).with_body(call.body.clone());
        match self.auth.current_token().await {
            Some(token) => {
                request = request.with_header("Authorization", format!("Bearer {}", token));
            }
            None if call.auth == AuthMode::Required => {
                debug!("No token for {}, not sending", key);
                return Err(ApiError::missing_token());
            }
            None => {}
        }

        debug!("{} {}", call.method, call.url);
        let response = match self.transport.perform(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!("{} {} failed: {}", call.method, call.url, e);
                return Err(ApiError::connectivity(e.to_string()));
            }
        };

        let result = classify(&response);
        if let Err(error) = &result {
            debug!("{} {} -> {}: {}", call.method, call.url, response.status, error);
            if error.is_session_expired() {
                info!("Session rejected by server, signalling invalidation");
                self.listener.on_session_invalidated();
            }
        }
        result
    }
}

/// Decode a successful payload into `T`.
pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value)
        .map_err(|e| ApiError::unexpected(format!("Unexpected response payload: {}", e)))
}

/// Turn an HTTP response into an [`ApiResult`].
pub fn classify(response: &TransportResponse) -> ApiResult {
    let status = response.status;
    let body = response.json().ok();

    if response.is_success() {
        let Some(body) = body else {
            return Err(ApiError::connectivity("Invalid response from server"));
        };
        let envelope: ApiEnvelope<Value> = match serde_json::from_value(body.clone()) {
            Ok(envelope) => envelope,
            Err(_) => return Err(ApiError::connectivity("Invalid response from server")),
        };
        if envelope.success {
            return Ok(envelope.data.unwrap_or(Value::Null));
        }
        if let Some(payload) = SubscriptionError::from_body(&body) {
            return Err(ApiError::subscription(payload));
        }
        let message = envelope.error.unwrap_or_else(|| "Request failed".to_string());
        return Err(ApiError::server(status, message));
    }

    match status {
        401 => Err(ApiError::session_expired()),
        429 => Err(ApiError::rate_limited(
            body.as_ref()
                .and_then(body_message)
                .unwrap_or_else(|| "Too many requests".to_string()),
        )),
        _ => {
            if let Some(payload) = body.as_ref().and_then(SubscriptionError::from_body) {
                return Err(ApiError::subscription(payload));
            }
            let message = body
                .as_ref()
                .and_then(body_message)
                .unwrap_or_else(|| response.status_line());
            Err(ApiError::server(status, message))
        }
    }
}

/// Human-readable message from an error body: `error`, then `message`.
fn body_message(body: &Value) -> Option<String> {
    ["error", "message"]
        .iter()
        .filter_map(|field| body.get(*field).and_then(Value::as_str))
        .find(|s| !s.trim().is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{BASE_URL, CountingListener, MockTransport, TestAuth, ok, offline, raw, status};
    use parley_domain::{AuthFailure, ErrorKind, SubscriptionErrorCode};
    use serde_json::json;
    use std::time::Duration;
    use tokio::time::Instant;

    fn params() -> ClientParams {
        ClientParams::default().with_base_url(BASE_URL)
    }

    fn client(transport: MockTransport) -> (ResilientClient, Arc<MockTransport>) {
        let transport = Arc::new(transport);
        let client = ResilientClient::new(
            transport.clone(),
            Arc::new(TestAuth::signed_in("u1")),
            params(),
        );
        (client, transport)
    }

    // -- Classification --

    #[test]
    fn classify_success_returns_data() {
        let response = TransportResponse::new(200, r#"{"success":true,"data":{"id":"c1"}}"#);
        assert_eq!(classify(&response).unwrap(), json!({"id": "c1"}));
    }

    #[test]
    fn classify_success_without_data_is_null() {
        let response = TransportResponse::new(200, r#"{"success":true}"#);
        assert_eq!(classify(&response).unwrap(), Value::Null);
    }

    #[test]
    fn classify_non_json_success_is_connectivity() {
        let response = TransportResponse::new(200, "<html>gateway</html>");
        assert_eq!(classify(&response).unwrap_err().kind, ErrorKind::Connectivity);

        let response = TransportResponse::new(200, r#"{"items": []}"#);
        assert_eq!(classify(&response).unwrap_err().kind, ErrorKind::Connectivity);
    }

    #[test]
    fn classify_envelope_failure_uses_error_field() {
        let response = TransportResponse::new(200, r#"{"success":false,"error":"Title too long"}"#);
        let error = classify(&response).unwrap_err();
        assert_eq!(error.kind, ErrorKind::Server { status: 200 });
        assert_eq!(error.message, "Title too long");
    }

    #[test]
    fn classify_401_is_session_expired() {
        let error = classify(&TransportResponse::new(401, "")).unwrap_err();
        assert_eq!(error.kind, ErrorKind::Authentication(AuthFailure::SessionExpired));
        assert_eq!(error.message, "Session expired");
    }

    #[test]
    fn classify_429_is_rate_limited() {
        let error = classify(&TransportResponse::new(429, "")).unwrap_err();
        assert!(error.is_retryable());
    }

    #[test]
    fn classify_server_error_prefers_body_message() {
        let response = TransportResponse::new(422, r#"{"success":false,"error":"Invalid title"}"#);
        assert_eq!(classify(&response).unwrap_err().message, "Invalid title");

        let response = TransportResponse::new(400, r#"{"message":"Bad input"}"#);
        assert_eq!(classify(&response).unwrap_err().message, "Bad input");
    }

    #[test]
    fn classify_server_error_falls_back_to_status_line() {
        let response = TransportResponse::new(502, "upstream down").with_reason("Bad Gateway");
        let error = classify(&response).unwrap_err();
        assert_eq!(error.kind, ErrorKind::Server { status: 502 });
        assert_eq!(error.message, "HTTP 502 Bad Gateway");
    }

    #[test]
    fn classify_keeps_subscription_payload() {
        let response = TransportResponse::new(
            403,
            json!({
                "success": false,
                "error": "No subscription",
                "error_code": "NO_SUBSCRIPTION",
                "assistant_id": "asst_1"
            })
            .to_string(),
        );
        let error = classify(&response).unwrap_err();
        let payload = error.subscription_payload().unwrap();
        assert_eq!(payload.error_code, SubscriptionErrorCode::NoSubscription);
        assert_eq!(payload.assistant_id, "asst_1");
    }

    #[test]
    fn decode_mismatch_is_unexpected() {
        let error = decode::<Vec<String>>(json!({"not": "a list"})).unwrap_err();
        assert_eq!(error.kind, ErrorKind::Unexpected);
    }

    // -- Caching --

    #[tokio::test(start_paused = true)]
    async fn reads_are_cached_until_ttl() {
        let (client, transport) =
            client(MockTransport::new().on(HttpMethod::Get, "/conversations", ok(json!([]))));

        client.get("/conversations", CallOptions::default()).await.unwrap();
        tokio::time::advance(Duration::from_secs(29)).await;
        client.get("/conversations", CallOptions::default()).await.unwrap();
        assert_eq!(transport.calls(HttpMethod::Get, "/conversations"), 1);

        tokio::time::advance(Duration::from_secs(2)).await;
        client.get("/conversations", CallOptions::default()).await.unwrap();
        assert_eq!(transport.calls(HttpMethod::Get, "/conversations"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn skip_cache_forces_network() {
        let (client, transport) =
            client(MockTransport::new().on(HttpMethod::Get, "/conversations", ok(json!([]))));

        client.get("/conversations", CallOptions::default()).await.unwrap();
        client
            .get("/conversations", CallOptions::default().skip_cache())
            .await
            .unwrap();
        assert_eq!(transport.calls(HttpMethod::Get, "/conversations"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn writes_and_failures_are_not_cached() {
        let (client, transport) = client(
            MockTransport::new()
                .on(HttpMethod::Post, "/conversations", ok(json!({"id": "c1"})))
                .on(HttpMethod::Get, "/broken", status(500, json!({"error": "boom"}))),
        );

        client
            .post("/conversations", json!({"assistant_id": "a"}), CallOptions::default())
            .await
            .unwrap();
        assert!(client.get("/broken", CallOptions::default()).await.is_err());
        assert_eq!(client.cached_entries(), 0);
        assert_eq!(transport.total_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn invalidate_reads_drops_matching_entries() {
        let (client, transport) = client(
            MockTransport::new()
                .on(HttpMethod::Get, "/conversations", ok(json!([])))
                .on(HttpMethod::Get, "/assistants", ok(json!([]))),
        );

        client.get("/conversations", CallOptions::default()).await.unwrap();
        client.get("/assistants", CallOptions::default()).await.unwrap();
        assert_eq!(client.invalidate_reads("/conversations"), 1);

        client.get("/conversations", CallOptions::default()).await.unwrap();
        client.get("/assistants", CallOptions::default()).await.unwrap();
        assert_eq!(transport.calls(HttpMethod::Get, "/conversations"), 2);
        assert_eq!(transport.calls(HttpMethod::Get, "/assistants"), 1);
    }

    // -- Deduplication --

    #[tokio::test(start_paused = true)]
    async fn concurrent_identical_calls_hit_network_once() {
        let (client, transport) = client(MockTransport::new().on_delayed(
            HttpMethod::Get,
            "/conversations",
            Duration::from_millis(200),
            ok(json!([{"id": "c1"}])),
        ));

        let calls = (0..4).map(|_| client.get("/conversations", CallOptions::default()));
        let results = futures::future::join_all(calls).await;

        assert_eq!(transport.calls(HttpMethod::Get, "/conversations"), 1);
        for result in results {
            assert_eq!(result.unwrap(), json!([{"id": "c1"}]));
        }
        assert_eq!(client.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn bodies_distinguish_requests() {
        let (client, transport) = client(
            MockTransport::new().on_delayed(
                HttpMethod::Post,
                "/conversations",
                Duration::from_millis(50),
                ok(json!({"id": "c1"})),
            ),
        );

        let (a, b) = tokio::join!(
            client.post("/conversations", json!({"title": "A"}), CallOptions::default()),
            client.post("/conversations", json!({"title": "B"}), CallOptions::default())
        );
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(transport.calls(HttpMethod::Post, "/conversations"), 2);
    }

    // -- Rate limiting --

    #[tokio::test(start_paused = true)]
    async fn sequential_calls_are_spaced_by_min_interval() {
        let (client, transport) =
            client(MockTransport::new().on(HttpMethod::Get, "/conversations", ok(json!([]))));

        let options = CallOptions::default().skip_cache();
        client.get("/conversations", options).await.unwrap();
        client.get("/conversations", options).await.unwrap();

        let recorded = transport.recorded();
        assert_eq!(recorded.len(), 2);
        assert!(recorded[1].at - recorded[0].at >= Duration::from_secs(1));
    }

    // -- Retries --

    #[tokio::test(start_paused = true)]
    async fn rate_limited_call_is_retried_then_fails() {
        let (client, transport) = client(
            MockTransport::new().on(HttpMethod::Get, "/busy", status(429, json!({"error": "slow down"}))),
        );

        let start = Instant::now();
        let error = client.get("/busy", CallOptions::default()).await.unwrap_err();
        assert_eq!(error.kind, ErrorKind::RateLimited);
        assert_eq!(error.message, "slow down");
        assert_eq!(transport.calls(HttpMethod::Get, "/busy"), 4);

        let recorded = transport.recorded();
        let gaps: Vec<Duration> = recorded.windows(2).map(|w| w[1].at - w[0].at).collect();
        assert!(gaps[1] > gaps[0]);
        assert!(gaps[2] > gaps[1]);
        // 1s + 2s + 4s of backoff
        assert!(Instant::now() - start >= Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limited_then_success_resolves_ok() {
        let (client, transport) = client(
            MockTransport::new()
                .on(HttpMethod::Get, "/busy", status(429, json!({})))
                .on(HttpMethod::Get, "/busy", ok(json!("done"))),
        );

        assert_eq!(client.get("/busy", CallOptions::default()).await.unwrap(), json!("done"));
        assert_eq!(transport.calls(HttpMethod::Get, "/busy"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn other_failures_are_attempted_once() {
        let (client, transport) = client(
            MockTransport::new()
                .on(HttpMethod::Get, "/offline", offline())
                .on(HttpMethod::Get, "/server", status(500, json!({})))
                .on(HttpMethod::Get, "/garbage", raw(200, "not json")),
        );

        for path in ["/offline", "/server", "/garbage"] {
            assert!(client.get(path, CallOptions::default()).await.is_err());
            assert_eq!(transport.calls(HttpMethod::Get, path), 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn transport_fault_is_connectivity() {
        let (client, _) = client(MockTransport::new().on(HttpMethod::Get, "/offline", offline()));
        let error = client.get("/offline", CallOptions::default()).await.unwrap_err();
        assert_eq!(error.kind, ErrorKind::Connectivity);
    }

    // -- Authentication --

    #[tokio::test(start_paused = true)]
    async fn bearer_token_is_attached() {
        let (client, transport) =
            client(MockTransport::new().on(HttpMethod::Get, "/me", ok(json!({}))));

        client.get("/me", CallOptions::default()).await.unwrap();
        let recorded = transport.recorded();
        assert_eq!(recorded[0].request.header("Authorization"), Some("Bearer token-u1"));
    }

    #[tokio::test(start_paused = true)]
    async fn required_auth_without_token_never_hits_network() {
        let transport = Arc::new(MockTransport::new().on(HttpMethod::Get, "/me", ok(json!({}))));
        let client = ResilientClient::new(transport.clone(), Arc::new(TestAuth::signed_out()), params());

        let error = client.get("/me", CallOptions::default()).await.unwrap_err();
        assert_eq!(error.kind, ErrorKind::Authentication(AuthFailure::MissingToken));
        assert_eq!(transport.total_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn optional_auth_without_token_goes_out_bare() {
        let transport = Arc::new(MockTransport::new().on(HttpMethod::Get, "/assistants", ok(json!([]))));
        let client = ResilientClient::new(transport.clone(), Arc::new(TestAuth::signed_out()), params());

        client
            .get("/assistants", CallOptions::default().optional_auth())
            .await
            .unwrap();
        let recorded = transport.recorded();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].request.header("Authorization"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn unauthorized_signals_invalidation_and_fails() {
        let listener = Arc::new(CountingListener::default());
        let transport = Arc::new(MockTransport::new().on(HttpMethod::Get, "/me", status(401, json!({}))));
        let client = ResilientClient::new(transport.clone(), Arc::new(TestAuth::signed_in("u1")), params())
            .with_invalidation_listener(listener.clone());

        let error = client.get("/me", CallOptions::default()).await.unwrap_err();
        assert!(error.is_session_expired());
        assert_eq!(listener.count(), 1);
        assert_eq!(transport.total_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn clients_do_not_share_state() {
        let transport = Arc::new(MockTransport::new().on(HttpMethod::Get, "/conversations", ok(json!([]))));
        let auth: Arc<dyn AuthTokenSource> = Arc::new(TestAuth::signed_in("u1"));
        let first = ResilientClient::new(transport.clone(), auth.clone(), params());
        let second = ResilientClient::new(transport.clone(), auth, params());

        first.get("/conversations", CallOptions::default()).await.unwrap();
        second.get("/conversations", CallOptions::default()).await.unwrap();
        assert_eq!(transport.calls(HttpMethod::Get, "/conversations"), 2);
        assert_eq!(first.cached_entries(), 1);
        assert_eq!(second.cached_entries(), 1);
    }
}
