//! [`Transport`] over a shared `reqwest::Client`.
//!
//! The adapter performs exactly one HTTP exchange per call. Status codes are
//! passed through untouched; classification, retries and caching happen in
//! the resilient client.

use async_trait::async_trait;
use parley_application::ports::transport::{
    Transport, TransportError, TransportRequest, TransportResponse,
};
use parley_domain::HttpMethod;
use std::time::Duration;
use tracing::trace;

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("parley/", env!("CARGO_PKG_VERSION"));

/// HTTP transport backed by `reqwest`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| TransportError::Other(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn perform(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        trace!("{} {}", request.method, request.url);

        let mut builder = self.client.request(to_method(request.method), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(map_error)?;
        let status = response.status();
        let reason = status.canonical_reason().map(str::to_string);
        let body = response.text().await.map_err(map_error)?;

        let mut response = TransportResponse::new(status.as_u16(), body);
        if let Some(reason) = reason {
            response = response.with_reason(reason);
        }
        Ok(response)
    }
}

fn to_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

fn map_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else if error.is_builder() {
        TransportError::InvalidRequest(error.to_string())
    } else if error.is_connect() || error.is_request() {
        TransportError::Connection(error.to_string())
    } else {
        TransportError::Other(error.to_string())
    }
}
