//! Transport port
//!
//! Defines the single HTTP primitive the resilient client is built on.
//! Any HTTP-capable adapter satisfying this shape is acceptable.

use async_trait::async_trait;
use parley_domain::HttpMethod;
use serde_json::Value;
use thiserror::Error;

/// Errors raised when no response reached the client at all
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Other error: {0}")]
    Other(String),
}

/// A fully resolved HTTP request
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub url: String,
    pub method: HttpMethod,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl TransportRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: Option<Value>) -> Self {
        self.body = body;
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Raw HTTP response
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    /// Reason phrase of the status line, when known
    pub reason: Option<String>,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            reason: None,
            body: body.into(),
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse the body as JSON.
    pub fn json(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(&self.body)
    }

    /// `"HTTP 404 Not Found"`, or `"HTTP 404"` when the reason is unknown.
    pub fn status_line(&self) -> String {
        match &self.reason {
            Some(reason) if !reason.is_empty() => format!("HTTP {} {}", self.status, reason),
            _ => format!("HTTP {}", self.status),
        }
    }
}

/// Performs one HTTP exchange.
///
/// Implementations must not retry, cache or classify; that is the client's job.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn perform(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}
