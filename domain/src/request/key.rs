//! Logical request identity.
//!
//! A [`RequestKey`] is shared by the response cache, the in-flight registry,
//! the rate limiter and the retry counters. Two requests with the same method,
//! endpoint and body always map to the same key.

use super::method::HttpMethod;
use serde_json::Value;

/// Deterministic identity of a logical request (Value Object)
///
/// Rendered as `"{METHOD} {endpoint}"`, with `"|{body}"` appended when the
/// request carries a body. Bodies are serialized with object keys sorted so
/// equal bodies produce equal keys regardless of construction order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestKey(String);

impl RequestKey {
    pub fn new(method: HttpMethod, endpoint: &str, body: Option<&Value>) -> Self {
        let mut key = Self::prefix(method, endpoint);
        if let Some(body) = body {
            key.push('|');
            write_canonical(body, &mut key);
        }
        Self(key)
    }

    /// Key prefix matching every request of `method` whose endpoint starts
    /// with `endpoint`.
    pub fn prefix(method: HttpMethod, endpoint: &str) -> String {
        format!("{} {}", method, normalize_endpoint(endpoint))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

impl std::fmt::Display for RequestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (k, v)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(k.clone()).to_string());
                out.push(':');
                write_canonical(v, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, v) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(v, out);
            }
            out.push(']');
        }
        other => out.push_str(&other.to_string()),
    }
}

/// Strip a trailing slash and make sure the endpoint is rooted.
fn normalize_endpoint(endpoint: &str) -> String {
    let trimmed = endpoint.trim();
    let trimmed = if trimmed.len() > 1 {
        trimmed.trim_end_matches('/')
    } else {
        trimmed
    };
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}
