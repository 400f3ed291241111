//! Subscription-gated failures.
//!
//! When a user talks to an assistant they have no (or an expired) subscription
//! for, the API answers with a structured payload instead of a plain message.
//! The payload is kept intact all the way up to [`SessionError`] so that the
//! UI can offer a renewal or purchase prompt for the right assistant.
//!
//! [`SessionError`]: crate::session::state::SessionError

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Machine-readable subscription failure code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionErrorCode {
    SubscriptionExpired,
    NoSubscription,
}

impl SubscriptionErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionErrorCode::SubscriptionExpired => "SUBSCRIPTION_EXPIRED",
            SubscriptionErrorCode::NoSubscription => "NO_SUBSCRIPTION",
        }
    }
}

impl std::fmt::Display for SubscriptionErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SubscriptionErrorCode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUBSCRIPTION_EXPIRED" => Ok(SubscriptionErrorCode::SubscriptionExpired),
            "NO_SUBSCRIPTION" => Ok(SubscriptionErrorCode::NoSubscription),
            other => Err(DomainError::UnknownErrorCode(other.to_string())),
        }
    }
}

/// Structured payload of a subscription-gated failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionError {
    pub error_code: SubscriptionErrorCode,
    pub message: String,
    pub assistant_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_expired: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expired_at: Option<String>,
}

/// Lenient view of a response body used while probing for a payload.
#[derive(Deserialize)]
struct RawSubscriptionBody {
    error_code: Option<String>,
    message: Option<String>,
    error: Option<String>,
    assistant_id: Option<String>,
    subscription_id: Option<String>,
    days_expired: Option<i64>,
    expired_at: Option<String>,
}

impl SubscriptionError {
    pub fn new(
        error_code: SubscriptionErrorCode,
        message: impl Into<String>,
        assistant_id: impl Into<String>,
    ) -> Self {
        Self {
            error_code,
            message: message.into(),
            assistant_id: assistant_id.into(),
            subscription_id: None,
            days_expired: None,
            expired_at: None,
        }
    }

    /// Look for a subscription payload in a response body.
    ///
    /// The payload may sit at the top level of the body or under `data`.
    /// Bodies without a recognised `error_code` yield `None`.
    pub fn from_body(body: &Value) -> Option<Self> {
        Self::from_object(body).or_else(|| body.get("data").and_then(Self::from_object))
    }

    fn from_object(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        let raw: RawSubscriptionBody = serde_json::from_value(value.clone()).ok()?;
        let error_code = raw.error_code?.parse::<SubscriptionErrorCode>().ok()?;
        let message = raw
            .message
            .or(raw.error)
            .unwrap_or_else(|| default_message(error_code).to_string());

        Some(Self {
            error_code,
            message,
            assistant_id: raw.assistant_id.unwrap_or_default(),
            subscription_id: raw.subscription_id,
            days_expired: raw.days_expired,
            expired_at: raw.expired_at,
        })
    }
}

fn default_message(code: SubscriptionErrorCode) -> &'static str {
    match code {
        SubscriptionErrorCode::SubscriptionExpired => "Your subscription has expired",
        SubscriptionErrorCode::NoSubscription => "A subscription is required for this assistant",
    }
}
