//! Auth token source port
//!
//! The external session provider is out of scope; the client only needs the
//! freshest known bearer credential, or `None` when signed out.

use async_trait::async_trait;

#[async_trait]
pub trait AuthTokenSource: Send + Sync {
    /// Current bearer token, if any.
    async fn current_token(&self) -> Option<String>;

    /// Id of the signed-in user, if any.
    async fn current_user_id(&self) -> Option<String>;
}

/// Token source for unauthenticated use.
pub struct NoAuth;

#[async_trait]
impl AuthTokenSource for NoAuth {
    async fn current_token(&self) -> Option<String> {
        None
    }

    async fn current_user_id(&self) -> Option<String> {
        None
    }
}

/// Fixed credentials, mostly useful in tests and scripts.
#[derive(Debug, Clone)]
pub struct StaticTokenSource {
    token: Option<String>,
    user_id: Option<String>,
}

impl StaticTokenSource {
    pub fn new(token: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            user_id: Some(user_id.into()),
        }
    }

    pub fn anonymous() -> Self {
        Self {
            token: None,
            user_id: None,
        }
    }
}

#[async_trait]
impl AuthTokenSource for StaticTokenSource {
    async fn current_token(&self) -> Option<String> {
        self.token.clone()
    }

    async fn current_user_id(&self) -> Option<String> {
        self.user_id.clone()
    }
}
