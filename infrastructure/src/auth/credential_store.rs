use async_trait::async_trait;
use parley_application::ports::auth_token_source::AuthTokenSource;
use parley_application::ports::session_listener::SessionInvalidationListener;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{info, warn};

/// Bearer token and the user it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    pub user_id: String,
}

/// Holds the signed-in user's credentials for the lifetime of the process
#[derive(Debug, Default)]
pub struct CredentialStore {
    credentials: RwLock<Option<Credentials>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded from configuration.
    ///
    /// Both values are required; a token without a user (or the reverse)
    /// leaves the store signed out.
    pub fn from_parts(token: Option<String>, user_id: Option<String>) -> Self {
        let store = Self::new();
        match (token, user_id) {
            (Some(token), Some(user_id)) if !token.trim().is_empty() && !user_id.trim().is_empty() => {
                store.sign_in(token, user_id);
            }
            (None, None) => {}
            _ => warn!("Ignoring incomplete credentials: both token and user id are required"),
        }
        store
    }

    pub fn sign_in(&self, token: impl Into<String>, user_id: impl Into<String>) {
        *self.write() = Some(Credentials {
            token: token.into(),
            user_id: user_id.into(),
        });
    }

    pub fn sign_out(&self) {
        *self.write() = None;
    }

    pub fn is_signed_in(&self) -> bool {
        self.read().is_some()
    }

    pub fn credentials(&self) -> Option<Credentials> {
        self.read().clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<Credentials>> {
        self.credentials.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<Credentials>> {
        self.credentials.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl AuthTokenSource for CredentialStore {
    async fn current_token(&self) -> Option<String> {
        self.read().as_ref().map(|c| c.token.clone())
    }

    async fn current_user_id(&self) -> Option<String> {
        self.read().as_ref().map(|c| c.user_id.clone())
    }
}

impl SessionInvalidationListener for CredentialStore {
    fn on_session_invalidated(&self) {
        if self.is_signed_in() {
            info!("Server rejected the session token, signing out");
        }
        self.sign_out();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_signed_in_store_exposes_token() {
        let store = CredentialStore::from_parts(Some("tok".into()), Some("u1".into()));

        assert_eq!(store.current_token().await.as_deref(), Some("tok"));
        assert_eq!(store.current_user_id().await.as_deref(), Some("u1"));
    }

    #[tokio::test]
    async fn test_incomplete_credentials_are_ignored() {
        let store = CredentialStore::from_parts(Some("tok".into()), None);
        assert!(!store.is_signed_in());
        assert_eq!(store.current_token().await, None);

        let store = CredentialStore::from_parts(Some("  ".into()), Some("u1".into()));
        assert!(!store.is_signed_in());
    }

    #[tokio::test]
    async fn test_invalidation_signs_out() {
        let store = CredentialStore::new();
        store.sign_in("tok", "u1");

        store.on_session_invalidated();

        assert!(!store.is_signed_in());
        assert_eq!(store.current_user_id().await, None);
    }
}
