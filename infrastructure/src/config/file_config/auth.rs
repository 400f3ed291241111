//! Credentials (`[auth]` section)
//!
//! Usually supplied through `PARLEY_AUTH__TOKEN` and `PARLEY_AUTH__USER_ID`
//! rather than written to a file.

use serde::{Deserialize, Serialize};

/// Raw auth configuration from TOML or environment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAuthConfig {
    pub token: Option<String>,
    pub user_id: Option<String>,
}

impl FileAuthConfig {
    /// Redacted copy for `--show-config`.
    pub fn redacted(&self) -> Self {
        Self {
            token: self.token.as_ref().map(|_| "********".to_string()),
            user_id: self.user_id.clone(),
        }
    }
}
