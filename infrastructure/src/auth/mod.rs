//! Credential adapters.
//!
//! [`CredentialStore`] implements both the
//! [`AuthTokenSource`](parley_application::AuthTokenSource) and the
//! [`SessionInvalidationListener`](parley_application::SessionInvalidationListener)
//! ports: the client reads the token from it, and a rejected token signs the
//! user out.

mod credential_store;

pub use credential_store::{CredentialStore, Credentials};
