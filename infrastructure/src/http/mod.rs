//! HTTP transport adapter.
//!
//! Provides [`ReqwestTransport`], the production implementation of the
//! [`Transport`](parley_application::Transport) port.

mod reqwest_transport;

pub use reqwest_transport::{DEFAULT_TIMEOUT, ReqwestTransport};
