//! Request identity and call outcomes.
//!
//! - [`method::HttpMethod`]: the HTTP verb, and whether it is a cacheable read
//! - [`key::RequestKey`]: deterministic identity of a logical request
//! - [`outcome::ApiResult`] / [`outcome::ApiError`]: normalized call result
//! - [`envelope::ApiEnvelope`]: `{ success, data?, error? }` wire contract

pub mod envelope;
pub mod key;
pub mod method;
pub mod outcome;
