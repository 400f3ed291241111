//! Core domain concepts shared across all subdomains.
//!
//! - [`error::DomainError`]: domain-level errors
//! - [`text`]: small text helpers used for titles and log previews

pub mod error;
pub mod text;
