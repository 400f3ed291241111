//! Domain error types

use thiserror::Error;

/// Domain-level errors
///
/// Raised when a value coming from outside the domain (config, CLI, wire)
/// cannot be turned into a domain type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Unknown HTTP method: {0}")]
    UnknownMethod(String),

    #[error("Unknown subscription error code: {0}")]
    UnknownErrorCode(String),

    #[error("Invalid conversation title: {0}")]
    InvalidTitle(String),

    #[error("Message content is empty")]
    EmptyMessage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_method_display() {
        let error = DomainError::UnknownMethod("BREW".to_string());
        assert_eq!(error.to_string(), "Unknown HTTP method: BREW");
    }

    #[test]
    fn test_empty_message_display() {
        assert_eq!(DomainError::EmptyMessage.to_string(), "Message content is empty");
    }
}
