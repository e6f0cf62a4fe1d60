use thiserror::Error;

/// Core domain errors
///
/// Errors are `Clone` because a single batch outcome is shared by every
/// caller waiting on the same key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("Not found: {key}")]
    NotFound { key: String },

    #[error("Remote fetch failed for {key}: {message}")]
    RemoteFetch { key: String, message: String },

    #[error("Wrong type: expected {expected}, got {actual}")]
    WrongType { expected: String, actual: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Cancelled: {message}")]
    Cancelled { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    pub fn remote_fetch(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RemoteFetch {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn wrong_type(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::WrongType {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::Cancelled {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    pub fn is_wrong_type(&self) -> bool {
        matches!(self, Self::WrongType { .. })
    }
}
