//! Unified error type for endpoint operations.
//!
//! Absence and failure are distinct kinds here so the engine can tell a
//! missing node apart from a broken filesystem.

use std::io;
use thiserror::Error;

/// Unified error type for endpoint operations.
#[derive(Error, Debug)]
pub enum EndpointError {
    /// Path does not exist. Carries the engine-form path.
    #[error("not found: {0}")]
    NotFound(String),

    /// Underlying filesystem failure (stat/read/write/rename/remove)
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// A leaf node was handed to a collection-only operation
    #[error("wrong node kind: leaf content goes through the data channel")]
    WrongKind,

    /// The endpoint root could not be stat-ed at construction
    #[error("sync root unavailable: {0}")]
    RootUnavailable(String),

    /// OS notifier subscription or mid-stream classification failure
    #[error("watch error: {0}")]
    Watch(String),

    /// Retry helper exhausted its window
    #[error("timeout")]
    Timeout,

    /// Retry aborted by context cancellation
    #[error("cancelled")]
    Cancelled,

    /// Operation is not provided by this endpoint
    #[error("unsupported operation: {0}")]
    Unsupported(String),
}

impl EndpointError {
    /// Create a watch error
    pub fn watch(msg: impl Into<String>) -> Self {
        Self::Watch(msg.into())
    }

    /// Create an unsupported-operation error
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    /// True when the error reports absence rather than failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result type alias for endpoint operations
pub type EndpointResult<T> = Result<T, EndpointError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_error_display() {
        let err = EndpointError::NotFound("a/b.txt".to_string());
        assert_eq!(err.to_string(), "not found: a/b.txt");

        let err = EndpointError::Timeout;
        assert_eq!(err.to_string(), "timeout");
    }

    #[test]
    fn test_endpoint_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let err: EndpointError = io_err.into();
        assert!(matches!(err, EndpointError::Io(_)));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_not_found_is_distinct_from_io() {
        let err = EndpointError::NotFound("missing".to_string());
        assert!(err.is_not_found());
    }
}
