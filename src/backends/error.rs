//! Error kinds reported by collaborator services.

use std::time::Duration;
use thiserror::Error;

/// Failure of a single collaborator call (classifier, provider, search, context).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// The call did not finish within its time limit.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The service could not be reached.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The service answered but reported itself busy or broken (5xx-equivalent).
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// The service rejected the call because a quota was exceeded.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The service answered with something we could not use.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Credentials were missing or rejected.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The request itself was rejected as malformed.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// The collaborator has no handling for this request (e.g. unknown intent).
    #[error("unsupported: {0}")]
    Unsupported(String),
}

/// Result type for collaborator calls.
pub type BackendResult<T> = Result<T, BackendError>;

impl BackendError {
    /// Transient kinds worth another attempt. Input and auth errors fail fast.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BackendError::Timeout(_)
                | BackendError::Connection(_)
                | BackendError::Unavailable(_)
                | BackendError::RateLimited(_)
        )
    }

    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            BackendError::Timeout(_) => "timeout",
            BackendError::Connection(_) => "connection",
            BackendError::Unavailable(_) => "unavailable",
            BackendError::RateLimited(_) => "rate_limited",
            BackendError::InvalidResponse(_) => "invalid_response",
            BackendError::Unauthorized(_) => "unauthorized",
            BackendError::MalformedInput(_) => "malformed_input",
            BackendError::Unsupported(_) => "unsupported",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        assert!(BackendError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(BackendError::Connection("reset".into()).is_retryable());
        assert!(BackendError::Unavailable("503".into()).is_retryable());
        assert!(BackendError::RateLimited("429".into()).is_retryable());

        assert!(!BackendError::InvalidResponse("garbage".into()).is_retryable());
        assert!(!BackendError::Unauthorized("bad key".into()).is_retryable());
        assert!(!BackendError::MalformedInput("empty".into()).is_retryable());
        assert!(!BackendError::Unsupported("intent".into()).is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = BackendError::RateLimited("quota exceeded".into());
        assert_eq!(err.to_string(), "rate limited: quota exceeded");
        assert_eq!(err.kind(), "rate_limited");
    }
}
