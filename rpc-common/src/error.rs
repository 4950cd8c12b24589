//! # Error Kinds
//!
//! Purpose: classify every failure an RPC call can surface, and mark which
//! kinds feed the per-service circuit breaker.
//!
//! ## Design Principles
//! 1. **One Kind Per Failure**: a call fails with exactly one `ErrorKind` or
//!    succeeds; kinds are never combined.
//! 2. **Breaker Purity**: only transport-shaped failures (network, timeout,
//!    service-unavailable, uncategorized) feed the breaker. Business and
//!    protocol failures never do.

use std::fmt;

/// Classification of an RPC failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Success,
    NetworkError,
    Timeout,
    ServiceUnavailable,
    ProtocolError,
    BusinessError,
    Unauthorized,
    ResourceExhausted,
    ConfigError,
    InvalidResponse,
    SystemError,
}

impl ErrorKind {
    /// Whether a failure of this kind should be reported to a circuit breaker.
    pub fn feeds_breaker(self) -> bool {
        matches!(
            self,
            ErrorKind::NetworkError
                | ErrorKind::Timeout
                | ErrorKind::ServiceUnavailable
                | ErrorKind::SystemError
        )
    }

    fn label(self) -> &'static str {
        match self {
            ErrorKind::Success => "Success",
            ErrorKind::NetworkError => "Network Error",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::ServiceUnavailable => "Service Unavailable",
            ErrorKind::ProtocolError => "Protocol Error",
            ErrorKind::BusinessError => "Business Error",
            ErrorKind::Unauthorized => "Unauthorized",
            ErrorKind::ResourceExhausted => "Resource Exhausted",
            ErrorKind::ConfigError => "Config Error",
            ErrorKind::InvalidResponse => "Invalid Response",
            ErrorKind::SystemError => "System Error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An error tagged with the [`ErrorKind`] that caused it.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct RpcError {
    pub kind: ErrorKind,
    pub message: String,
}

impl RpcError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        RpcError {
            kind,
            message: message.into(),
        }
    }

    /// The controller-facing text: `"<Category>: <detail>"`.
    pub fn display_text(&self) -> String {
        format!("{}: {}", self.kind, self.message)
    }

    pub fn network(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::NetworkError, detail)
    }

    pub fn timeout(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, detail)
    }

    pub fn service_unavailable(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::ServiceUnavailable, detail)
    }

    pub fn protocol(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::ProtocolError, detail)
    }

    pub fn invalid_response(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidResponse, detail)
    }

    pub fn resource_exhausted(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::ResourceExhausted, detail)
    }

    pub fn config(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigError, detail)
    }

    pub fn system(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::SystemError, detail)
    }
}

pub type RpcResult<T> = Result<T, RpcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breaker_purity() {
        assert!(ErrorKind::NetworkError.feeds_breaker());
        assert!(ErrorKind::Timeout.feeds_breaker());
        assert!(ErrorKind::ServiceUnavailable.feeds_breaker());
        assert!(ErrorKind::SystemError.feeds_breaker());
        assert!(!ErrorKind::BusinessError.feeds_breaker());
        assert!(!ErrorKind::Unauthorized.feeds_breaker());
        assert!(!ErrorKind::ProtocolError.feeds_breaker());
        assert!(!ErrorKind::InvalidResponse.feeds_breaker());
        assert!(!ErrorKind::ConfigError.feeds_breaker());
        assert!(!ErrorKind::ResourceExhausted.feeds_breaker());
    }

    #[test]
    fn display_text_has_category_prefix() {
        let err = RpcError::service_unavailable("UserService");
        assert_eq!(err.display_text(), "Service Unavailable: UserService");
    }
}
