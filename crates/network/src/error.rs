// crates/network/src/error.rs
//! Error types for network operations

use crate::transport::TransportError;
use reqwest::StatusCode;
use stowage_core::RangeError;
use thiserror::Error;

/// Result type for network operations
pub type NetworkResult<T> = Result<T, NetworkError>;

/// Errors that can occur during network operations
///
/// Only a recoverable [`NetworkError::Transport`] describes a connection
/// hiccup; every other variant means the download cannot succeed as
/// configured.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// HTTP client construction error
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error while writing downloaded data
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Failure reported by the transport
    #[error("Transport failure: {0}")]
    Transport(#[from] TransportError),

    /// Caller-supplied request conflicts with resumable download requirements
    #[error("Request is incompatible with resumable download: {0}")]
    IncompatibleRequest(String),

    /// Response headers missing, malformed or inconsistent with the download
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// The first response was not a success
    #[error("Server returned HTTP {status} for {url}")]
    Status { status: StatusCode, url: String },

    /// Byte range could not be built or parsed
    #[error("Invalid byte range: {0}")]
    Range(#[from] RangeError),

    /// The marker could not be advanced for a continuation
    #[error("Continuation {attempt} failed: {source}")]
    ContinuationFailed {
        attempt: u32,
        #[source]
        source: RangeError,
    },

    /// The continuation request itself failed
    #[error("Continuation request {attempt} failed: {source}")]
    ContinuationRequestFailed {
        attempt: u32,
        #[source]
        source: TransportError,
    },

    /// The configured continuation ceiling was hit
    #[error("Maximum of {max} download continuations reached: {source}")]
    MaxContinuationsReached {
        max: u32,
        #[source]
        source: TransportError,
    },

    /// `cancel` was called on an already cancelled coordinator
    #[error("Resumable download coordinator was already cancelled")]
    AlreadyCancelled,

    /// The download was aborted and delivers no further bytes
    #[error("Download was cancelled")]
    Cancelled,

    /// Custom error
    #[error("{0}")]
    Custom(String),
}

impl NetworkError {
    /// Returns true if the error is a connection hiccup worth another try
    pub fn is_retryable(&self) -> bool {
        match self {
            NetworkError::Transport(e) => !e.is_fatal(),
            _ => false,
        }
    }

    /// Returns true if the download can never succeed as configured
    pub fn is_fatal(&self) -> bool {
        !self.is_retryable()
    }

    /// Returns true if the server answered with a 4xx status
    pub fn is_client_error(&self) -> bool {
        matches!(self, NetworkError::Status { status, .. } if status.is_client_error())
    }

    /// Returns true if the server answered with a 5xx status
    pub fn is_server_error(&self) -> bool {
        matches!(self, NetworkError::Status { status, .. } if status.is_server_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stowage_resilience::FailureKind;

    #[test]
    fn test_error_display() {
        let err = NetworkError::InvalidUrl("test".to_string());
        assert!(err.to_string().contains("Invalid URL"));
    }

    #[test]
    fn test_recoverable_transport_is_retryable() {
        let err = NetworkError::Transport(TransportError::new(FailureKind::Other, "reset"));
        assert!(err.is_retryable());
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_fatal_variants() {
        let dns = NetworkError::Transport(TransportError::new(FailureKind::UnknownHost, "nx"));
        assert!(dns.is_fatal());
        assert!(NetworkError::UnexpectedResponse("etag".into()).is_fatal());
        assert!(NetworkError::IncompatibleRequest("range".into()).is_fatal());
        assert!(NetworkError::ContinuationRequestFailed {
            attempt: 1,
            source: TransportError::new(FailureKind::Other, "reset"),
        }
        .is_fatal());
    }

    #[test]
    fn test_status_classification() {
        let err = NetworkError::Status {
            status: StatusCode::NOT_FOUND,
            url: "http://example.com/a".into(),
        };
        assert!(err.is_client_error());
        assert!(!err.is_server_error());
        assert!(err.to_string().contains("404"));
    }
}
