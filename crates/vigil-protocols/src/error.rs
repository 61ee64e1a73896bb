//! Protocol error types.

use thiserror::Error;

/// Errors returned by a [`TelemetryBackend`](crate::TelemetryBackend).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// Connection-level failure (DNS, refused, reset).
    #[error("Network error: {0}")]
    Network(String),

    /// Request did not complete within the configured wait.
    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    /// Backend answered with a non-success status.
    #[error("Backend returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Response body could not be decoded.
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl BackendError {
    /// HTTP status if the backend answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the failure came from the transport rather than the backend.
    pub fn is_transport(&self) -> bool {
        matches!(self, BackendError::Network(_) | BackendError::Timeout(_))
    }
}

/// Errors raised by the push channel.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Handshake or TCP connect failed.
    #[error("Connection failed: {0}")]
    Connect(String),

    /// Connect attempt exceeded its maximum wait.
    #[error("Connection attempt timed out after {0} ms")]
    Timeout(u64),

    /// Protocol-level failure on an open connection.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_accessor() {
        let err = BackendError::Status {
            status: 404,
            message: "Alert not found".to_string(),
        };
        assert_eq!(err.status(), Some(404));
        assert!(!err.is_transport());
        assert!(err.to_string().contains("404"));
    }

    #[test]
    fn test_transport_classification() {
        assert!(BackendError::Network("refused".into()).is_transport());
        assert!(BackendError::Timeout(5000).is_transport());
        assert!(!BackendError::Decode("eof".into()).is_transport());
        assert_eq!(BackendError::Timeout(10).status(), None);
    }

    #[test]
    fn test_transport_error_display() {
        let err = TransportError::Timeout(10_000);
        assert!(err.to_string().contains("10000"));
        let err = TransportError::Protocol("reset without closing handshake".into());
        assert!(err.to_string().contains("Protocol"));
    }
}
