//! Failure Injection for the Mock Notary
//!
//! Supports configurable failure injection for testing error paths.

use crate::client::transport::TransportError;

/// Failure modes a mock notary can exhibit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// Connection refused / DNS failure.
    Unreachable,
    /// Request timed out.
    Timeout,
    /// HTTP error status.
    HttpStatus(u16),
    /// A response arrived but does not parse as a metadata bundle.
    MalformedPayload,
}

impl MockFailure {
    /// The transport error this failure mode produces.
    pub fn to_error(self) -> TransportError {
        match self {
            MockFailure::Unreachable => {
                TransportError::ConnectionFailed("connection refused (injected)".to_string())
            }
            MockFailure::Timeout => TransportError::Timeout,
            MockFailure::HttpStatus(status) => TransportError::HttpStatus { status },
            MockFailure::MalformedPayload => {
                TransportError::InvalidPayload("injected garbage payload".to_string())
            }
        }
    }
}

/// Failure configuration for fetch handling.
#[derive(Debug, Clone)]
pub struct FailureConfig {
    /// The failure mode to exhibit.
    pub failure: MockFailure,

    /// Number of fetches to fail before succeeding (None = always fail).
    pub fail_count: Option<u32>,
}

impl FailureConfig {
    /// Create a config that always fails with the given mode.
    pub fn always(failure: MockFailure) -> Self {
        Self {
            failure,
            fail_count: None,
        }
    }

    /// Create a config that fails a fixed number of times, then succeeds.
    pub fn times(failure: MockFailure, count: u32) -> Self {
        Self {
            failure,
            fail_count: Some(count),
        }
    }

    /// Consume one failure, returning the error to inject if any remain.
    pub fn next_failure(&mut self) -> Option<TransportError> {
        match &mut self.fail_count {
            None => Some(self.failure.to_error()),
            Some(0) => None,
            Some(remaining) => {
                *remaining -= 1;
                Some(self.failure.to_error())
            }
        }
    }
}
