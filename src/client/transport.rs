//! Transport Layer for the Notary Client
//!
//! Abstracts the trust-service connection for testability:
//! - `Transport` trait: interface for fetching metadata bundles
//! - `MockTransport`: in-process mock notary for unit tests
//! - `HttpTransport`: real HTTPS connection for production
//!
//! Transports make no trust decisions; they move bytes and classify only
//! transport-level outcomes.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use trust_metadata::SignedMetadataBundle;

use crate::mock::MockNotary;

/// Transport trait for metadata fetches.
pub trait Transport: Send + Sync {
    /// Fetch the signed metadata bundle for a repository.
    fn fetch_bundle(&self, repository: &str) -> Result<SignedMetadataBundle, TransportError>;
}

/// Transport errors.
///
/// Everything except `InvalidPayload` means "we could not ask"; the lane's
/// classifier folds those into a single unreachable-server failure.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("connection timed out")]
    Timeout,

    #[error("server returned HTTP status {status}")]
    HttpStatus { status: u16 },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid metadata payload: {0}")]
    InvalidPayload(String),
}

/// HTTP transport configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Base URL of the trust service, e.g. `https://notary.docker.io`.
    pub endpoint: String,

    /// Overall request timeout. A timeout is an unreachable server.
    pub timeout: Duration,

    /// Optional `Authorization` header value for the trust service.
    pub authorization: Option<String>,
}

/// HTTPS transport for production use.
///
/// One GET per fetch against the bundle path for the repository. No retries:
/// retrying against a possibly malicious server is a caller decision.
pub struct HttpTransport {
    agent: ureq::Agent,
    config: HttpConfig,
}

impl HttpTransport {
    /// Create a transport with a bounded-timeout agent.
    pub fn new(config: HttpConfig) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(config.timeout).build();
        Self { agent, config }
    }

    /// URL of the metadata bundle for a repository.
    fn bundle_url(&self, repository: &str) -> String {
        format!(
            "{}/v2/{}/_trust/tuf/bundle.json",
            self.config.endpoint.trim_end_matches('/'),
            repository
        )
    }
}

impl Transport for HttpTransport {
    fn fetch_bundle(&self, repository: &str) -> Result<SignedMetadataBundle, TransportError> {
        let url = self.bundle_url(repository);

        let mut request = self.agent.get(&url);
        if let Some(authorization) = &self.config.authorization {
            request = request.set("Authorization", authorization);
        }

        let response = match request.call() {
            Ok(response) => response,
            Err(ureq::Error::Status(status, _)) => {
                return Err(TransportError::HttpStatus { status });
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(TransportError::ConnectionFailed(transport.to_string()));
            }
        };

        let body = response
            .into_string()
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        SignedMetadataBundle::from_json(&body)
            .map_err(|e| TransportError::InvalidPayload(e.to_string()))
    }
}

/// Mock transport for testing: serves bundles from an in-process mock notary.
pub struct MockTransport {
    notary: Arc<MockNotary>,
}

impl MockTransport {
    /// Create a mock transport with a fresh mock notary.
    pub fn new() -> Self {
        Self {
            notary: Arc::new(MockNotary::new()),
        }
    }

    /// Create a mock transport backed by a shared notary, so tests keep a
    /// handle for publishing and failure injection.
    pub fn with_notary(notary: Arc<MockNotary>) -> Self {
        Self { notary }
    }

    /// The underlying mock notary.
    pub fn notary(&self) -> &MockNotary {
        &self.notary
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    fn fetch_bundle(&self, repository: &str) -> Result<SignedMetadataBundle, TransportError> {
        self.notary.handle_fetch(repository)
    }
}
