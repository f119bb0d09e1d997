//! Notary Client
//!
//! A dumb fetcher of signed metadata bundles. All validation happens in the
//! verifier; this separation lets the verifier be tested with synthetic
//! bundles and the client with mock transports, without a live network.

pub mod transport;

use std::time::Duration;

use trust_metadata::SignedMetadataBundle;

pub use transport::{HttpConfig, HttpTransport, MockTransport, Transport, TransportError};

/// Well-known default trust service endpoint.
pub const DEFAULT_NOTARY_ENDPOINT: &str = "https://notary.docker.io";

/// Client for the trust-service protocol.
pub struct NotaryClient {
    transport: Box<dyn Transport>,
}

impl NotaryClient {
    /// Create a client over an arbitrary transport.
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Create a client over HTTPS to the given endpoint.
    ///
    /// The endpoint is caller-configurable per client; pointing it at an
    /// alternate server is how adversarial scenarios are exercised.
    pub fn http(endpoint: &str, timeout: Duration, authorization: Option<String>) -> Self {
        Self::new(Box::new(HttpTransport::new(HttpConfig {
            endpoint: endpoint.to_string(),
            timeout,
            authorization,
        })))
    }

    /// Fetch the signed metadata bundle for a repository.
    ///
    /// No trust decision is made here, and no retry is attempted: a single
    /// failed fetch is reported immediately.
    pub fn fetch_metadata(
        &self,
        repository: &str,
    ) -> Result<SignedMetadataBundle, TransportError> {
        self.transport.fetch_bundle(repository)
    }
}
