//! Trust Failure Taxonomy
//!
//! Every failed resolution is classified into one of a small set of
//! externally observable kinds with stable, greppable messages. Operators
//! and tests match on these strings, so wording changes are breaking.
//!
//! The taxonomy splits three ways:
//! - "we could not ask": [`TrustFailure::ServerUnreachable`]
//! - "we asked and the answer is not trustworthy": invalid signature,
//!   expired metadata, threshold not met, trust root mismatch
//! - "the answer is trustworthy but does not cover what we wanted":
//!   [`TrustFailure::NoSuchTag`]

use chrono::{DateTime, Utc};

use crate::client::transport::TransportError;

/// Stable failure codes for automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Network, TLS, timeout, or HTTP-level failure contacting the server.
    ServerUnreachable,
    /// A signature failed cryptographic verification, or the payload is forged.
    InvalidSignature,
    /// Metadata expired, even if otherwise validly signed.
    ExpiredMetadata,
    /// Too few valid signatures from distinct authorized keys.
    RoleThresholdNotMet,
    /// Fetched root key set does not match the pinned trust root.
    TrustRootMismatch,
    /// Valid, fresh metadata that does not cover the requested tag.
    NoSuchTag,
}

impl FailureKind {
    /// Returns the string representation of the failure kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::ServerUnreachable => "SERVER_UNREACHABLE",
            FailureKind::InvalidSignature => "INVALID_SIGNATURE",
            FailureKind::ExpiredMetadata => "EXPIRED_METADATA",
            FailureKind::RoleThresholdNotMet => "ROLE_THRESHOLD_NOT_MET",
            FailureKind::TrustRootMismatch => "TRUST_ROOT_MISMATCH",
            FailureKind::NoSuchTag => "NO_SUCH_TAG",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A classified resolution failure.
///
/// No variant carries a digest: a failed resolution never exposes one.
#[derive(Debug, thiserror::Error)]
pub enum TrustFailure {
    #[error("error contacting notary server: {detail}")]
    ServerUnreachable {
        detail: String,
        #[source]
        source: Option<TransportError>,
    },

    #[error("trust metadata failed verification: invalid signature for role {role}: {detail}")]
    InvalidSignature { role: String, detail: String },

    #[error("trust metadata failed verification: {role} metadata expired at {expired_at}")]
    ExpiredMetadata {
        role: String,
        expired_at: DateTime<Utc>,
    },

    #[error(
        "trust metadata failed verification: signature threshold not met for role {role}: \
         need {required}, got {valid}"
    )]
    RoleThresholdNotMet {
        role: String,
        required: u32,
        valid: u32,
    },

    #[error(
        "trust metadata failed verification: root key set does not match pinned trust root \
         for {repository}: {detail}"
    )]
    TrustRootMismatch { repository: String, detail: String },

    #[error("no trust data for tag {tag} in repository {repository}")]
    NoSuchTag { repository: String, tag: String },
}

impl TrustFailure {
    /// Returns the failure kind for this failure.
    pub fn kind(&self) -> FailureKind {
        match self {
            TrustFailure::ServerUnreachable { .. } => FailureKind::ServerUnreachable,
            TrustFailure::InvalidSignature { .. } => FailureKind::InvalidSignature,
            TrustFailure::ExpiredMetadata { .. } => FailureKind::ExpiredMetadata,
            TrustFailure::RoleThresholdNotMet { .. } => FailureKind::RoleThresholdNotMet,
            TrustFailure::TrustRootMismatch { .. } => FailureKind::TrustRootMismatch,
            TrustFailure::NoSuchTag { .. } => FailureKind::NoSuchTag,
        }
    }

    /// Process exit status for a CLI reporting this failure.
    ///
    /// Success is 0; every trust failure is a hard, non-zero failure.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

/// Map a transport failure into the trust taxonomy.
///
/// Connection failures, TLS failures, timeouts, and HTTP-level errors are
/// deliberately uniform: a trust decision cannot be made without metadata,
/// regardless of why it is absent. Only a payload that arrived but failed to
/// parse is classified as forged data rather than an unreachable server.
impl From<TransportError> for TrustFailure {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::InvalidPayload(detail) => TrustFailure::InvalidSignature {
                role: "bundle".to_string(),
                detail: format!("malformed metadata payload: {}", detail),
            },
            other => TrustFailure::ServerUnreachable {
                detail: other.to_string(),
                source: Some(other),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kind_str() {
        assert_eq!(FailureKind::ServerUnreachable.as_str(), "SERVER_UNREACHABLE");
        assert_eq!(FailureKind::NoSuchTag.as_str(), "NO_SUCH_TAG");
    }

    #[test]
    fn test_unreachable_message_is_greppable() {
        let failure = TrustFailure::ServerUnreachable {
            detail: "connection refused".to_string(),
            source: None,
        };
        assert!(failure.to_string().contains("error contacting notary server"));
        assert_eq!(failure.kind(), FailureKind::ServerUnreachable);
        assert_eq!(failure.exit_code(), 1);
    }

    #[test]
    fn test_verification_failures_name_verification() {
        let mismatch = TrustFailure::TrustRootMismatch {
            repository: "registry:5000/trust-create".to_string(),
            detail: "1 pinned key, 1 offered key, 0 in common".to_string(),
        };
        assert!(mismatch.to_string().contains("failed verification"));

        let invalid = TrustFailure::InvalidSignature {
            role: "targets".to_string(),
            detail: "signature does not verify".to_string(),
        };
        assert!(invalid.to_string().contains("failed verification"));
    }

    #[test]
    fn test_transport_errors_classify_as_unreachable() {
        let failure: TrustFailure =
            TransportError::ConnectionFailed("dns failure".to_string()).into();
        assert_eq!(failure.kind(), FailureKind::ServerUnreachable);

        let failure: TrustFailure = TransportError::Timeout.into();
        assert_eq!(failure.kind(), FailureKind::ServerUnreachable);

        let failure: TrustFailure = TransportError::HttpStatus { status: 502 }.into();
        assert_eq!(failure.kind(), FailureKind::ServerUnreachable);
    }

    #[test]
    fn test_malformed_payload_classifies_as_invalid() {
        let failure: TrustFailure =
            TransportError::InvalidPayload("expected value at line 1".to_string()).into();
        assert_eq!(failure.kind(), FailureKind::InvalidSignature);
    }

    #[test]
    fn test_threshold_message_carries_counts() {
        let failure = TrustFailure::RoleThresholdNotMet {
            role: "root".to_string(),
            required: 2,
            valid: 1,
        };
        let msg = failure.to_string();
        assert!(msg.contains("need 2"));
        assert!(msg.contains("got 1"));
    }
}
