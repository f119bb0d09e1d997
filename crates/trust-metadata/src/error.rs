//! Error types for trust-metadata parsing and encoding.

use thiserror::Error;

/// Errors from metadata encoding, decoding, and key handling.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("canonicalization error: {0}")]
    Canonicalization(String),

    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("invalid signature encoding: {0}")]
    InvalidSignature(String),
}

/// Result type for metadata operations.
pub type MetadataResult<T> = Result<T, MetadataError>;
