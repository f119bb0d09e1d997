//! Key and signature material carried in signed metadata documents.
//!
//! Public keys travel base64-encoded with a SHA-256 fingerprint as their
//! key ID. Lane-side verification decodes them back into `ed25519_dalek`
//! verifying keys.

use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{MetadataError, MetadataResult};

/// Key algorithm identifier for Ed25519 keys.
pub const KEY_ALGORITHM_ED25519: &str = "ed25519";

/// A public key authorized to sign metadata for some role.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PublicKey {
    /// Key identifier: SHA-256 hex fingerprint of the raw public key bytes.
    pub key_id: String,

    /// Key algorithm (always "ed25519" in this scheme).
    pub algorithm: String,

    /// Base64-encoded raw public key bytes.
    pub public_key: String,
}

impl PublicKey {
    /// Build a metadata public key from an Ed25519 verifying key.
    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        Self {
            key_id: compute_key_id(key.as_bytes()),
            algorithm: KEY_ALGORITHM_ED25519.to_string(),
            public_key: base64::Engine::encode(
                &base64::engine::general_purpose::STANDARD,
                key.as_bytes(),
            ),
        }
    }

    /// Decode the base64 key material into a verifying key.
    pub fn decode(&self) -> MetadataResult<VerifyingKey> {
        if self.algorithm != KEY_ALGORITHM_ED25519 {
            return Err(MetadataError::InvalidKey(format!(
                "unsupported key algorithm: {}",
                self.algorithm
            )));
        }

        let bytes = base64::Engine::decode(
            &base64::engine::general_purpose::STANDARD,
            &self.public_key,
        )?;
        let bytes_array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| MetadataError::InvalidKey("key must be 32 bytes".to_string()))?;

        VerifyingKey::from_bytes(&bytes_array).map_err(|e| MetadataError::InvalidKey(e.to_string()))
    }

    /// Check that the declared key ID matches the key material.
    pub fn key_id_consistent(&self) -> MetadataResult<bool> {
        let bytes = base64::Engine::decode(
            &base64::engine::general_purpose::STANDARD,
            &self.public_key,
        )?;
        Ok(compute_key_id(&bytes) == self.key_id)
    }
}

/// A detached signature over a document's canonical JSON bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Key ID that produced this signature.
    pub key_id: String,

    /// Base64-encoded Ed25519 signature bytes.
    pub sig: String,
}

impl Signature {
    /// Decode the base64 signature bytes.
    pub fn decode(&self) -> MetadataResult<ed25519_dalek::Signature> {
        let bytes = base64::Engine::decode(
            &base64::engine::general_purpose::STANDARD,
            &self.sig,
        )?;
        ed25519_dalek::Signature::from_slice(&bytes)
            .map_err(|e| MetadataError::InvalidSignature(e.to_string()))
    }
}

/// Compute the SHA-256 hex fingerprint used as a key ID.
pub fn compute_key_id(public_key_bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(public_key_bytes);
    hex::encode(hasher.finalize())
}
