//! Signed metadata documents.
//!
//! A `SignedDocument` wraps a payload with detached signatures over the
//! payload's RFC 8785 canonical JSON (JCS) bytes. A `SignedMetadataBundle`
//! is the unit a notary service returns for one repository: the root
//! document (key set and role thresholds) plus the targets document
//! (tag-to-digest mappings).

use chrono::{DateTime, Utc};
use ed25519_dalek::{Signer, SigningKey};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{MetadataError, MetadataResult};
use crate::keys::{PublicKey, Signature};
use crate::role::{RoleDefinition, RoleKind};
use crate::{BUNDLE_SCHEMA_ID, BUNDLE_SCHEMA_VERSION};

/// A payload plus detached signatures over its canonical JSON bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedDocument<T> {
    /// The signed payload.
    pub signed: T,

    /// Signatures over JCS(signed), in the order they were produced.
    pub signatures: Vec<Signature>,
}

impl<T: Serialize> SignedDocument<T> {
    /// Canonical JSON bytes of the payload; the input to every signature.
    pub fn signing_bytes(&self) -> MetadataResult<Vec<u8>> {
        serde_json_canonicalizer::to_vec(&self.signed)
            .map_err(|e| MetadataError::Canonicalization(e.to_string()))
    }

    /// Sign a payload with each of the given keys.
    pub fn sign(signed: T, keys: &[&SigningKey]) -> MetadataResult<Self> {
        let bytes = serde_json_canonicalizer::to_vec(&signed)
            .map_err(|e| MetadataError::Canonicalization(e.to_string()))?;

        let signatures = keys
            .iter()
            .map(|key| {
                let sig = key.sign(&bytes);
                Signature {
                    key_id: crate::keys::compute_key_id(key.verifying_key().as_bytes()),
                    sig: base64::Engine::encode(
                        &base64::engine::general_purpose::STANDARD,
                        sig.to_bytes(),
                    ),
                }
            })
            .collect();

        Ok(Self { signed, signatures })
    }
}

/// Root payload: the key set and per-role signing requirements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootPayload {
    /// Role of this document (always `root`).
    pub role: RoleKind,

    /// Monotonically increasing metadata version.
    pub version: u64,

    /// Expiry of this document; stale documents are rejected.
    pub expires: DateTime<Utc>,

    /// All keys known to this root, by key ID.
    pub keys: BTreeMap<String, PublicKey>,

    /// Signing requirements per role.
    pub roles: BTreeMap<RoleKind, RoleDefinition>,
}

impl RootPayload {
    /// Signing requirements for a role, if declared.
    pub fn role_definition(&self, role: RoleKind) -> Option<&RoleDefinition> {
        self.roles.get(&role)
    }

    /// Look up a key by ID.
    pub fn key(&self, key_id: &str) -> Option<&PublicKey> {
        self.keys.get(key_id)
    }

    /// Keys authorized for a role that are present in the key set.
    pub fn authorized_keys(&self, role: RoleKind) -> Vec<&PublicKey> {
        match self.roles.get(&role) {
            Some(def) => def
                .key_ids
                .iter()
                .filter_map(|id| self.keys.get(id))
                .collect(),
            None => Vec::new(),
        }
    }

    /// The full key set as an order-independent set, for pinning comparisons.
    pub fn key_set(&self) -> BTreeSet<PublicKey> {
        self.keys.values().cloned().collect()
    }
}

/// A single tag entry in the targets payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetEntry {
    /// Content digest, e.g. `sha256:…`.
    pub digest: String,

    /// Size of the referenced content in bytes.
    pub size: u64,
}

/// Targets payload: the tag-to-digest mapping for one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetsPayload {
    /// Role of this document (always `targets`).
    pub role: RoleKind,

    /// Monotonically increasing metadata version.
    pub version: u64,

    /// Expiry of this document; stale documents are rejected.
    pub expires: DateTime<Utc>,

    /// When this mapping was signed.
    pub signed_at: DateTime<Utc>,

    /// Tag entries by tag name.
    pub targets: BTreeMap<String, TargetEntry>,
}

impl TargetsPayload {
    /// Look up a tag entry.
    pub fn target(&self, tag: &str) -> Option<&TargetEntry> {
        self.targets.get(tag)
    }
}

/// The full metadata bundle a notary service returns for one repository.
///
/// Bundles are transient: fetched fresh per resolution, never used in place
/// of a failed fresh fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedMetadataBundle {
    /// Schema version.
    pub schema_version: u32,

    /// Schema identifier.
    pub schema_id: String,

    /// Root document: key set and role thresholds, self-signed.
    pub root: SignedDocument<RootPayload>,

    /// Targets document: tag-to-digest mappings.
    pub targets: SignedDocument<TargetsPayload>,
}

impl SignedMetadataBundle {
    /// Assemble a bundle from its two documents.
    pub fn new(
        root: SignedDocument<RootPayload>,
        targets: SignedDocument<TargetsPayload>,
    ) -> Self {
        Self {
            schema_version: BUNDLE_SCHEMA_VERSION,
            schema_id: BUNDLE_SCHEMA_ID.to_string(),
            root,
            targets,
        }
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::Verifier;

    fn generate_key() -> SigningKey {
        SigningKey::generate(&mut rand::thread_rng())
    }

    fn sample_root(keys: &[&SigningKey]) -> RootPayload {
        let mut key_map = BTreeMap::new();
        let mut key_ids = Vec::new();
        for key in keys {
            let public = PublicKey::from_verifying_key(&key.verifying_key());
            key_ids.push(public.key_id.clone());
            key_map.insert(public.key_id.clone(), public);
        }

        let mut roles = BTreeMap::new();
        roles.insert(
            RoleKind::Root,
            RoleDefinition {
                key_ids: key_ids.clone(),
                threshold: 1,
            },
        );
        roles.insert(
            RoleKind::Targets,
            RoleDefinition {
                key_ids,
                threshold: 1,
            },
        );

        RootPayload {
            role: RoleKind::Root,
            version: 1,
            expires: Utc::now() + chrono::Duration::days(30),
            keys: key_map,
            roles,
        }
    }

    #[test]
    fn test_sign_produces_verifiable_signatures() {
        let key = generate_key();
        let root = sample_root(&[&key]);

        let doc = SignedDocument::sign(root, &[&key]).unwrap();
        assert_eq!(doc.signatures.len(), 1);

        let bytes = doc.signing_bytes().unwrap();
        let sig = doc.signatures[0].decode().unwrap();
        key.verifying_key().verify(&bytes, &sig).unwrap();
    }

    #[test]
    fn test_signing_bytes_stable_across_round_trip() {
        let key = generate_key();
        let root = sample_root(&[&key]);
        let doc = SignedDocument::sign(root, &[&key]).unwrap();

        let json = serde_json::to_string(&doc).unwrap();
        let parsed: SignedDocument<RootPayload> = serde_json::from_str(&json).unwrap();

        // JCS bytes must survive serialization, or signatures would break.
        assert_eq!(doc.signing_bytes().unwrap(), parsed.signing_bytes().unwrap());
    }

    #[test]
    fn test_authorized_keys_filters_unknown_ids() {
        let key = generate_key();
        let mut root = sample_root(&[&key]);
        root.roles
            .get_mut(&RoleKind::Targets)
            .unwrap()
            .key_ids
            .push("missing-key-id".to_string());

        assert_eq!(root.authorized_keys(RoleKind::Targets).len(), 1);
    }

    #[test]
    fn test_key_set_order_independent() {
        let key_a = generate_key();
        let key_b = generate_key();

        let root_ab = sample_root(&[&key_a, &key_b]);
        let root_ba = sample_root(&[&key_b, &key_a]);

        assert_eq!(root_ab.key_set(), root_ba.key_set());
    }

    #[test]
    fn test_bundle_json_round_trip() {
        let key = generate_key();
        let root = sample_root(&[&key]);

        let mut targets_map = BTreeMap::new();
        targets_map.insert(
            "latest".to_string(),
            TargetEntry {
                digest: format!("sha256:{}", "a".repeat(64)),
                size: 1024,
            },
        );
        let targets = TargetsPayload {
            role: RoleKind::Targets,
            version: 1,
            expires: Utc::now() + chrono::Duration::days(7),
            signed_at: Utc::now(),
            targets: targets_map,
        };

        let bundle = SignedMetadataBundle::new(
            SignedDocument::sign(root, &[&key]).unwrap(),
            SignedDocument::sign(targets, &[&key]).unwrap(),
        );

        let json = bundle.to_json().unwrap();
        let parsed = SignedMetadataBundle::from_json(&json).unwrap();

        assert_eq!(parsed.schema_id, BUNDLE_SCHEMA_ID);
        assert_eq!(
            parsed.targets.signed.target("latest").unwrap().size,
            1024
        );
        assert!(parsed.targets.signed.target("missing").is_none());
    }
}
