//! Signature Verification
//!
//! Validates a fetched metadata bundle against an optional pinned trust root
//! and extracts the requested tag's verified digest.
//!
//! This module is pure: no network, no store writes, and "now" is an input,
//! which makes it the unit-test surface for adversarial payloads (forged
//! signatures, substituted key sets, expired metadata, omitted tags).
//!
//! Check order per resolution:
//! 1. pinned-root key-set equality (before any signature work is wasted)
//! 2. root expiry, then root self-signatures against its own declared keys
//! 3. targets expiry, then targets signatures against root-authorized keys
//! 4. tag lookup

use chrono::{DateTime, Utc};
use ed25519_dalek::Verifier;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use trust_metadata::{RoleKind, RootPayload, SignedDocument, SignedMetadataBundle};

use crate::failure::TrustFailure;
use crate::reference::ImageReference;
use crate::store::TrustRoot;

/// Threshold policy for verification.
///
/// Thresholds normally come from the root metadata's role definitions; the
/// overrides exist because the emulated trust service's exact quorum scheme
/// is a deployment choice, not something to hardcode.
#[derive(Debug, Clone, Default)]
pub struct VerifyPolicy {
    /// Minimum valid root self-signatures, overriding the metadata's own.
    pub root_threshold_override: Option<u32>,

    /// Minimum valid targets signatures, overriding the metadata's own.
    pub targets_threshold_override: Option<u32>,
}

/// The trusted tag-to-digest mapping produced by a successful resolution.
///
/// Produced once per resolve call and never cached across calls, so a server
/// compromise that post-dates a resolution is never masked by stale results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedTarget {
    /// The tag that was resolved.
    pub tag: String,

    /// Verified content digest.
    pub digest: String,

    /// Size of the referenced content in bytes (0 for digest pass-through).
    pub size: u64,

    /// When the mapping was signed; absent for digest pass-through.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_at: Option<DateTime<Utc>>,
}

/// Verify a bundle and extract the requested tag.
///
/// With a pinned root, the bundle's declared key set must equal it exactly.
/// Without one (first use), the bundle's embedded root becomes the candidate
/// root returned for persistence, but only after its self-signature over
/// that root is itself valid.
pub fn verify_bundle(
    bundle: &SignedMetadataBundle,
    known_root: Option<&TrustRoot>,
    reference: &ImageReference,
    tag: &str,
    now: DateTime<Utc>,
    policy: &VerifyPolicy,
) -> Result<(VerifiedTarget, TrustRoot), TrustFailure> {
    let root_payload = &bundle.root.signed;

    if let Some(known) = known_root {
        if !known.matches(root_payload) {
            return Err(TrustFailure::TrustRootMismatch {
                repository: reference.repository(),
                detail: known.mismatch_detail(root_payload),
            });
        }
    }

    check_expiry(RoleKind::Root, root_payload.expires, now)?;
    check_signatures(
        &bundle.root,
        root_payload,
        RoleKind::Root,
        policy.root_threshold_override,
    )?;

    check_expiry(RoleKind::Targets, bundle.targets.signed.expires, now)?;
    check_signatures(
        &bundle.targets,
        root_payload,
        RoleKind::Targets,
        policy.targets_threshold_override,
    )?;

    let entry = bundle.targets.signed.target(tag).ok_or_else(|| {
        TrustFailure::NoSuchTag {
            repository: reference.repository(),
            tag: tag.to_string(),
        }
    })?;

    let target = VerifiedTarget {
        tag: tag.to_string(),
        digest: entry.digest.clone(),
        size: entry.size,
        signed_at: Some(bundle.targets.signed.signed_at),
    };
    let candidate_root = TrustRoot::from_payload(reference, root_payload, now);

    Ok((target, candidate_root))
}

fn check_expiry(
    role: RoleKind,
    expires: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), TrustFailure> {
    if expires < now {
        return Err(TrustFailure::ExpiredMetadata {
            role: role.as_str().to_string(),
            expired_at: expires,
        });
    }
    Ok(())
}

/// Count valid signatures from distinct authorized keys against the role's
/// threshold.
///
/// A signature from an authorized key that fails to decode or verify marks
/// the bundle as forged (`InvalidSignature`); signatures from unauthorized
/// keys are ignored. If no forgery was seen but the count still falls short,
/// the failure is `RoleThresholdNotMet`.
fn check_signatures<T: Serialize>(
    document: &SignedDocument<T>,
    root_payload: &RootPayload,
    role: RoleKind,
    threshold_override: Option<u32>,
) -> Result<(), TrustFailure> {
    let role_name = role.as_str().to_string();

    let definition = root_payload.role_definition(role).ok_or_else(|| {
        TrustFailure::InvalidSignature {
            role: role_name.clone(),
            detail: format!("root metadata declares no {} role", role),
        }
    })?;

    // Threshold below 1 would accept unsigned metadata; clamp it.
    let required = threshold_override.unwrap_or(definition.threshold).max(1);

    let bytes = document
        .signing_bytes()
        .map_err(|e| TrustFailure::InvalidSignature {
            role: role_name.clone(),
            detail: e.to_string(),
        })?;

    let mut valid_key_ids: BTreeSet<&str> = BTreeSet::new();
    for signature in &document.signatures {
        if !definition.authorizes(&signature.key_id) {
            continue;
        }
        let key = root_payload.key(&signature.key_id).ok_or_else(|| {
            TrustFailure::InvalidSignature {
                role: role_name.clone(),
                detail: format!("authorized key {} not in key set", signature.key_id),
            }
        })?;

        let verifying_key = key.decode().map_err(|e| TrustFailure::InvalidSignature {
            role: role_name.clone(),
            detail: e.to_string(),
        })?;
        let decoded = signature
            .decode()
            .map_err(|e| TrustFailure::InvalidSignature {
                role: role_name.clone(),
                detail: e.to_string(),
            })?;

        if verifying_key.verify(&bytes, &decoded).is_err() {
            // key_id is attacker-controlled; truncate on char boundaries.
            let key_id_prefix: String = signature.key_id.chars().take(12).collect();
            return Err(TrustFailure::InvalidSignature {
                role: role_name,
                detail: format!("signature by key {} does not verify", key_id_prefix),
            });
        }
        valid_key_ids.insert(&signature.key_id);
    }

    let valid = valid_key_ids.len() as u32;
    if valid < required {
        return Err(TrustFailure::RoleThresholdNotMet {
            role: role_name,
            required,
            valid,
        });
    }
    Ok(())
}
