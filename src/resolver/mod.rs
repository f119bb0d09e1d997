//! Trust Resolver
//!
//! Orchestrates client, verifier, and store to turn an image reference into
//! a verified digest or a classified failure.
//!
//! Trust establishment is an explicit per-repository state machine:
//!
//! ```text
//! NoRoot ──(first successful verification)──► RootEstablished
//! ```
//!
//! In `NoRoot`, a bundle whose embedded root verifies against itself
//! establishes and persists that root (trust on first use). In
//! `RootEstablished`, the fetched root must match the pinned key set
//! exactly; any mismatch is a hard failure, never an overwrite. There is no
//! fallback from trust-enabled resolution to unverified resolution, and no
//! automatic retry: a failed attempt is reported immediately.

use chrono::Utc;

use crate::client::{NotaryClient, Transport};
use crate::config::TrustConfig;
use crate::failure::TrustFailure;
use crate::reference::ImageReference;
use crate::store::{StoreError, TrustRootStore};
use crate::verify::{verify_bundle, VerifiedTarget, VerifyPolicy};

/// Resolves image references against a trust service.
pub struct TrustResolver {
    store: TrustRootStore,
    client: NotaryClient,
    policy: VerifyPolicy,
}

impl TrustResolver {
    /// Create a resolver talking HTTPS to the configured endpoint.
    pub fn new(config: &TrustConfig) -> Self {
        let client = NotaryClient::http(
            config.endpoint(),
            config.timeout,
            config.authorization(),
        );
        Self {
            store: TrustRootStore::open(&config.config_dir),
            client,
            policy: config.verify_policy(),
        }
    }

    /// Create a resolver over an arbitrary transport (tests, mock notary).
    pub fn with_transport(config: &TrustConfig, transport: Box<dyn Transport>) -> Self {
        Self {
            store: TrustRootStore::open(&config.config_dir),
            client: NotaryClient::new(transport),
            policy: config.verify_policy(),
        }
    }

    /// The underlying trust root store.
    pub fn store(&self) -> &TrustRootStore {
        &self.store
    }

    /// Resolve a reference to a verified digest.
    ///
    /// A digest-addressed reference passes through unchanged: a digest is
    /// self-verifying content addressing and needs no trust-server round
    /// trip. Everything else fetches fresh metadata, verifies it, and on
    /// first use persists the embedded root. No failure path ever returns a
    /// digest.
    pub fn resolve(&self, reference: &ImageReference) -> Result<VerifiedTarget, TrustFailure> {
        if let Some(digest) = &reference.digest {
            return Ok(VerifiedTarget {
                tag: reference.tag.clone().unwrap_or_default(),
                digest: digest.clone(),
                size: 0,
                signed_at: None,
            });
        }

        let repository = reference.repository();
        let tag = match reference.tag.as_deref() {
            Some(tag) => tag,
            None => {
                // Constructed references can carry neither target; treat it
                // as asking for a tag the metadata cannot contain.
                return Err(TrustFailure::NoSuchTag {
                    repository,
                    tag: String::new(),
                });
            }
        };

        // Fetch before reading trust state: a fetch failure must leave the
        // store untouched, and classification does not depend on state.
        let bundle = self.client.fetch_metadata(&repository)?;

        let known_root = self
            .store
            .get(&repository)
            .map_err(|e| unreadable_state(&repository, &e))?;

        let (target, candidate_root) = verify_bundle(
            &bundle,
            known_root.as_ref(),
            reference,
            tag,
            Utc::now(),
            &self.policy,
        )?;

        if known_root.is_none() {
            match self.store.put(&candidate_root, false) {
                Ok(()) => {}
                Err(StoreError::Conflict { .. }) => {
                    // Lost a concurrent first-use race. The winner's root is
                    // authoritative; ours must match it exactly.
                    let existing = self
                        .store
                        .get(&repository)
                        .map_err(|e| unreadable_state(&repository, &e))?;
                    match existing {
                        Some(existing) if existing.root_keys == candidate_root.root_keys => {}
                        _ => {
                            return Err(TrustFailure::TrustRootMismatch {
                                repository,
                                detail: "concurrent establishment pinned a different root"
                                    .to_string(),
                            });
                        }
                    }
                }
                Err(e) => return Err(unreadable_state(&repository, &e)),
            }
        }

        Ok(target)
    }
}

/// Classify unreadable or unwritable trust state.
///
/// Pinned state that cannot be read is a trust-state problem, not a server
/// problem: resolution must not proceed as if no root were pinned.
fn unreadable_state(repository: &str, error: &StoreError) -> TrustFailure {
    TrustFailure::TrustRootMismatch {
        repository: repository.to_string(),
        detail: format!("trust state unavailable: {}", error),
    }
}
