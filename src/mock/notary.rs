//! The mock notary service.
//!
//! Holds per-repository signing keys and published tags, and serves freshly
//! signed metadata bundles on each fetch, the way a real notary re-signs
//! timestamp metadata. Interior mutability keeps the test surface ergonomic:
//! tests hold an `Arc<MockNotary>` while a transport owns another.

use chrono::{DateTime, Duration, Utc};
use ed25519_dalek::SigningKey;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use trust_metadata::{
    PublicKey, RoleDefinition, RoleKind, RootPayload, SignedDocument, SignedMetadataBundle,
    TargetEntry, TargetsPayload,
};

use crate::client::transport::TransportError;
use crate::mock::failure::FailureConfig;

/// Per-repository trust material held by the mock service.
struct RepoTrust {
    root_key: SigningKey,
    targets_key: SigningKey,
    targets: BTreeMap<String, TargetEntry>,
    root_expires: DateTime<Utc>,
    targets_expires: DateTime<Utc>,
}

impl RepoTrust {
    fn new() -> Self {
        Self {
            root_key: SigningKey::generate(&mut rand::thread_rng()),
            targets_key: SigningKey::generate(&mut rand::thread_rng()),
            targets: BTreeMap::new(),
            root_expires: Utc::now() + Duration::days(365),
            targets_expires: Utc::now() + Duration::days(14),
        }
    }

    fn root_payload(&self) -> RootPayload {
        let root_public = PublicKey::from_verifying_key(&self.root_key.verifying_key());
        let targets_public = PublicKey::from_verifying_key(&self.targets_key.verifying_key());

        let mut keys = BTreeMap::new();
        keys.insert(root_public.key_id.clone(), root_public.clone());
        keys.insert(targets_public.key_id.clone(), targets_public.clone());

        let mut roles = BTreeMap::new();
        roles.insert(RoleKind::Root, RoleDefinition::single(root_public.key_id));
        roles.insert(
            RoleKind::Targets,
            RoleDefinition::single(targets_public.key_id),
        );

        RootPayload {
            role: RoleKind::Root,
            version: 1,
            expires: self.root_expires,
            keys,
            roles,
        }
    }

    fn bundle(&self) -> SignedMetadataBundle {
        let targets = TargetsPayload {
            role: RoleKind::Targets,
            version: 1,
            expires: self.targets_expires,
            signed_at: Utc::now(),
            targets: self.targets.clone(),
        };

        SignedMetadataBundle::new(
            SignedDocument::sign(self.root_payload(), &[&self.root_key])
                .expect("mock root signing"),
            SignedDocument::sign(targets, &[&self.targets_key]).expect("mock targets signing"),
        )
    }
}

#[derive(Default)]
struct NotaryState {
    repositories: HashMap<String, RepoTrust>,
    failure: Option<FailureConfig>,
}

/// Configurable in-process trust service.
pub struct MockNotary {
    state: Mutex<NotaryState>,
}

impl MockNotary {
    /// Create an empty mock notary.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(NotaryState::default()),
        }
    }

    /// Publish a tag-to-digest mapping, creating repository keys on first use.
    pub fn publish(&self, repository: &str, tag: &str, digest: &str, size: u64) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let repo = state
            .repositories
            .entry(repository.to_string())
            .or_insert_with(RepoTrust::new);
        repo.targets.insert(
            tag.to_string(),
            TargetEntry {
                digest: digest.to_string(),
                size,
            },
        );
    }

    /// Remove a tag without touching keys or other tags.
    pub fn unpublish(&self, repository: &str, tag: &str) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(repo) = state.repositories.get_mut(repository) {
            repo.targets.remove(tag);
        }
    }

    /// Backdate a repository's metadata so served bundles are expired while
    /// their signatures stay valid.
    pub fn expire_repository(&self, repository: &str) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(repo) = state.repositories.get_mut(repository) {
            repo.targets_expires = Utc::now() - Duration::hours(1);
        }
    }

    /// Regenerate a repository's key set, keeping its published tags.
    ///
    /// Served bundles stay internally self-consistent; against a pinned root
    /// they are the "evil notary" scenario.
    pub fn rotate_keys(&self, repository: &str) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(repo) = state.repositories.get_mut(repository) {
            repo.root_key = SigningKey::generate(&mut rand::thread_rng());
            repo.targets_key = SigningKey::generate(&mut rand::thread_rng());
        }
    }

    /// Inject a failure for subsequent fetches.
    pub fn inject_failure(&self, config: FailureConfig) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.failure = Some(config);
    }

    /// Clear any injected failure.
    pub fn clear_failure(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.failure = None;
    }

    /// Handle a bundle fetch the way the HTTP service would.
    pub fn handle_fetch(&self, repository: &str) -> Result<SignedMetadataBundle, TransportError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(config) = &mut state.failure {
            if let Some(error) = config.next_failure() {
                return Err(error);
            }
        }

        match state.repositories.get(repository) {
            Some(repo) => Ok(repo.bundle()),
            None => Err(TransportError::HttpStatus { status: 404 }),
        }
    }
}

impl Default for MockNotary {
    fn default() -> Self {
        Self::new()
    }
}
