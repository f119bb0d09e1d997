//! Trust Root Store
//!
//! Durable, per-repository store of pinned trust roots under a caller-chosen
//! configuration directory. One JSON file per repository under
//! `<config_dir>/trust/roots/`, stable across process restarts: persistence
//! is the whole point of trust-on-first-use.
//!
//! `put` without the rotation flag fails on an existing entry. That conflict
//! is the enforcement point for "no silent key replacement", and the on-disk
//! `create_new` open makes it atomic: two concurrent first-use
//! establishments for the same repository cannot both win.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

use trust_metadata::{PublicKey, RootPayload};

use crate::reference::ImageReference;

/// Schema version for persisted trust roots.
pub const ROOT_SCHEMA_VERSION: u32 = 1;

/// Schema identifier for persisted trust roots.
pub const ROOT_SCHEMA_ID: &str = "trust-lane/trust_root@1";

/// Errors from trust root storage.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("trust root already exists for {repository}; rotation required")]
    Conflict { repository: String },
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// A pinned trust root for one repository.
///
/// Created on the first successful resolution ("trust on first use") and
/// immutable thereafter except by explicit rotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustRoot {
    /// Schema version.
    pub schema_version: u32,

    /// Schema identifier.
    pub schema_id: String,

    /// Registry host the root belongs to.
    pub registry_host: String,

    /// Repository path under the registry.
    pub repository_path: String,

    /// The pinned root key set, order-independent.
    pub root_keys: BTreeSet<PublicKey>,

    /// When this root was first established.
    pub established_at: DateTime<Utc>,
}

impl TrustRoot {
    /// Build a candidate root from a verified root payload.
    pub fn from_payload(
        reference: &ImageReference,
        payload: &RootPayload,
        established_at: DateTime<Utc>,
    ) -> Self {
        Self {
            schema_version: ROOT_SCHEMA_VERSION,
            schema_id: ROOT_SCHEMA_ID.to_string(),
            registry_host: reference.registry_host.clone(),
            repository_path: reference.repository_path.clone(),
            root_keys: payload.key_set(),
            established_at,
        }
    }

    /// The registry-qualified repository key.
    pub fn repository(&self) -> String {
        format!("{}/{}", self.registry_host, self.repository_path)
    }

    /// Whether a fetched root payload declares exactly this key set.
    pub fn matches(&self, payload: &RootPayload) -> bool {
        self.root_keys == payload.key_set()
    }

    /// Human-readable summary of a key-set mismatch.
    pub fn mismatch_detail(&self, payload: &RootPayload) -> String {
        let offered = payload.key_set();
        let common = self.root_keys.intersection(&offered).count();
        format!(
            "{} pinned key(s), {} offered key(s), {} in common",
            self.root_keys.len(),
            offered.len(),
            common
        )
    }
}

/// File-backed trust root store.
///
/// Reads are lock-free; writes are serialized per store instance and made
/// race-safe on disk with `create_new`.
pub struct TrustRootStore {
    roots_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl TrustRootStore {
    /// Open (or lazily create) a store under the given configuration directory.
    pub fn open(config_dir: &Path) -> Self {
        Self {
            roots_dir: config_dir.join("trust").join("roots"),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the root file for a repository.
    pub fn root_path(&self, repository: &str) -> PathBuf {
        self.roots_dir.join(root_file_name(repository))
    }

    /// Fetch the pinned root for a repository, if any.
    pub fn get(&self, repository: &str) -> StoreResult<Option<TrustRoot>> {
        let path = self.root_path(repository);
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&json)?))
    }

    /// Persist a root for a repository.
    ///
    /// Without `rotate`, fails with [`StoreError::Conflict`] if a root is
    /// already pinned. With `rotate`, replaces the existing root (explicit,
    /// out-of-band key rotation only).
    pub fn put(&self, root: &TrustRoot, rotate: bool) -> StoreResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        fs::create_dir_all(&self.roots_dir)?;
        let path = self.root_path(&root.repository());
        let json = serde_json::to_string_pretty(root)?;

        if rotate {
            fs::write(&path, json)?;
            return Ok(());
        }

        let mut file = match fs::OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(StoreError::Conflict {
                    repository: root.repository(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(json.as_bytes())?;
        Ok(())
    }

    /// Remove the pinned root for a repository, for reset scenarios.
    ///
    /// Returns whether a root was present.
    pub fn remove(&self, repository: &str) -> StoreResult<bool> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        match fs::remove_file(self.root_path(repository)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Filesystem-safe file name for a repository key.
///
/// Sanitized name plus a digest suffix so distinct repositories can never
/// collide after sanitization.
fn root_file_name(repository: &str) -> String {
    let sanitized: String = repository
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let mut hasher = Sha256::new();
    hasher.update(repository.as_bytes());
    let digest = hex::encode(hasher.finalize());

    format!("{}-{}.json", sanitized, &digest[..12])
}
