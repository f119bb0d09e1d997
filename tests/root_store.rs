//! Trust root store behavior across process-boundary lifetimes
//!
//! Each test opens fresh `TrustRootStore` instances over the same config
//! directory to model separate invocations of the CLI.

use std::collections::BTreeSet;

use chrono::Utc;
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use tempfile::TempDir;
use trust_lane::store::{TrustRoot, TrustRootStore, ROOT_SCHEMA_ID, ROOT_SCHEMA_VERSION};
use trust_metadata::PublicKey;

fn key_set(count: usize) -> BTreeSet<PublicKey> {
    (0..count)
        .map(|_| {
            let signing = SigningKey::generate(&mut OsRng);
            PublicKey::from_verifying_key(&signing.verifying_key())
        })
        .collect()
}

fn root(registry_host: &str, repository_path: &str, keys: BTreeSet<PublicKey>) -> TrustRoot {
    TrustRoot {
        schema_version: ROOT_SCHEMA_VERSION,
        schema_id: ROOT_SCHEMA_ID.to_string(),
        registry_host: registry_host.to_string(),
        repository_path: repository_path.to_string(),
        root_keys: keys,
        established_at: Utc::now(),
    }
}

#[test]
fn test_pinned_root_visible_to_later_store_instances() {
    let dir = TempDir::new().unwrap();
    let pinned = root("registry:5000", "app", key_set(1));

    TrustRootStore::open(dir.path()).put(&pinned, false).unwrap();

    let reopened = TrustRootStore::open(dir.path());
    assert_eq!(reopened.get("registry:5000/app").unwrap().unwrap(), pinned);
}

#[test]
fn test_second_establishment_with_different_keys_conflicts() {
    let dir = TempDir::new().unwrap();
    let first = root("registry:5000", "app", key_set(1));
    let second = root("registry:5000", "app", key_set(1));

    TrustRootStore::open(dir.path()).put(&first, false).unwrap();
    let err = TrustRootStore::open(dir.path())
        .put(&second, false)
        .unwrap_err();
    assert!(err.to_string().contains("registry:5000/app"));

    // First writer's root survives the losing attempt.
    assert_eq!(
        TrustRootStore::open(dir.path())
            .get("registry:5000/app")
            .unwrap()
            .unwrap(),
        first
    );
}

#[test]
fn test_explicit_rotation_replaces_pinned_root() {
    let dir = TempDir::new().unwrap();
    let original = root("registry:5000", "app", key_set(1));
    let rotated = root("registry:5000", "app", key_set(2));

    let store = TrustRootStore::open(dir.path());
    store.put(&original, false).unwrap();
    store.put(&rotated, true).unwrap();

    assert_eq!(
        TrustRootStore::open(dir.path())
            .get("registry:5000/app")
            .unwrap()
            .unwrap(),
        rotated
    );
}

#[test]
fn test_remove_resets_to_first_use() {
    let dir = TempDir::new().unwrap();
    let pinned = root("registry:5000", "app", key_set(1));

    let store = TrustRootStore::open(dir.path());
    store.put(&pinned, false).unwrap();
    assert!(store.remove("registry:5000/app").unwrap());

    let reopened = TrustRootStore::open(dir.path());
    assert!(reopened.get("registry:5000/app").unwrap().is_none());

    // A different root can now be established without rotation.
    let fresh = root("registry:5000", "app", key_set(1));
    reopened.put(&fresh, false).unwrap();
}

#[test]
fn test_remove_unknown_repository_is_noop() {
    let dir = TempDir::new().unwrap();
    let store = TrustRootStore::open(dir.path());
    assert!(!store.remove("registry:5000/never-seen").unwrap());
}

#[test]
fn test_repositories_with_awkward_names_do_not_collide() {
    let dir = TempDir::new().unwrap();
    let store = TrustRootStore::open(dir.path());

    // Sanitization maps '/' and ':' to the same character; the appended
    // content hash keeps the entries distinct.
    let a = root("registry:5000", "team/app", key_set(1));
    let b = root("registry", "5000/team/app", key_set(1));
    store.put(&a, false).unwrap();
    store.put(&b, false).unwrap();

    assert_eq!(
        store.get("registry:5000/team/app").unwrap().unwrap(),
        a
    );
    assert_eq!(store.get("registry/5000/team/app").unwrap().unwrap(), b);
}
