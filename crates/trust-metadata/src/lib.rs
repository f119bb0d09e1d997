//! Trust Metadata Types
//!
//! Defines the signed JSON documents exchanged with a notary service:
//! key material, role definitions, and the root/targets payloads that map
//! image tags to content digests. Signing bytes are RFC 8785 canonical JSON.
//!
//! This crate carries no policy: it parses, serializes, and produces signing
//! bytes. All trust decisions live in the lane crate's verifier.

pub mod document;
pub mod error;
pub mod keys;
pub mod role;

pub use document::{
    RootPayload, SignedDocument, SignedMetadataBundle, TargetEntry, TargetsPayload,
};
pub use error::MetadataError;
pub use keys::{PublicKey, Signature, KEY_ALGORITHM_ED25519};
pub use role::{RoleDefinition, RoleKind};

/// Schema version for metadata bundles.
pub const BUNDLE_SCHEMA_VERSION: u32 = 1;

/// Schema identifier for metadata bundles.
pub const BUNDLE_SCHEMA_ID: &str = "trust-lane/metadata_bundle@1";
