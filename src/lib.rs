//! Trust Lane - Content-trust resolution
//!
//! This crate implements the content-trust resolution lane: given a
//! human-readable image reference, it contacts a notary (trust) service,
//! validates the returned signed metadata against locally pinned trust
//! roots, and yields a verified content digest or a classified failure.
//! Trust is established on first use and hard-fails on any later mismatch;
//! there is no fallback to unverified resolution.

pub mod client;
pub mod config;
pub mod failure;
pub mod mock;
pub mod reference;
pub mod resolver;
pub mod store;
pub mod verify;

pub use client::{NotaryClient, Transport, DEFAULT_NOTARY_ENDPOINT};
pub use config::{ConfigOverrides, TrustConfig};
pub use failure::{FailureKind, TrustFailure};
pub use reference::ImageReference;
pub use resolver::TrustResolver;
pub use store::{TrustRoot, TrustRootStore};
pub use verify::{VerifiedTarget, VerifyPolicy};
