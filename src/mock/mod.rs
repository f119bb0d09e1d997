//! Mock Notary Implementation
//!
//! An in-process, configurable stand-in for the trust service, so every
//! adversarial scenario runs without a live network or external processes:
//!
//! - honest service: publish tags, serve validly signed bundles
//! - evil service: a second instance (or rotated keys) signs a different
//!   key set that is internally self-consistent
//! - unreachable service: injected connection failures and timeouts
//! - stale service: expired metadata with otherwise valid signatures

mod failure;
mod notary;

pub use failure::{FailureConfig, MockFailure};
pub use notary::MockNotary;
