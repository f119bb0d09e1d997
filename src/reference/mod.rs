//! Image reference parsing
//!
//! Parses human-readable image references of the forms:
//! - `registry.example.com:5000/ns/repo:tag`
//! - `registry.example.com/ns/repo@sha256:<64 hex>`
//! - `repo:tag` (default registry, `library/` namespace)
//!
//! Exactly one of tag/digest is the resolution target at a time; a reference
//! that already carries a digest is self-verifying and bypasses trust lookup.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Registry assumed when the reference names no host.
pub const DEFAULT_REGISTRY: &str = "docker.io";

/// Tag assumed when the reference names neither tag nor digest.
pub const DEFAULT_TAG: &str = "latest";

/// Errors from reference parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("empty image reference")]
    Empty,

    #[error("invalid repository path: {0}")]
    InvalidRepository(String),

    #[error("invalid tag: {0}")]
    InvalidTag(String),

    #[error("invalid digest: {0}")]
    InvalidDigest(String),
}

/// A parsed image reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageReference {
    /// Registry host, possibly with a port (e.g. `registry:5000`).
    pub registry_host: String,

    /// Repository path under the registry (e.g. `library/alpine`).
    pub repository_path: String,

    /// Tag to resolve, if the reference is tag-addressed.
    pub tag: Option<String>,

    /// Content digest, if the reference is already digest-addressed.
    pub digest: Option<String>,
}

impl ImageReference {
    /// Parse a reference string.
    ///
    /// A reference with neither tag nor digest gets the `latest` tag, matching
    /// the conventional CLI behavior.
    pub fn parse(input: &str) -> Result<Self, ReferenceError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ReferenceError::Empty);
        }

        // Split off a digest if present. Digests are self-verifying, so the
        // remainder needs no tag.
        let (name, digest) = match input.split_once('@') {
            Some((name, digest)) => {
                validate_digest(digest)?;
                (name, Some(digest.to_string()))
            }
            None => (input, None),
        };

        // A ':' after the last '/' separates the tag; before it, it is a
        // registry port.
        let (name, tag) = if digest.is_none() {
            let tag_sep = name.rfind(':').filter(|&pos| {
                name.rfind('/').map_or(true, |slash| pos > slash)
            });
            match tag_sep {
                Some(pos) => {
                    let tag = &name[pos + 1..];
                    validate_tag(tag)?;
                    (&name[..pos], Some(tag.to_string()))
                }
                None => (name, Some(DEFAULT_TAG.to_string())),
            }
        } else {
            (name, None)
        };

        let (registry_host, repository_path) = split_registry(name)?;

        Ok(Self {
            registry_host,
            repository_path,
            tag,
            digest,
        })
    }

    /// The registry-qualified repository key used for trust state.
    pub fn repository(&self) -> String {
        format!("{}/{}", self.registry_host, self.repository_path)
    }

    /// Whether this reference is already digest-addressed.
    pub fn is_resolved(&self) -> bool {
        self.digest.is_some()
    }
}

impl std::fmt::Display for ImageReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.repository())?;
        if let Some(digest) = &self.digest {
            write!(f, "@{}", digest)
        } else if let Some(tag) = &self.tag {
            write!(f, ":{}", tag)
        } else {
            Ok(())
        }
    }
}

/// Split a name into registry host and repository path.
///
/// The first path component is a registry host only if it looks like one:
/// contains a dot or a port, or is `localhost`. Otherwise the whole name is
/// a path under the default registry, with single-component paths pushed
/// into the `library/` namespace.
fn split_registry(name: &str) -> Result<(String, String), ReferenceError> {
    if name.is_empty() {
        return Err(ReferenceError::InvalidRepository("empty name".to_string()));
    }

    let (host, path) = match name.split_once('/') {
        Some((first, rest))
            if first.contains('.') || first.contains(':') || first == "localhost" =>
        {
            (first.to_string(), rest.to_string())
        }
        Some(_) => (DEFAULT_REGISTRY.to_string(), name.to_string()),
        None => (DEFAULT_REGISTRY.to_string(), format!("library/{}", name)),
    };

    if path.is_empty() || path.split('/').any(|c| c.is_empty() || !valid_path_component(c)) {
        return Err(ReferenceError::InvalidRepository(name.to_string()));
    }

    Ok((host, path))
}

fn valid_path_component(component: &str) -> bool {
    component
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-'))
}

fn validate_tag(tag: &str) -> Result<(), ReferenceError> {
    let mut chars = tag.chars();
    let valid_first = chars
        .next()
        .map(|c| c.is_ascii_alphanumeric() || c == '_')
        .unwrap_or(false);
    let valid_rest =
        chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));

    if !valid_first || !valid_rest || tag.len() > 128 {
        return Err(ReferenceError::InvalidTag(tag.to_string()));
    }
    Ok(())
}

fn validate_digest(digest: &str) -> Result<(), ReferenceError> {
    let hex = digest
        .strip_prefix("sha256:")
        .ok_or_else(|| ReferenceError::InvalidDigest(digest.to_string()))?;

    if hex.len() != 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ReferenceError::InvalidDigest(digest.to_string()));
    }
    Ok(())
}
