//! Metadata roles and per-role signing requirements.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies which role a signed document belongs to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RoleKind {
    /// Root role: defines the key set and thresholds for all roles.
    Root,
    /// Targets role: maps tags to content digests.
    Targets,
    /// Snapshot role: records versions of all metadata documents.
    Snapshot,
    /// Timestamp role: records the current snapshot version.
    Timestamp,
}

impl RoleKind {
    /// Returns the string representation of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleKind::Root => "root",
            RoleKind::Targets => "targets",
            RoleKind::Snapshot => "snapshot",
            RoleKind::Timestamp => "timestamp",
        }
    }
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Signing requirements for a role: who may sign, and how many must.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDefinition {
    /// Key IDs authorized to sign for this role.
    pub key_ids: Vec<String>,

    /// Minimum number of valid signatures from distinct authorized keys.
    pub threshold: u32,
}

impl RoleDefinition {
    /// Create a definition with a single authorized key.
    pub fn single(key_id: impl Into<String>) -> Self {
        Self {
            key_ids: vec![key_id.into()],
            threshold: 1,
        }
    }

    /// Whether the given key ID is authorized for this role.
    pub fn authorizes(&self, key_id: &str) -> bool {
        self.key_ids.iter().any(|k| k == key_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_str() {
        assert_eq!(RoleKind::Root.as_str(), "root");
        assert_eq!(RoleKind::Targets.to_string(), "targets");
    }

    #[test]
    fn test_role_serde_lowercase() {
        let json = serde_json::to_string(&RoleKind::Snapshot).unwrap();
        assert_eq!(json, "\"snapshot\"");
        let parsed: RoleKind = serde_json::from_str("\"timestamp\"").unwrap();
        assert_eq!(parsed, RoleKind::Timestamp);
    }

    #[test]
    fn test_role_definition_authorizes() {
        let def = RoleDefinition::single("key-1");
        assert!(def.authorizes("key-1"));
        assert!(!def.authorizes("key-2"));
        assert_eq!(def.threshold, 1);
    }
}
