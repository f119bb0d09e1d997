//! Trust lane configuration
//!
//! Implements the 3-layer configuration merge:
//! 1. Built-in defaults
//! 2. Config file (`<config_dir>/trust.toml`)
//! 3. CLI flags
//!
//! Configuration is an explicit value passed into resolution, never ambient
//! process state, so parallel resolutions against distinct config
//! directories stay deterministic and isolated.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::client::DEFAULT_NOTARY_ENDPOINT;
use crate::verify::VerifyPolicy;

/// File name of the trust configuration inside the config directory.
pub const CONFIG_FILE_NAME: &str = "trust.toml";

/// Default overall fetch timeout in seconds.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Upper bound on the configurable fetch timeout.
pub const MAX_TIMEOUT_SECONDS: u64 = 300;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Registry credential entry, `auth` being base64(`user:password`).
///
/// Same shape as the `auths` entries in a docker-style `config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthEntry {
    /// Base64-encoded `user:password`.
    pub auth: String,
}

/// On-disk configuration file layout.
#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigFile {
    /// Trust service endpoint.
    server: Option<String>,

    /// Overall fetch timeout in seconds.
    timeout_seconds: Option<u64>,

    /// Override for the root-role signature threshold.
    root_threshold: Option<u32>,

    /// Override for the targets-role signature threshold.
    targets_threshold: Option<u32>,

    /// Credentials by server endpoint.
    #[serde(default)]
    auths: BTreeMap<String, AuthEntry>,
}

/// CLI-level overrides, the highest-precedence layer.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Trust service endpoint override (the evil-server switch).
    pub server: Option<String>,

    /// Overall fetch timeout override in seconds.
    pub timeout_seconds: Option<u64>,

    /// Root-role threshold override.
    pub root_threshold: Option<u32>,
}

/// Effective trust configuration after the merge.
#[derive(Debug, Clone)]
pub struct TrustConfig {
    /// Directory holding trust state and credentials.
    pub config_dir: PathBuf,

    /// Trust service endpoint to contact.
    pub server: String,

    /// Overall fetch timeout.
    pub timeout: Duration,

    /// Root-role threshold override, if configured.
    pub root_threshold: Option<u32>,

    /// Targets-role threshold override, if configured.
    pub targets_threshold: Option<u32>,

    auths: BTreeMap<String, AuthEntry>,
}

impl TrustConfig {
    /// Build the effective configuration for a config directory.
    pub fn load(config_dir: &Path, overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        let file = Self::load_file(&config_dir.join(CONFIG_FILE_NAME))?;

        let server = overrides
            .server
            .clone()
            .or(file.server)
            .unwrap_or_else(|| DEFAULT_NOTARY_ENDPOINT.to_string());
        let timeout_seconds = overrides
            .timeout_seconds
            .or(file.timeout_seconds)
            .unwrap_or(DEFAULT_TIMEOUT_SECONDS);
        let root_threshold = overrides.root_threshold.or(file.root_threshold);

        let config = Self {
            config_dir: config_dir.to_path_buf(),
            server,
            timeout: Duration::from_secs(timeout_seconds),
            root_threshold,
            targets_threshold: file.targets_threshold,
            auths: file.auths,
        };
        config.validate(timeout_seconds)?;
        Ok(config)
    }

    fn load_file(path: &Path) -> Result<ConfigFile, ConfigError> {
        if !path.exists() {
            return Ok(ConfigFile::default());
        }
        let contents = fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn validate(&self, timeout_seconds: u64) -> Result<(), ConfigError> {
        if timeout_seconds == 0 || timeout_seconds > MAX_TIMEOUT_SECONDS {
            return Err(ConfigError::Validation(format!(
                "timeout_seconds must be in (0, {}]",
                MAX_TIMEOUT_SECONDS
            )));
        }
        for (name, threshold) in [
            ("root_threshold", self.root_threshold),
            ("targets_threshold", self.targets_threshold),
        ] {
            if threshold == Some(0) {
                return Err(ConfigError::Validation(format!(
                    "{} must be at least 1",
                    name
                )));
            }
        }
        Ok(())
    }

    /// The trust service endpoint in effect.
    pub fn endpoint(&self) -> &str {
        &self.server
    }

    /// `Authorization` header value for the effective endpoint, if credentials
    /// are configured for it.
    pub fn authorization(&self) -> Option<String> {
        self.auths
            .get(&self.server)
            .map(|entry| format!("Basic {}", entry.auth))
    }

    /// The verification threshold policy implied by this configuration.
    pub fn verify_policy(&self) -> VerifyPolicy {
        VerifyPolicy {
            root_threshold_override: self.root_threshold,
            targets_threshold_override: self.targets_threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_file() {
        let dir = TempDir::new().unwrap();
        let config = TrustConfig::load(dir.path(), &ConfigOverrides::default()).unwrap();

        assert_eq!(config.endpoint(), DEFAULT_NOTARY_ENDPOINT);
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECONDS));
        assert!(config.root_threshold.is_none());
        assert!(config.authorization().is_none());
    }

    #[test]
    fn test_file_layer_applies() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"
            server = "https://notary.internal:4443"
            timeout_seconds = 10
            root_threshold = 2

            [auths."https://notary.internal:4443"]
            auth = "ZWlhaXM6cGFzc3dvcmQK"
            "#,
        )
        .unwrap();

        let config = TrustConfig::load(dir.path(), &ConfigOverrides::default()).unwrap();
        assert_eq!(config.endpoint(), "https://notary.internal:4443");
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.root_threshold, Some(2));
        assert_eq!(
            config.authorization().unwrap(),
            "Basic ZWlhaXM6cGFzc3dvcmQK"
        );
    }

    #[test]
    fn test_cli_overrides_win() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "server = \"https://from-file\"\ntimeout_seconds = 10\n",
        )
        .unwrap();

        let overrides = ConfigOverrides {
            server: Some("https://evil-notary:4443".to_string()),
            timeout_seconds: Some(5),
            root_threshold: None,
        };
        let config = TrustConfig::load(dir.path(), &overrides).unwrap();
        assert_eq!(config.endpoint(), "https://evil-notary:4443");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_credentials_scoped_to_endpoint() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"
            server = "https://a"

            [auths."https://b"]
            auth = "Zm9vOmJhcg=="
            "#,
        )
        .unwrap();

        let config = TrustConfig::load(dir.path(), &ConfigOverrides::default()).unwrap();
        // No credentials leak to an endpoint they were not configured for.
        assert!(config.authorization().is_none());
    }

    #[test]
    fn test_timeout_validation() {
        let dir = TempDir::new().unwrap();
        let overrides = ConfigOverrides {
            timeout_seconds: Some(0),
            ..Default::default()
        };
        let err = TrustConfig::load(dir.path(), &overrides).unwrap_err();
        assert!(err.to_string().contains("timeout_seconds"));

        let overrides = ConfigOverrides {
            timeout_seconds: Some(301),
            ..Default::default()
        };
        assert!(TrustConfig::load(dir.path(), &overrides).is_err());
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let dir = TempDir::new().unwrap();
        let overrides = ConfigOverrides {
            root_threshold: Some(0),
            ..Default::default()
        };
        let err = TrustConfig::load(dir.path(), &overrides).unwrap_err();
        assert!(err.to_string().contains("root_threshold"));
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "server = [not toml").unwrap();

        let err = TrustConfig::load(dir.path(), &ConfigOverrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_verify_policy_mapping() {
        let dir = TempDir::new().unwrap();
        let overrides = ConfigOverrides {
            root_threshold: Some(2),
            ..Default::default()
        };
        let config = TrustConfig::load(dir.path(), &overrides).unwrap();
        let policy = config.verify_policy();
        assert_eq!(policy.root_threshold_override, Some(2));
        assert!(policy.targets_threshold_override.is_none());
    }
}
