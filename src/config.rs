//! Runtime configuration and credential loading

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::api::DEFAULT_MIN_INTERVAL;

/// Base URL of the contest API
pub const DEFAULT_BASE_URL: &str = "http://2016sv.icfpcontest.org/api/";

/// Cache file, relative to the working directory
pub const DEFAULT_CACHE_PATH: &str = "./data.json";

/// Credential file, relative to the working directory
pub const DEFAULT_CREDENTIAL_PATH: &str = "./api_key";

/// How long a snapshot list stays fresh after its newest snapshot was taken
pub const DEFAULT_SNAPSHOT_TTL: Duration = Duration::from_secs(3600);

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The credential file could not be read
    #[error("Failed to read credential file {path}: {source}")]
    CredentialUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The credential file holds no key
    #[error("Credential file {0} is empty")]
    CredentialEmpty(PathBuf),
}

/// Settings for a `ContestClient`
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Base URL of the API
    pub base_url: String,
    /// Path of the JSON cache file
    pub cache_path: PathBuf,
    /// Path of the single-line API key file
    pub credential_path: PathBuf,
    /// Minimum spacing between two outbound requests
    pub min_request_interval: Duration,
    /// Freshness window of the cached snapshot list
    pub snapshot_ttl: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_path: PathBuf::from(DEFAULT_CACHE_PATH),
            credential_path: PathBuf::from(DEFAULT_CREDENTIAL_PATH),
            min_request_interval: DEFAULT_MIN_INTERVAL,
            snapshot_ttl: DEFAULT_SNAPSHOT_TTL,
        }
    }
}

/// The API key, read once at startup
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Credential")
            .field(&self.account_id())
            .finish()
    }
}

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Reads the key from `path`, trimming surrounding whitespace
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|source| ConfigError::CredentialUnreadable {
                path: path.to_path_buf(),
                source,
            })?;

        let secret = content.trim();
        if secret.is_empty() {
            return Err(ConfigError::CredentialEmpty(path.to_path_buf()));
        }
        Ok(Self(secret.to_string()))
    }

    /// Returns the raw header value
    pub fn secret(&self) -> &str {
        &self.0
    }

    /// Returns our own account id: the key's prefix up to the first `-`
    pub fn account_id(&self) -> &str {
        self.0.split('-').next().unwrap_or(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.base_url, "http://2016sv.icfpcontest.org/api/");
        assert_eq!(config.cache_path, PathBuf::from("./data.json"));
        assert_eq!(config.credential_path, PathBuf::from("./api_key"));
        assert_eq!(config.min_request_interval, Duration::from_secs(1));
        assert_eq!(config.snapshot_ttl, Duration::from_secs(3600));
    }

    #[test]
    fn test_account_id_is_prefix_before_dash() {
        let credential = Credential::new("42-0123456789abcdef");
        assert_eq!(credential.account_id(), "42");
    }

    #[test]
    fn test_account_id_without_dash_is_whole_key() {
        let credential = Credential::new("nodash");
        assert_eq!(credential.account_id(), "nodash");
    }

    #[test]
    fn test_load_trims_trailing_newline() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("api_key");
        fs::write(&path, "17-secret\n").unwrap();

        let credential = Credential::load(&path).unwrap();

        assert_eq!(credential.secret(), "17-secret");
        assert_eq!(credential.account_id(), "17");
    }

    #[test]
    fn test_load_missing_file_errors() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");

        let result = Credential::load(&temp_dir.path().join("missing"));

        assert!(matches!(
            result,
            Err(ConfigError::CredentialUnreadable { .. })
        ));
    }

    #[test]
    fn test_load_empty_file_errors() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("api_key");
        fs::write(&path, "  \n").unwrap();

        assert!(matches!(
            Credential::load(&path),
            Err(ConfigError::CredentialEmpty(_))
        ));
    }

    #[test]
    fn test_debug_hides_secret() {
        let credential = Credential::new("17-very-secret");
        let debug = format!("{:?}", credential);
        assert!(!debug.contains("very-secret"));
    }
}
