//! Store configuration.
//!
//! Handles loading and saving the settings that decide where the store keeps
//! its document and how missing titles are looked up.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::backing::validate_key;
use crate::error::{Error, FileSystemError, Result};
use crate::store::DEFAULT_STORAGE_KEY;

/// Default pause between title lookups, in milliseconds.
pub const DEFAULT_TITLE_FETCH_DELAY_MS: u64 = 300;

/// Default per-request timeout for title lookups, in seconds.
pub const DEFAULT_TITLE_FETCH_TIMEOUT_SECS: u64 = 10;

/// Default oEmbed proxy used to resolve video titles.
pub const DEFAULT_NOEMBED_ENDPOINT: &str = "https://noembed.com/embed";

/// Store configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreConfig {
    /// Directory holding the store document.
    #[serde(default = "default_data_directory")]
    pub data_directory: PathBuf,
    /// Key the document is stored under.
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
    /// Pause between title lookups.
    #[serde(default = "default_title_fetch_delay_ms")]
    pub title_fetch_delay_ms: u64,
    /// Timeout for a single title lookup.
    #[serde(default = "default_title_fetch_timeout_secs")]
    pub title_fetch_timeout_secs: u64,
    /// Title lookup endpoint.
    #[serde(default = "default_noembed_endpoint")]
    pub noembed_endpoint: String,
}

fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}

const fn default_title_fetch_delay_ms() -> u64 {
    DEFAULT_TITLE_FETCH_DELAY_MS
}

const fn default_title_fetch_timeout_secs() -> u64 {
    DEFAULT_TITLE_FETCH_TIMEOUT_SECS
}

fn default_noembed_endpoint() -> String {
    DEFAULT_NOEMBED_ENDPOINT.to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_directory: default_data_directory(),
            storage_key: default_storage_key(),
            title_fetch_delay_ms: DEFAULT_TITLE_FETCH_DELAY_MS,
            title_fetch_timeout_secs: DEFAULT_TITLE_FETCH_TIMEOUT_SECS,
            noembed_endpoint: default_noembed_endpoint(),
        }
    }
}

impl StoreConfig {
    /// Load configuration from the default location, or create defaults if
    /// not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let config_path = config_file_path();

        if !config_path.exists() {
            debug!("Config file not found, using defaults");
            let config = Self::default();
            if let Err(e) = config.save_to(&config_path) {
                warn!("Failed to save default config: {}", e);
            }
            return Ok(config);
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::FileSystem(FileSystemError::ReadFailed {
                path: path.to_path_buf(),
                reason: format!("Failed to read config file: {e}"),
            })
        })?;

        let config: Self = serde_json::from_str(&content)
            .map_err(|e| Error::Configuration(format!("Failed to parse config file: {e}")))?;

        info!("Loaded config from {}", path.display());
        debug!("Data directory: {}", config.data_directory.display());
        Ok(config)
    }

    /// Save configuration to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be written.
    pub fn save(&self) -> Result<()> {
        self.save_to(&config_file_path())
    }

    /// Save configuration to `path`, creating its parent directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|e| {
                Error::FileSystem(FileSystemError::CreateDirFailed {
                    path: parent.to_path_buf(),
                    reason: format!("Failed to create config directory: {e}"),
                })
            })?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| {
            Error::FileSystem(FileSystemError::WriteFailed {
                path: path.to_path_buf(),
                reason: format!("Failed to write config file: {e}"),
            })
        })?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Check the configuration for values the store cannot work with.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an empty storage key, an empty
    /// endpoint, or a zero timeout.
    pub fn validate(&self) -> Result<()> {
        if self.storage_key.trim().is_empty() {
            return Err(Error::Configuration(
                "Storage key cannot be empty".to_string(),
            ));
        }
        validate_key(&self.storage_key)?;
        if self.noembed_endpoint.trim().is_empty() {
            return Err(Error::Configuration(
                "Title lookup endpoint cannot be empty".to_string(),
            ));
        }
        if self.title_fetch_timeout_secs == 0 {
            return Err(Error::Configuration(
                "Title lookup timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Pause between title lookups.
    #[must_use]
    pub const fn title_fetch_delay(&self) -> Duration {
        Duration::from_millis(self.title_fetch_delay_ms)
    }

    /// Timeout for a single title lookup.
    #[must_use]
    pub const fn title_fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.title_fetch_timeout_secs)
    }

    /// Get the path to the default config file.
    #[must_use]
    pub fn config_file_path() -> PathBuf {
        config_file_path()
    }
}

/// Get the default data directory.
#[must_use]
pub fn default_data_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vidshelf")
}

fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| dirs::data_local_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join("vidshelf")
        .join("config.json")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert!(!config.data_directory.as_os_str().is_empty());
        assert_eq!(config.storage_key, "video-playlist-manager");
        assert_eq!(config.title_fetch_delay(), Duration::from_millis(300));
        assert_eq!(config.title_fetch_timeout(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialization_fills_defaults() {
        let json = r#"{"data_directory":"/custom/path"}"#;
        let config: StoreConfig = serde_json::from_str(json).expect("Should deserialize");
        assert_eq!(config.data_directory, PathBuf::from("/custom/path"));
        assert_eq!(config.storage_key, DEFAULT_STORAGE_KEY);
        assert_eq!(config.noembed_endpoint, DEFAULT_NOEMBED_ENDPOINT);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = TempDir::new().expect("Should create temp dir");
        let path = temp_dir.path().join("nested/config.json");
        let config = StoreConfig {
            data_directory: temp_dir.path().join("data"),
            storage_key: "custom".to_string(),
            title_fetch_delay_ms: 50,
            ..Default::default()
        };

        config.save_to(&path).expect("Should save");
        let loaded = StoreConfig::load_from(&path).expect("Should load");
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_from_missing_file() {
        let temp_dir = TempDir::new().expect("Should create temp dir");
        let err = StoreConfig::load_from(&temp_dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, Error::FileSystem(FileSystemError::ReadFailed { .. })));
    }

    #[test]
    fn test_load_from_invalid_json() {
        let temp_dir = TempDir::new().expect("Should create temp dir");
        let path = temp_dir.path().join("config.json");
        fs::write(&path, "{ nope").expect("Should write");
        let err = StoreConfig::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = StoreConfig {
            storage_key: "  ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = StoreConfig {
            title_fetch_timeout_secs: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("timeout"));

        let config = StoreConfig {
            noembed_endpoint: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unsafe_storage_key() {
        for key in ["a/b", "shelf one", "../shelf"] {
            let config = StoreConfig {
                storage_key: key.to_string(),
                ..Default::default()
            };
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("storage key"), "key {key:?}");
        }

        let config = StoreConfig {
            storage_key: "second-shelf".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_file_path_uses_correct_name() {
        let path = StoreConfig::config_file_path();
        assert!(path.ends_with("vidshelf/config.json"));
    }

    #[test]
    fn test_default_data_directory_is_app_specific() {
        let dir = default_data_directory();
        assert!(dir.ends_with("vidshelf"));
    }
}
