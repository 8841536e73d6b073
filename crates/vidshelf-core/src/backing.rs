//! Persistent key-value backing for the data store.
//!
//! The store keeps its entire document under a single key and rewrites it on
//! every mutation. Backends only need to get and set opaque JSON text.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, FileSystemError, Result};

/// Key-value backing trait for testability.
#[cfg_attr(test, mockall::automock)]
pub trait KeyValueBacking: Send {
    /// Read the value stored under `key`, or `None` if nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// In-memory backing. Each instance is isolated.
#[derive(Debug, Clone, Default)]
pub struct MemoryBacking {
    entries: HashMap<String, String>,
}

impl MemoryBacking {
    /// Create an empty backing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backing pre-seeded with one value.
    #[must_use]
    pub fn with_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut entries = HashMap::new();
        entries.insert(key.into(), value.into());
        Self { entries }
    }
}

impl KeyValueBacking for MemoryBacking {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// File backing: one `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileBacking {
    directory: PathBuf,
}

impl FileBacking {
    /// Create a file backing rooted at `directory`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(directory: impl Into<PathBuf>) -> Result<Self> {
        let directory = directory.into();
        if !directory.exists() {
            fs::create_dir_all(&directory).map_err(|e| {
                Error::FileSystem(FileSystemError::CreateDirFailed {
                    path: directory.clone(),
                    reason: e.to_string(),
                })
            })?;
        }
        Ok(Self { directory })
    }

    /// Directory holding the value files.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of the file holding `key`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `key` is not a valid key.
    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.directory.join(format!("{key}.json")))
    }
}

/// Check that `key` can be used as a storage key.
///
/// Keys map one-to-one onto file names, so only ASCII letters, digits, `-`,
/// `_` and `.` are allowed, and `.` / `..` are refused.
///
/// # Errors
///
/// Returns a configuration error describing the offending key.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() || key == "." || key == ".." {
        return Err(Error::Configuration(format!("Invalid storage key '{key}'")));
    }
    if let Some(c) = key
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(Error::Configuration(format!(
            "Invalid character {c:?} in storage key '{key}'"
        )));
    }
    Ok(())
}

impl KeyValueBacking for FileBacking {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).map_err(|e| {
            Error::FileSystem(FileSystemError::ReadFailed {
                path: path.clone(),
                reason: e.to_string(),
            })
        })?;
        Ok(Some(content))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        // Write-then-rename; readers only ever see a complete document.
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, value).map_err(|e| {
            Error::FileSystem(FileSystemError::WriteFailed {
                path: tmp_path.clone(),
                reason: e.to_string(),
            })
        })?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            Error::FileSystem(FileSystemError::WriteFailed {
                path: path.clone(),
                reason: e.to_string(),
            })
        })?;
        debug!("Wrote {} bytes to {}", value.len(), path.display());
        Ok(())
    }
}
