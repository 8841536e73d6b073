//! Import and export of the whole store.
//!
//! Exports are a pretty-printed JSON document carrying a format version and
//! timestamp alongside the catalog and queue. Imports either replace the
//! store or merge new playlists into it. Records are validated one by one:
//! a malformed playlist or queue entry is skipped and counted rather than
//! failing the whole import.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::backing::KeyValueBacking;
use crate::error::{Error, FileSystemError, Result, ValidationError};
use crate::model::Playlist;
use crate::queue::{WATCH_NEXT_CAPACITY, WatchNextEntry};
use crate::store::DataStore;

/// Format version written into every export.
pub const EXPORT_VERSION: &str = "1.0";

/// Prefix of backup file names written by [`DataStore::export_to_dir`].
pub const BACKUP_FILE_PREFIX: &str = "video-playlists";

/// An exported snapshot of the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    /// Format version, informational only.
    pub version: String,
    /// When the export was taken, informational only.
    pub exported_at: DateTime<Utc>,
    /// Every playlist in catalog order.
    pub playlists: Vec<Playlist>,
    /// The watch-next queue.
    pub watch_next: Vec<WatchNextEntry>,
}

/// How an import combines with the current store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Replace the catalog and the queue.
    Replace,
    /// Append playlists with unseen ids; leave the queue alone.
    #[default]
    Merge,
}

/// Outcome of an import. Imports never raise; failures are reported here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    /// Whether the store was updated.
    pub success: bool,
    /// Number of playlist records in the input.
    pub playlists_imported: usize,
    /// Playlists that ended up in the store.
    pub playlists_added: usize,
    /// Queue entries imported (replace mode only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watch_next_imported: Option<usize>,
    /// Playlist records skipped as malformed.
    pub playlists_rejected: usize,
    /// Queue records skipped as malformed.
    pub watch_next_rejected: usize,
    /// Failure message when `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ImportResult {
    /// A failed import carrying `error`'s message.
    fn failed(error: &Error) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            ..Self::default()
        }
    }
}

/// Playlist and queue records that passed per-record validation.
#[derive(Debug, Default)]
struct AcceptedRecords {
    playlists: Vec<Playlist>,
    playlists_total: usize,
    playlists_rejected: usize,
    watch_next: Vec<WatchNextEntry>,
    watch_next_rejected: usize,
}

/// Validate the shape of an import document and sort its records.
fn parse_import(text: &str) -> Result<AcceptedRecords> {
    let invalid = || {
        Error::from(ValidationError::InvalidImport {
            reason: "missing or invalid playlists".to_string(),
        })
    };

    let document: Value = serde_json::from_str(text).map_err(|_| invalid())?;
    let records = document
        .get("playlists")
        .and_then(Value::as_array)
        .ok_or_else(invalid)?;

    let mut accepted = AcceptedRecords {
        playlists_total: records.len(),
        ..AcceptedRecords::default()
    };

    for (index, record) in records.iter().enumerate() {
        match serde_json::from_value::<Playlist>(record.clone()) {
            Ok(mut playlist)
                if !playlist.id.as_str().is_empty() && !playlist.name.trim().is_empty() =>
            {
                playlist.videos.sort_by_key(|v| v.order);
                playlist.renumber();
                accepted.playlists.push(playlist);
            }
            Ok(_) => {
                warn!("Skipping imported playlist #{}: empty id or name", index);
                accepted.playlists_rejected += 1;
            }
            Err(e) => {
                warn!("Skipping imported playlist #{}: {}", index, e);
                accepted.playlists_rejected += 1;
            }
        }
    }

    match document.get("watchNext") {
        None | Some(Value::Null) => {}
        Some(Value::Array(entries)) => {
            for (index, entry) in entries.iter().enumerate() {
                match serde_json::from_value::<WatchNextEntry>(entry.clone()) {
                    Ok(entry) => accepted.watch_next.push(entry),
                    Err(e) => {
                        warn!("Skipping imported queue entry #{}: {}", index, e);
                        accepted.watch_next_rejected += 1;
                    }
                }
            }
        }
        Some(_) => {
            warn!("Imported watchNext is not a list, ignoring it");
        }
    }

    Ok(accepted)
}

/// Keep the first playlist for each id.
fn dedup_playlists(playlists: Vec<Playlist>) -> Vec<Playlist> {
    let mut seen = HashSet::new();
    playlists
        .into_iter()
        .filter(|p| seen.insert(p.id.clone()))
        .collect()
}

/// Keep the first entry for each video id, up to the queue capacity.
fn dedup_watch_next(entries: Vec<WatchNextEntry>) -> Vec<WatchNextEntry> {
    let mut seen = HashSet::new();
    let mut kept: Vec<WatchNextEntry> = entries
        .into_iter()
        .filter(|e| seen.insert(e.video_id.clone()))
        .collect();
    if kept.len() > WATCH_NEXT_CAPACITY {
        warn!(
            "Imported queue has {} entries, keeping the first {}",
            kept.len(),
            WATCH_NEXT_CAPACITY
        );
        kept.truncate(WATCH_NEXT_CAPACITY);
    }
    kept
}

/// Backup file name for an export taken at `at`.
#[must_use]
pub fn backup_file_name(at: DateTime<Utc>) -> String {
    format!("{BACKUP_FILE_PREFIX}-{}.json", at.format("%Y-%m-%dT%H-%M-%S"))
}

impl<B: KeyValueBacking> DataStore<B> {
    /// Snapshot the store for export.
    #[must_use]
    pub fn export_document(&self) -> ExportDocument {
        let document = self.load();
        ExportDocument {
            version: EXPORT_VERSION.to_string(),
            exported_at: Utc::now(),
            playlists: document.playlists,
            watch_next: document.watch_next,
        }
    }

    /// Export the store as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.export_document())?)
    }

    /// Write a timestamped backup file into `dir` and return its path.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file cannot
    /// be written.
    pub fn export_to_dir(&self, dir: &Path) -> Result<PathBuf> {
        if !dir.exists() {
            fs::create_dir_all(dir).map_err(|e| {
                Error::FileSystem(FileSystemError::CreateDirFailed {
                    path: dir.to_path_buf(),
                    reason: e.to_string(),
                })
            })?;
        }

        let document = self.export_document();
        let path = dir.join(backup_file_name(document.exported_at));
        let content = serde_json::to_string_pretty(&document)?;
        fs::write(&path, content).map_err(|e| {
            Error::FileSystem(FileSystemError::WriteFailed {
                path: path.clone(),
                reason: e.to_string(),
            })
        })?;

        info!(
            "Exported {} playlist(s) to {}",
            document.playlists.len(),
            path.display()
        );
        Ok(path)
    }

    /// Import a JSON document.
    ///
    /// The store is only written when the document's overall shape is valid;
    /// otherwise the result carries `success == false` and an error message.
    pub fn import_json(&mut self, text: &str, mode: ImportMode) -> ImportResult {
        let accepted = match parse_import(text) {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("Import rejected: {}", e);
                return ImportResult::failed(&e);
            }
        };

        let AcceptedRecords {
            playlists,
            playlists_total,
            playlists_rejected,
            watch_next,
            watch_next_rejected,
        } = accepted;

        let applied = self.modify(|doc| {
            let result = match mode {
                ImportMode::Replace => {
                    doc.playlists = dedup_playlists(playlists);
                    doc.watch_next = dedup_watch_next(watch_next);
                    ImportResult {
                        success: true,
                        playlists_imported: playlists_total,
                        playlists_added: doc.playlists.len(),
                        watch_next_imported: Some(doc.watch_next.len()),
                        playlists_rejected,
                        watch_next_rejected,
                        error: None,
                    }
                }
                ImportMode::Merge => {
                    let before = doc.playlists.len();
                    let mut seen: HashSet<_> = doc.playlists.iter().map(|p| p.id.clone()).collect();
                    doc.playlists
                        .extend(playlists.into_iter().filter(|p| seen.insert(p.id.clone())));
                    ImportResult {
                        success: true,
                        playlists_imported: playlists_total,
                        playlists_added: doc.playlists.len() - before,
                        watch_next_imported: None,
                        playlists_rejected,
                        watch_next_rejected,
                        error: None,
                    }
                }
            };
            Ok(result)
        });

        match applied {
            Ok(result) => {
                info!(
                    "Imported {} of {} playlist(s) ({:?} mode, {} rejected)",
                    result.playlists_added, result.playlists_imported, mode, result.playlists_rejected
                );
                result
            }
            Err(e) => ImportResult::failed(&e),
        }
    }
}
