//! Error types for Vidshelf core operations.
//!
//! Errors are grouped by domain. Each domain has its own enum which is
//! wrapped by the top-level [`Error`]; callers that only care about the broad
//! category can use [`Error::kind`].

use std::path::PathBuf;

use thiserror::Error;

use crate::model::{PlaylistId, VideoId};

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Vidshelf core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Input rejected before any mutation took place.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// An operation referenced an id that is not in the catalog.
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    /// The watch-next queue refused an entry.
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// File system operation on the backing store failed.
    #[error(transparent)]
    FileSystem(#[from] FileSystemError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Network lookup failed.
    #[error("Network error: {0}")]
    Network(String),
}

/// Validation failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was empty after trimming.
    #[error("{field} cannot be empty")]
    EmptyField {
        /// Name of the offending field.
        field: &'static str,
    },

    /// A reorder request was not a permutation of the current ids.
    #[error("Invalid reorder: {reason}")]
    InvalidPermutation {
        /// Why the sequence was rejected.
        reason: String,
    },

    /// An import document was structurally invalid.
    #[error("Invalid data format: {reason}")]
    InvalidImport {
        /// What was wrong with the document.
        reason: String,
    },
}

/// Lookup failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotFoundError {
    /// Playlist id not present in the catalog.
    #[error("Playlist not found: {id}")]
    Playlist {
        /// The missing playlist id.
        id: PlaylistId,
    },

    /// Video id not present in the playlist.
    #[error("Video {video_id} not found in playlist {playlist_id}")]
    Video {
        /// The playlist that was searched.
        playlist_id: PlaylistId,
        /// The missing video id.
        video_id: VideoId,
    },
}

/// Watch-next queue refusals.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// Queue is at its hard capacity.
    #[error("Watch next queue is full (maximum {capacity} videos)")]
    Full {
        /// Configured capacity.
        capacity: usize,
    },

    /// The video is already queued.
    #[error("Video {video_id} is already in the watch next queue")]
    AlreadyQueued {
        /// The duplicate video id.
        video_id: VideoId,
    },
}

/// File system failures.
#[derive(Debug, Error)]
pub enum FileSystemError {
    /// Reading a file failed.
    #[error("Failed to read {path}: {reason}")]
    ReadFailed {
        /// Path that could not be read.
        path: PathBuf,
        /// Underlying reason.
        reason: String,
    },

    /// Writing a file failed.
    #[error("Failed to write {path}: {reason}")]
    WriteFailed {
        /// Path that could not be written.
        path: PathBuf,
        /// Underlying reason.
        reason: String,
    },

    /// Creating a directory failed.
    #[error("Failed to create directory {path}: {reason}")]
    CreateDirFailed {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying reason.
        reason: String,
    },
}

/// Coarse error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input.
    Validation,
    /// Unknown id.
    NotFound,
    /// Queue refused the entry.
    Capacity,
    /// Backing store or serialization failure.
    Storage,
    /// Network failure.
    Network,
    /// Configuration problem.
    Config,
}

impl Error {
    /// Get the broad category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Queue(_) => ErrorKind::Capacity,
            Self::FileSystem(_) | Self::Serialization(_) => ErrorKind::Storage,
            Self::Network(_) => ErrorKind::Network,
            Self::Configuration(_) => ErrorKind::Config,
        }
    }

    /// Shorthand for an empty required field.
    #[must_use]
    pub const fn empty_field(field: &'static str) -> Self {
        Self::Validation(ValidationError::EmptyField { field })
    }

    /// Shorthand for a missing playlist.
    #[must_use]
    pub fn playlist_not_found(id: &PlaylistId) -> Self {
        Self::NotFound(NotFoundError::Playlist { id: id.clone() })
    }

    /// Shorthand for a missing video.
    #[must_use]
    pub fn video_not_found(playlist_id: &PlaylistId, video_id: &VideoId) -> Self {
        Self::NotFound(NotFoundError::Video {
            playlist_id: playlist_id.clone(),
            video_id: video_id.clone(),
        })
    }

    /// Create a network error.
    pub fn network_error(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }
}
