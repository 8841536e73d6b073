//! `Vidshelf` Core Library
//!
//! This crate provides the local data store behind `Vidshelf`:
//! - Playlists of bookmarked video links, grouped by topic
//! - Video CRUD with thumbnail derivation for `YouTube` URLs
//! - A bounded watch-next queue
//! - JSON import/export with replace and merge modes
//! - Bulk lookup of missing video titles
//! - Store configuration and logging setup
//!
//! # Error Handling
//!
//! This crate uses typed errors for each domain. See the [`error`] module for
//! details.
//!
//! ```rust,ignore
//! use vidshelf_core::{DataStore, NewVideo, Result};
//!
//! fn bookmark() -> Result<()> {
//!     let mut store = DataStore::in_memory();
//!     let playlist = store.create_playlist("Talks", "Rust")?;
//!     store.add_video(&playlist.id, NewVideo::new("https://youtu.be/dQw4w9WgXcQ"))?;
//!     Ok(())
//! }
//! ```

pub mod backing;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod queue;
pub mod store;
pub mod thumbnail;
pub mod titles;
pub mod topic;
pub mod transfer;

pub use backing::{FileBacking, KeyValueBacking, MemoryBacking, validate_key};
pub use config::{
    DEFAULT_NOEMBED_ENDPOINT, DEFAULT_TITLE_FETCH_DELAY_MS, DEFAULT_TITLE_FETCH_TIMEOUT_SECS,
    StoreConfig, default_data_directory,
};
pub use error::{
    Error, ErrorKind, FileSystemError, NotFoundError, QueueError, Result, ValidationError,
};
pub use logging::{LogRotation, LoggingConfig, LoggingGuard, default_log_directory, init_logging};
pub use model::{
    NewVideo, Playlist, PlaylistId, PlaylistStats, PlaylistUpdate, UNCATEGORIZED, Video, VideoId,
    VideoUpdate,
};
pub use queue::{WATCH_NEXT_CAPACITY, WatchNextEntry};
pub use store::{DEFAULT_STORAGE_KEY, DataStore, StoreDocument};
pub use thumbnail::{extract_video_id, thumbnail_for_url, youtube_thumbnail_url};
pub use titles::{NoembedTitleResolver, TitleFetchOptions, TitleFetchSummary, TitleResolver};
pub use topic::{TopicDeletion, TopicDeletionCheck, TopicGroup};
pub use transfer::{EXPORT_VERSION, ExportDocument, ImportMode, ImportResult, backup_file_name};
