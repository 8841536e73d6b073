//! The data store: playlist catalog and video CRUD.
//!
//! A [`DataStore`] owns one key in a [`KeyValueBacking`] and keeps the whole
//! catalog and watch-next queue there as a single JSON document. Every
//! mutating operation is a full read-modify-write of that document through
//! [`DataStore::load`] and [`DataStore::save`]; there is no in-memory cache to
//! go stale, so several stores over separate backings never interfere.
//!
//! Queue, topic, and import/export operations live in their own modules as
//! further `impl DataStore` blocks.

use std::collections::HashSet;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::backing::{FileBacking, KeyValueBacking, MemoryBacking};
use crate::config::StoreConfig;
use crate::error::{Error, Result, ValidationError};
use crate::model::{
    NewVideo, Playlist, PlaylistId, PlaylistStats, PlaylistUpdate, Video, VideoId, VideoUpdate,
};
use crate::queue::WatchNextEntry;
use crate::thumbnail::thumbnail_for_url;

/// Default key for the store document.
pub const DEFAULT_STORAGE_KEY: &str = "video-playlist-manager";

/// The persisted document: every playlist plus the watch-next queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreDocument {
    /// All playlists, in catalog order.
    #[serde(default)]
    pub playlists: Vec<Playlist>,
    /// Watch-next queue, in priority order.
    #[serde(default)]
    pub watch_next: Vec<WatchNextEntry>,
}

impl StoreDocument {
    /// Find a playlist by id.
    #[must_use]
    pub fn playlist(&self, id: &PlaylistId) -> Option<&Playlist> {
        self.playlists.iter().find(|p| &p.id == id)
    }

    /// Find a playlist by id, or fail with `NotFound`.
    pub fn playlist_mut(&mut self, id: &PlaylistId) -> Result<&mut Playlist> {
        self.playlists
            .iter_mut()
            .find(|p| &p.id == id)
            .ok_or_else(|| Error::playlist_not_found(id))
    }

    /// Find a video in a playlist, or fail with `NotFound`.
    pub fn video_mut(&mut self, playlist_id: &PlaylistId, video_id: &VideoId) -> Result<&mut Video> {
        self.playlist_mut(playlist_id)?
            .video_mut(video_id)
            .ok_or_else(|| Error::video_not_found(playlist_id, video_id))
    }
}

/// Local data store over a key-value backing.
pub struct DataStore<B: KeyValueBacking> {
    backing: B,
    key: String,
}

impl DataStore<MemoryBacking> {
    /// An isolated in-memory store under the default key.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(MemoryBacking::new(), DEFAULT_STORAGE_KEY)
    }
}

impl DataStore<FileBacking> {
    /// Open a file-backed store as described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the data directory
    /// cannot be created.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        config.validate()?;
        let backing = FileBacking::new(&config.data_directory)?;
        info!(
            "Opened store '{}' in {}",
            config.storage_key,
            config.data_directory.display()
        );
        Ok(Self::new(backing, config.storage_key.clone()))
    }
}

impl<B: KeyValueBacking> DataStore<B> {
    /// Create a store over `backing`, keeping its document under `key`.
    pub fn new(backing: B, key: impl Into<String>) -> Self {
        Self {
            backing,
            key: key.into(),
        }
    }

    /// The backing key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Borrow the backing.
    #[must_use]
    pub const fn backing(&self) -> &B {
        &self.backing
    }

    /// Read the whole document.
    ///
    /// Never fails: an absent key yields an empty document, and unreadable or
    /// corrupt data is logged and also yields an empty document.
    #[must_use]
    pub fn load(&self) -> StoreDocument {
        match self.backing.get(&self.key) {
            Ok(Some(content)) => match serde_json::from_str(&content) {
                Ok(document) => document,
                Err(e) => {
                    warn!(
                        "Stored document under '{}' is corrupt, falling back to an empty store: {}",
                        self.key, e
                    );
                    StoreDocument::default()
                }
            },
            Ok(None) => {
                debug!("No document under '{}', starting empty", self.key);
                StoreDocument::default()
            }
            Err(e) => {
                warn!(
                    "Failed to read '{}', falling back to an empty store: {}",
                    self.key, e
                );
                StoreDocument::default()
            }
        }
    }

    /// Write the whole document. Failures are logged and swallowed.
    pub fn save(&mut self, document: &StoreDocument) {
        let content = match serde_json::to_string(document) {
            Ok(content) => content,
            Err(e) => {
                error!("Failed to serialize store document: {}", e);
                return;
            }
        };
        if let Err(e) = self.backing.set(&self.key, &content) {
            error!("Failed to save '{}': {}", self.key, e);
        }
    }

    /// Load, apply `f`, and save only if `f` succeeded.
    pub(crate) fn modify<T>(
        &mut self,
        f: impl FnOnce(&mut StoreDocument) -> Result<T>,
    ) -> Result<T> {
        let mut document = self.load();
        let out = f(&mut document)?;
        self.save(&document);
        Ok(out)
    }

    // ------------------------------------------------------------------
    // Playlists
    // ------------------------------------------------------------------

    /// All playlists in catalog order.
    #[must_use]
    pub fn playlists(&self) -> Vec<Playlist> {
        self.load().playlists
    }

    /// A single playlist.
    #[must_use]
    pub fn playlist(&self, id: &PlaylistId) -> Option<Playlist> {
        self.load().playlist(id).cloned()
    }

    /// Create a new, empty playlist.
    ///
    /// Both `name` and `topic` are trimmed and must not be empty.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty name or topic.
    pub fn create_playlist(&mut self, name: &str, topic: &str) -> Result<Playlist> {
        let name = name.trim();
        let topic = topic.trim();
        if name.is_empty() {
            return Err(Error::empty_field("name"));
        }
        if topic.is_empty() {
            return Err(Error::empty_field("topic"));
        }

        let playlist = Playlist {
            id: PlaylistId::generate(),
            name: name.to_string(),
            topic: Some(topic.to_string()),
            videos: Vec::new(),
            created_at: Utc::now(),
        };

        let created = playlist.clone();
        self.modify(|doc| {
            doc.playlists.push(playlist);
            Ok(())
        })?;

        info!("Created playlist '{}' ({})", created.name, created.id);
        Ok(created)
    }

    /// Shallow-merge `update` into a playlist.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id, or a validation error if the new
    /// name is empty.
    pub fn update_playlist(&mut self, id: &PlaylistId, update: PlaylistUpdate) -> Result<Playlist> {
        let update = PlaylistUpdate {
            name: match update.name {
                Some(name) if name.trim().is_empty() => return Err(Error::empty_field("name")),
                other => other.map(|n| n.trim().to_string()),
            },
            topic: update
                .topic
                .map(|t| t.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())),
        };

        let updated = self.modify(|doc| {
            let playlist = doc.playlist_mut(id)?;
            playlist.apply(update);
            Ok(playlist.clone())
        })?;

        debug!("Updated playlist {}", id);
        Ok(updated)
    }

    /// Remove a playlist. Returns `false` if it did not exist.
    ///
    /// Queue entries pointing at its videos are left in place.
    pub fn delete_playlist(&mut self, id: &PlaylistId) -> bool {
        let removed = self
            .modify(|doc| {
                let before = doc.playlists.len();
                doc.playlists.retain(|p| &p.id != id);
                Ok(doc.playlists.len() != before)
            })
            .unwrap_or(false);

        if removed {
            info!("Deleted playlist {}", id);
        } else {
            debug!("Delete of unknown playlist {} ignored", id);
        }
        removed
    }

    /// Playlists whose name or topic contains `query` (case-insensitive).
    #[must_use]
    pub fn search_playlists(&self, query: &str) -> Vec<Playlist> {
        let query = query.to_lowercase();
        self.playlists()
            .into_iter()
            .filter(|p| {
                p.name.to_lowercase().contains(&query)
                    || p.topic
                        .as_deref()
                        .is_some_and(|t| t.to_lowercase().contains(&query))
            })
            .collect()
    }

    /// Watched/unwatched/missing-title counters for a playlist.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id.
    pub fn playlist_stats(&self, id: &PlaylistId) -> Result<PlaylistStats> {
        self.load()
            .playlist(id)
            .map(Playlist::stats)
            .ok_or_else(|| Error::playlist_not_found(id))
    }

    // ------------------------------------------------------------------
    // Videos
    // ------------------------------------------------------------------

    /// Append a video to a playlist.
    ///
    /// The thumbnail is derived from the URL here and never again.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown playlist, or a validation error for
    /// an empty URL.
    pub fn add_video(&mut self, playlist_id: &PlaylistId, video: NewVideo) -> Result<Video> {
        let url = video.url.trim();
        if url.is_empty() {
            return Err(Error::empty_field("url"));
        }
        let url = url.to_string();
        let title = video
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        let added = self.modify(|doc| {
            let playlist = doc.playlist_mut(playlist_id)?;
            let new_video = Video {
                id: VideoId::generate(),
                thumbnail: thumbnail_for_url(&url),
                url,
                title,
                notes: String::new(),
                watched: false,
                order: playlist.videos.len(),
                created_at: Utc::now(),
            };
            playlist.videos.push(new_video.clone());
            Ok(new_video)
        })?;

        info!("Added video {} to playlist {}", added.id, playlist_id);
        Ok(added)
    }

    /// Shallow-merge `update` into a video.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown playlist or video, or a validation
    /// error for an empty URL.
    pub fn update_video(
        &mut self,
        playlist_id: &PlaylistId,
        video_id: &VideoId,
        update: VideoUpdate,
    ) -> Result<Video> {
        let update = VideoUpdate {
            url: match update.url {
                Some(url) if url.trim().is_empty() => return Err(Error::empty_field("url")),
                other => other.map(|u| u.trim().to_string()),
            },
            title: update
                .title
                .map(|t| t.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())),
            ..update
        };

        self.modify(|doc| {
            let video = doc.video_mut(playlist_id, video_id)?;
            video.apply(update);
            Ok(video.clone())
        })
    }

    /// Flip a video's watched flag.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown playlist or video.
    pub fn toggle_watched(&mut self, playlist_id: &PlaylistId, video_id: &VideoId) -> Result<Video> {
        self.modify(|doc| {
            let video = doc.video_mut(playlist_id, video_id)?;
            video.watched = !video.watched;
            Ok(video.clone())
        })
    }

    /// Remove a video and close the gap in `order`.
    ///
    /// Returns `false` if the playlist or video did not exist.
    pub fn delete_video(&mut self, playlist_id: &PlaylistId, video_id: &VideoId) -> bool {
        let removed = self
            .modify(|doc| {
                let playlist = doc.playlist_mut(playlist_id)?;
                let before = playlist.videos.len();
                playlist.videos.retain(|v| &v.id != video_id);
                if playlist.videos.len() == before {
                    return Err(Error::video_not_found(playlist_id, video_id));
                }
                playlist.renumber();
                Ok(())
            })
            .is_ok();

        if removed {
            info!("Deleted video {} from playlist {}", video_id, playlist_id);
        } else {
            debug!(
                "Delete of unknown video {} in playlist {} ignored",
                video_id, playlist_id
            );
        }
        removed
    }

    /// Put a playlist's videos in the given order.
    ///
    /// `order` must contain every current video id exactly once.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown playlist, or a validation error if
    /// `order` is not a permutation of the current videos.
    pub fn reorder_videos(&mut self, playlist_id: &PlaylistId, order: &[VideoId]) -> Result<Vec<Video>> {
        self.modify(|doc| {
            let playlist = doc.playlist_mut(playlist_id)?;
            validate_permutation(playlist.videos.iter().map(|v| &v.id), order)?;

            let mut remaining = std::mem::take(&mut playlist.videos);
            for id in order {
                if let Some(pos) = remaining.iter().position(|v| &v.id == id) {
                    playlist.videos.push(remaining.swap_remove(pos));
                }
            }
            playlist.renumber();
            Ok(playlist.videos.clone())
        })
    }

    /// Videos in a playlist matching `query` over title, URL and notes.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown playlist.
    pub fn search_videos(&self, playlist_id: &PlaylistId, query: &str) -> Result<Vec<Video>> {
        let document = self.load();
        let playlist = document
            .playlist(playlist_id)
            .ok_or_else(|| Error::playlist_not_found(playlist_id))?;
        Ok(playlist
            .videos
            .iter()
            .filter(|v| v.matches_query(query))
            .cloned()
            .collect())
    }

    /// Videos whose title is absent or blank, in playlist order.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown playlist.
    pub fn videos_missing_titles(&self, playlist_id: &PlaylistId) -> Result<Vec<Video>> {
        let document = self.load();
        let playlist = document
            .playlist(playlist_id)
            .ok_or_else(|| Error::playlist_not_found(playlist_id))?;
        Ok(playlist
            .videos
            .iter()
            .filter(|v| v.is_missing_title())
            .cloned()
            .collect())
    }
}

impl<B: KeyValueBacking> std::fmt::Debug for DataStore<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataStore")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// Check that `requested` lists every id in `current` exactly once.
pub(crate) fn validate_permutation<'a>(
    current: impl Iterator<Item = &'a VideoId>,
    requested: &[VideoId],
) -> Result<()> {
    let current: HashSet<&VideoId> = current.collect();

    if requested.len() != current.len() {
        return Err(ValidationError::InvalidPermutation {
            reason: format!("expected {} ids, got {}", current.len(), requested.len()),
        }
        .into());
    }

    let mut seen = HashSet::with_capacity(requested.len());
    for id in requested {
        if !current.contains(id) {
            return Err(ValidationError::InvalidPermutation {
                reason: format!("unknown id {id}"),
            }
            .into());
        }
        if !seen.insert(id) {
            return Err(ValidationError::InvalidPermutation {
                reason: format!("duplicate id {id}"),
            }
            .into());
        }
    }
    Ok(())
}
