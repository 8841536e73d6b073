//! Watch-next queue.
//!
//! A small, strictly ordered list of videos to watch soon. Entries are
//! snapshots taken at enqueue time: editing or deleting the source video
//! later does not touch its queue entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::backing::KeyValueBacking;
use crate::error::{QueueError, Result};
use crate::model::{PlaylistId, Video, VideoId, VideoUpdate};
use crate::store::{DataStore, validate_permutation};

/// Maximum number of entries in the watch-next queue.
pub const WATCH_NEXT_CAPACITY: usize = 8;

/// A queued video, denormalized at enqueue time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchNextEntry {
    /// Id of the source video.
    pub video_id: VideoId,
    /// URL at enqueue time.
    pub url: String,
    /// Title at enqueue time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Thumbnail at enqueue time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    /// Playlist the video belonged to.
    pub playlist_id: PlaylistId,
    /// Name of that playlist at enqueue time.
    #[serde(default)]
    pub playlist_name: String,
    /// When the entry was queued.
    #[serde(default = "Utc::now")]
    pub added_at: DateTime<Utc>,
}

impl WatchNextEntry {
    /// Snapshot `video` as a queue entry.
    #[must_use]
    pub fn snapshot(video: &Video, playlist_id: &PlaylistId, playlist_name: &str) -> Self {
        Self {
            video_id: video.id.clone(),
            url: video.url.clone(),
            title: video.title.clone(),
            thumbnail: video.thumbnail.clone(),
            playlist_id: playlist_id.clone(),
            playlist_name: playlist_name.to_string(),
            added_at: Utc::now(),
        }
    }

    /// Title if present, otherwise the URL.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(&self.url)
    }
}

impl<B: KeyValueBacking> DataStore<B> {
    /// The queue in priority order.
    #[must_use]
    pub fn watch_next(&self) -> Vec<WatchNextEntry> {
        self.load().watch_next
    }

    /// Whether another entry fits.
    #[must_use]
    pub fn has_capacity(&self) -> bool {
        self.load().watch_next.len() < WATCH_NEXT_CAPACITY
    }

    /// Whether `video_id` is queued.
    #[must_use]
    pub fn is_queued(&self, video_id: &VideoId) -> bool {
        self.load().watch_next.iter().any(|e| &e.video_id == video_id)
    }

    /// Append a snapshot of `video` to the queue.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::AlreadyQueued` for a duplicate and
    /// `QueueError::Full` when the queue is at capacity. Neither mutates.
    pub fn try_enqueue(
        &mut self,
        video: &Video,
        playlist_id: &PlaylistId,
        playlist_name: &str,
    ) -> Result<WatchNextEntry> {
        let entry = self.modify(|doc| {
            if doc.watch_next.iter().any(|e| e.video_id == video.id) {
                return Err(QueueError::AlreadyQueued {
                    video_id: video.id.clone(),
                }
                .into());
            }
            if doc.watch_next.len() >= WATCH_NEXT_CAPACITY {
                return Err(QueueError::Full {
                    capacity: WATCH_NEXT_CAPACITY,
                }
                .into());
            }
            let entry = WatchNextEntry::snapshot(video, playlist_id, playlist_name);
            doc.watch_next.push(entry.clone());
            Ok(entry)
        })?;

        info!("Queued video {} to watch next", entry.video_id);
        Ok(entry)
    }

    /// Append a snapshot of `video` to the queue.
    ///
    /// Returns `false` without mutating if the video is already queued or the
    /// queue is full.
    pub fn enqueue(&mut self, video: &Video, playlist_id: &PlaylistId, playlist_name: &str) -> bool {
        match self.try_enqueue(video, playlist_id, playlist_name) {
            Ok(_) => true,
            Err(e) => {
                debug!("Enqueue refused: {}", e);
                false
            }
        }
    }

    /// Remove `video_id` from the queue. No-op if absent.
    pub fn dequeue(&mut self, video_id: &VideoId) {
        let removed = self
            .modify(|doc| {
                let before = doc.watch_next.len();
                doc.watch_next.retain(|e| &e.video_id != video_id);
                Ok(before != doc.watch_next.len())
            })
            .unwrap_or(false);
        if removed {
            info!("Removed video {} from watch next", video_id);
        }
    }

    /// Mark the source video watched, then remove it from the queue.
    ///
    /// The queue entry is removed even if the playlist or video no longer
    /// exists.
    pub fn mark_watched_and_dequeue(&mut self, video_id: &VideoId, playlist_id: &PlaylistId) {
        if let Err(e) = self.update_video(playlist_id, video_id, VideoUpdate::default().watched(true)) {
            debug!("Source of queued video {} not updated: {}", video_id, e);
        }
        self.dequeue(video_id);
    }

    /// Put the queue in the given order.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `order` is not a permutation of the
    /// queued video ids.
    pub fn reorder_watch_next(&mut self, order: &[VideoId]) -> Result<Vec<WatchNextEntry>> {
        self.modify(|doc| {
            validate_permutation(doc.watch_next.iter().map(|e| &e.video_id), order)?;
            let mut remaining = std::mem::take(&mut doc.watch_next);
            for id in order {
                if let Some(pos) = remaining.iter().position(|e| &e.video_id == id) {
                    doc.watch_next.push(remaining.swap_remove(pos));
                }
            }
            Ok(doc.watch_next.clone())
        })
    }

    /// Empty the queue.
    pub fn clear_watch_next(&mut self) {
        let mut document = self.load();
        let cleared = document.watch_next.len();
        document.watch_next.clear();
        self.save(&document);
        info!("Cleared {} entries from watch next queue", cleared);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::backing::{MemoryBacking, MockKeyValueBacking};
    use crate::error::{Error, ErrorKind, ValidationError};
    use crate::store::StoreDocument;
    use crate::model::{NewVideo, Playlist};

    fn setup(videos: usize) -> (DataStore<MemoryBacking>, Playlist, Vec<Video>) {
        let mut store = DataStore::in_memory();
        let playlist = store.create_playlist("Queue source", "Go").expect("create");
        let videos = (0..videos)
            .map(|i| {
                store
                    .add_video(
                        &playlist.id,
                        NewVideo::new(format!("https://youtu.be/video{i:06}")).with_title(format!("Video {i}")),
                    )
                    .expect("add")
            })
            .collect();
        (store, playlist, videos)
    }

    #[test]
    fn test_enqueue_snapshot() {
        let (mut store, playlist, videos) = setup(1);
        assert!(store.enqueue(&videos[0], &playlist.id, &playlist.name));

        let queue = store.watch_next();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].video_id, videos[0].id);
        assert_eq!(queue[0].title.as_deref(), Some("Video 0"));
        assert_eq!(queue[0].playlist_name, "Queue source");
        assert!(store.is_queued(&videos[0].id));
    }

    #[test]
    fn test_enqueue_duplicate_returns_false() {
        let (mut store, playlist, videos) = setup(1);
        assert!(store.enqueue(&videos[0], &playlist.id, &playlist.name));
        assert!(!store.enqueue(&videos[0], &playlist.id, &playlist.name));
        assert_eq!(store.watch_next().len(), 1);

        let err = store
            .try_enqueue(&videos[0], &playlist.id, &playlist.name)
            .unwrap_err();
        assert!(matches!(err, Error::Queue(QueueError::AlreadyQueued { .. })));
    }

    #[test]
    fn test_ninth_enqueue_is_refused() {
        let (mut store, playlist, videos) = setup(9);
        for video in &videos[..8] {
            assert!(store.enqueue(video, &playlist.id, &playlist.name));
        }
        assert!(!store.has_capacity());
        let before = store.watch_next();

        assert!(!store.enqueue(&videos[8], &playlist.id, &playlist.name));
        assert_eq!(store.watch_next(), before);

        let err = store
            .try_enqueue(&videos[8], &playlist.id, &playlist.name)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Capacity);
    }

    #[test]
    fn test_dequeue_absent_is_noop() {
        let (mut store, playlist, videos) = setup(2);
        store.enqueue(&videos[0], &playlist.id, &playlist.name);
        store.dequeue(&videos[1].id);
        assert_eq!(store.watch_next().len(), 1);
        store.dequeue(&videos[0].id);
        assert!(store.watch_next().is_empty());
        assert!(store.has_capacity());
    }

    #[test]
    fn test_mark_watched_and_dequeue() {
        let (mut store, playlist, videos) = setup(1);
        store.enqueue(&videos[0], &playlist.id, &playlist.name);
        store.mark_watched_and_dequeue(&videos[0].id, &playlist.id);

        assert!(store.watch_next().is_empty());
        let p = store.playlist(&playlist.id).expect("exists");
        assert!(p.videos[0].watched);
    }

    #[test]
    fn test_mark_watched_and_dequeue_unknown_playlist() {
        let (mut store, playlist, videos) = setup(1);
        store.enqueue(&videos[0], &playlist.id, &playlist.name);
        store.mark_watched_and_dequeue(&videos[0].id, &PlaylistId::new("gone"));
        assert!(store.watch_next().is_empty());
    }

    #[test]
    fn test_snapshot_survives_source_edits_and_deletes() {
        let (mut store, playlist, videos) = setup(1);
        store.enqueue(&videos[0], &playlist.id, &playlist.name);
        store
            .update_video(&playlist.id, &videos[0].id, VideoUpdate::default().title("Renamed"))
            .expect("update");
        assert_eq!(store.watch_next()[0].title.as_deref(), Some("Video 0"));

        store.delete_playlist(&playlist.id);
        assert_eq!(store.watch_next().len(), 1);
    }

    #[test]
    fn test_reorder_watch_next() {
        let (mut store, playlist, videos) = setup(3);
        for video in &videos {
            store.enqueue(video, &playlist.id, &playlist.name);
        }
        let order = vec![videos[2].id.clone(), videos[0].id.clone(), videos[1].id.clone()];
        store.reorder_watch_next(&order).expect("reorder");
        let ids: Vec<_> = store.watch_next().into_iter().map(|e| e.video_id).collect();
        assert_eq!(ids, order);

        let err = store.reorder_watch_next(&order[..2]).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::InvalidPermutation { .. })
        ));
    }

    #[test]
    fn test_clear_watch_next() {
        let (mut store, playlist, videos) = setup(2);
        for video in &videos {
            store.enqueue(video, &playlist.id, &playlist.name);
        }
        store.clear_watch_next();
        assert!(store.watch_next().is_empty());
    }

    #[test]
    fn test_clear_watch_next_writes_empty_queue() {
        let (mut source, playlist, videos) = setup(1);
        source.enqueue(&videos[0], &playlist.id, &playlist.name);
        let stored = serde_json::to_string(&source.load()).expect("Should serialize");

        let mut backing = MockKeyValueBacking::new();
        backing.expect_get().returning(move |_| Ok(Some(stored.clone())));
        backing
            .expect_set()
            .times(1)
            .withf(|_, content| {
                serde_json::from_str::<StoreDocument>(content)
                    .is_ok_and(|doc| doc.watch_next.is_empty() && doc.playlists.len() == 1)
            })
            .returning(|_, _| Ok(()));
        let mut store = DataStore::new(backing, "k");
        store.clear_watch_next();
    }

    #[test]
    fn test_clear_watch_next_survives_write_failure() {
        let mut backing = MockKeyValueBacking::new();
        backing.expect_get().returning(|_| Ok(None));
        backing
            .expect_set()
            .times(1)
            .returning(|_, _| Err(Error::Configuration("read-only".to_string())));
        let mut store = DataStore::new(backing, "k");
        store.clear_watch_next();
        assert!(store.watch_next().is_empty());
    }

    #[test]
    fn test_display_name_falls_back_to_url() {
        let (_, playlist, mut videos) = setup(1);
        videos[0].title = None;
        let entry = WatchNextEntry::snapshot(&videos[0], &playlist.id, &playlist.name);
        assert_eq!(entry.display_name(), videos[0].url);
    }
}
