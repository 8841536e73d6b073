//! Entity model: playlists, videos, and their identifiers.
//!
//! Field names serialize in camelCase so stored documents and export files
//! stay readable by earlier versions of the application.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sentinel topic for playlists with an empty or absent topic.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Playlist identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaylistId(String);

impl PlaylistId {
    /// Wrap an existing id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a new random playlist id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlaylistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Video identifier. Unique within its owning playlist.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    /// Wrap an existing id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a new random video id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A bookmarked video inside a playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    /// Video id.
    pub id: VideoId,
    /// Source URL.
    pub url: String,
    /// Human-readable title, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Free-form notes.
    #[serde(default)]
    pub notes: String,
    /// Whether the video has been watched.
    #[serde(default)]
    pub watched: bool,
    /// Thumbnail URL derived from `url` when the video was added.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    /// Position within the owning playlist.
    #[serde(default)]
    pub order: usize,
    /// When the video was added.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Video {
    /// True when the title is absent or blank.
    #[must_use]
    pub fn is_missing_title(&self) -> bool {
        self.title.as_deref().is_none_or(|t| t.trim().is_empty())
    }

    /// Case-insensitive match over title, url and notes.
    #[must_use]
    pub fn matches_query(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.title
            .as_deref()
            .is_some_and(|t| t.to_lowercase().contains(&query))
            || self.url.to_lowercase().contains(&query)
            || self.notes.to_lowercase().contains(&query)
    }

    /// Apply a partial update. The thumbnail is never re-derived.
    pub fn apply(&mut self, update: VideoUpdate) {
        if let Some(url) = update.url {
            self.url = url;
        }
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(notes) = update.notes {
            self.notes = notes;
        }
        if let Some(watched) = update.watched {
            self.watched = watched;
        }
    }
}

/// A named, topic-tagged, ordered collection of videos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    /// Playlist id, unique across the catalog.
    pub id: PlaylistId,
    /// Display name.
    pub name: String,
    /// Topic label; `None` or empty means [`UNCATEGORIZED`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// Videos in display order.
    #[serde(default)]
    pub videos: Vec<Video>,
    /// When the playlist was created.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Playlist {
    /// The group this playlist is listed under.
    #[must_use]
    pub fn topic_group(&self) -> &str {
        match self.topic.as_deref() {
            Some(topic) if !topic.is_empty() => topic,
            _ => UNCATEGORIZED,
        }
    }

    /// Whether this playlist belongs to `topic`.
    ///
    /// Exact equality, or an empty/absent topic when `topic` is the
    /// [`UNCATEGORIZED`] sentinel. A stored empty topic also matches `""`.
    #[must_use]
    pub fn matches_topic(&self, topic: &str) -> bool {
        match self.topic.as_deref() {
            Some(own) => own == topic || (own.is_empty() && topic == UNCATEGORIZED),
            None => topic == UNCATEGORIZED,
        }
    }

    /// Find a video by id.
    #[must_use]
    pub fn video(&self, id: &VideoId) -> Option<&Video> {
        self.videos.iter().find(|v| &v.id == id)
    }

    /// Find a video by id (mutable).
    pub fn video_mut(&mut self, id: &VideoId) -> Option<&mut Video> {
        self.videos.iter_mut().find(|v| &v.id == id)
    }

    /// Rewrite every `order` field to match its position.
    pub fn renumber(&mut self) {
        for (index, video) in self.videos.iter_mut().enumerate() {
            video.order = index;
        }
    }

    /// Watched/missing-title counters.
    #[must_use]
    pub fn stats(&self) -> PlaylistStats {
        let watched = self.videos.iter().filter(|v| v.watched).count();
        PlaylistStats {
            total: self.videos.len(),
            watched,
            unwatched: self.videos.len() - watched,
            missing_titles: self.videos.iter().filter(|v| v.is_missing_title()).count(),
        }
    }

    /// Apply a partial update.
    pub fn apply(&mut self, update: PlaylistUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(topic) = update.topic {
            self.topic = topic;
        }
    }
}

/// Counters shown next to a playlist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistStats {
    /// Number of videos.
    pub total: usize,
    /// Videos marked watched.
    pub watched: usize,
    /// Videos not yet watched.
    pub unwatched: usize,
    /// Videos without a usable title.
    pub missing_titles: usize,
}

/// Fields for a new video.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVideo {
    /// Source URL (required).
    pub url: String,
    /// Optional title.
    #[serde(default)]
    pub title: Option<String>,
}

impl NewVideo {
    /// A new video with only a URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
        }
    }

    /// Set the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Partial update for a playlist.
///
/// `None` leaves a field untouched. For `topic`, `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistUpdate {
    /// New name.
    #[serde(default)]
    pub name: Option<String>,
    /// New topic.
    #[serde(default)]
    pub topic: Option<Option<String>>,
}

impl PlaylistUpdate {
    /// Set the name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the topic.
    #[must_use]
    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(Some(topic.into()));
        self
    }

    /// Clear the topic.
    #[must_use]
    pub fn clear_topic(mut self) -> Self {
        self.topic = Some(None);
        self
    }
}

/// Partial update for a video.
///
/// `None` leaves a field untouched. For `title`, `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoUpdate {
    /// New URL. Does not refresh the thumbnail.
    #[serde(default)]
    pub url: Option<String>,
    /// New title.
    #[serde(default)]
    pub title: Option<Option<String>>,
    /// New notes.
    #[serde(default)]
    pub notes: Option<String>,
    /// New watched flag.
    #[serde(default)]
    pub watched: Option<bool>,
}

impl VideoUpdate {
    /// Set the URL.
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(Some(title.into()));
        self
    }

    /// Set the notes.
    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Set the watched flag.
    #[must_use]
    pub const fn watched(mut self, watched: bool) -> Self {
        self.watched = Some(watched);
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn video(id: &str, title: Option<&str>) -> Video {
        Video {
            id: VideoId::new(id),
            url: format!("https://youtu.be/{id}"),
            title: title.map(String::from),
            notes: String::new(),
            watched: false,
            thumbnail: None,
            order: 0,
            created_at: Utc::now(),
        }
    }

    fn playlist(topic: Option<&str>) -> Playlist {
        Playlist {
            id: PlaylistId::generate(),
            name: "Talks".to_string(),
            topic: topic.map(String::from),
            videos: Vec::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(PlaylistId::generate(), PlaylistId::generate());
        assert_ne!(VideoId::generate(), VideoId::generate());
    }

    #[test]
    fn test_missing_title() {
        assert!(video("a", None).is_missing_title());
        assert!(video("a", Some("   ")).is_missing_title());
        assert!(!video("a", Some("Intro")).is_missing_title());
    }

    #[test]
    fn test_topic_group_and_matching() {
        assert_eq!(playlist(None).topic_group(), UNCATEGORIZED);
        assert_eq!(playlist(Some("")).topic_group(), UNCATEGORIZED);
        assert_eq!(playlist(Some("Go")).topic_group(), "Go");

        assert!(playlist(None).matches_topic(UNCATEGORIZED));
        assert!(playlist(Some("")).matches_topic(UNCATEGORIZED));
        assert!(playlist(Some("Go")).matches_topic("Go"));
        assert!(!playlist(Some("Go")).matches_topic(UNCATEGORIZED));
        assert!(!playlist(None).matches_topic("Go"));
    }

    #[test]
    fn test_stored_empty_topic_matches_empty_string() {
        assert!(playlist(Some("")).matches_topic(""));
        assert!(playlist(Some("")).matches_topic(UNCATEGORIZED));
        assert!(!playlist(None).matches_topic(""));
        assert!(!playlist(Some("Go")).matches_topic(""));
    }

    #[test]
    fn test_video_apply_keeps_thumbnail() {
        let mut v = video("a", None);
        v.thumbnail = Some("thumb".to_string());
        v.apply(VideoUpdate::default().url("https://example.com").watched(true));
        assert_eq!(v.url, "https://example.com");
        assert!(v.watched);
        assert_eq!(v.thumbnail.as_deref(), Some("thumb"));
    }

    #[test]
    fn test_playlist_apply_clear_topic() {
        let mut p = playlist(Some("Go"));
        p.apply(PlaylistUpdate::default().clear_topic());
        assert_eq!(p.topic, None);
        assert_eq!(p.name, "Talks");
    }

    #[test]
    fn test_stats() {
        let mut p = playlist(None);
        p.videos = vec![video("a", Some("A")), video("b", None)];
        p.videos[0].watched = true;
        let stats = p.stats();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.watched, 1);
        assert_eq!(stats.unwatched, 1);
        assert_eq!(stats.missing_titles, 1);
    }

    #[test]
    fn test_deserialize_minimal_document() {
        let json = r#"{
            "id": "p1",
            "name": "Rust",
            "topic": "Programming",
            "createdAt": "2024-01-15T10:00:00.000Z",
            "videos": [{
                "id": "v1",
                "url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
                "title": "",
                "notes": "",
                "watched": false,
                "order": 0,
                "createdAt": "2024-01-15T10:01:00.000Z",
                "thumbnail": null
            }]
        }"#;
        let p: Playlist = serde_json::from_str(json).expect("Should deserialize");
        assert_eq!(p.id.as_str(), "p1");
        assert_eq!(p.videos.len(), 1);
        assert!(p.videos[0].is_missing_title());
        assert_eq!(p.videos[0].thumbnail, None);
    }
}
