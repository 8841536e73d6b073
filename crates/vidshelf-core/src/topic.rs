//! Topic management.
//!
//! Topics are not stored on their own; they are the distinct values of
//! `Playlist::topic`, with empty or absent topics grouped under
//! [`UNCATEGORIZED`]. Renaming or deleting a topic rewrites every playlist
//! that matches it.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::backing::KeyValueBacking;
use crate::error::{Error, Result};
use crate::model::{Playlist, UNCATEGORIZED};
use crate::store::DataStore;

/// Outcome of deleting a topic together with its playlists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicDeletion {
    /// Number of playlists removed.
    pub deleted: usize,
    /// The catalog after the delete.
    pub playlists: Vec<Playlist>,
}

/// Whether a topic can be removed without losing playlists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicDeletionCheck {
    /// True when no playlist belongs to the topic.
    pub deletable: bool,
    /// Number of playlists that would be deleted with it.
    pub playlist_count: usize,
}

/// Playlists listed under one topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicGroup {
    /// Topic name ([`UNCATEGORIZED`] for empty or absent topics).
    pub topic: String,
    /// Playlists in catalog order.
    pub playlists: Vec<Playlist>,
}

impl<B: KeyValueBacking> DataStore<B> {
    /// Distinct topic groups in order of first appearance.
    #[must_use]
    pub fn topics(&self) -> Vec<String> {
        self.playlists_by_topic()
            .into_iter()
            .map(|group| group.topic)
            .collect()
    }

    /// The catalog grouped by topic, groups in order of first appearance.
    #[must_use]
    pub fn playlists_by_topic(&self) -> Vec<TopicGroup> {
        let mut groups: Vec<TopicGroup> = Vec::new();
        for playlist in self.playlists() {
            let topic = playlist.topic_group();
            if let Some(group) = groups.iter_mut().find(|g| g.topic == topic) {
                group.playlists.push(playlist);
            } else {
                groups.push(TopicGroup {
                    topic: topic.to_string(),
                    playlists: vec![playlist],
                });
            }
        }
        groups
    }

    /// Rename `old` to `new` on every matching playlist.
    ///
    /// Renaming [`UNCATEGORIZED`] also relabels playlists with an empty or
    /// absent topic. Returns the whole catalog after the rewrite.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `new` is empty after trimming.
    pub fn rename_topic(&mut self, old: &str, new: &str) -> Result<Vec<Playlist>> {
        let new = new.trim();
        if new.is_empty() {
            return Err(Error::empty_field("topic"));
        }

        let (renamed, playlists) = self.modify(|doc| {
            let mut renamed = 0;
            for playlist in doc.playlists.iter_mut().filter(|p| p.matches_topic(old)) {
                playlist.topic = Some(new.to_string());
                renamed += 1;
            }
            Ok((renamed, doc.playlists.clone()))
        })?;

        info!("Renamed topic '{}' to '{}' on {} playlist(s)", old, new, renamed);
        Ok(playlists)
    }

    /// How many playlists would go with `topic`.
    #[must_use]
    pub fn check_topic_deletable(&self, topic: &str) -> TopicDeletionCheck {
        let playlist_count = self
            .playlists()
            .iter()
            .filter(|p| p.matches_topic(topic))
            .count();
        TopicDeletionCheck {
            deletable: playlist_count == 0,
            playlist_count,
        }
    }

    /// Delete `topic` and every playlist under it.
    ///
    /// Queue entries that referenced those playlists are left in place.
    pub fn delete_topic_and_playlists(&mut self, topic: &str) -> TopicDeletion {
        let outcome = self
            .modify(|doc| {
                let before = doc.playlists.len();
                doc.playlists.retain(|p| !p.matches_topic(topic));
                Ok(TopicDeletion {
                    deleted: before - doc.playlists.len(),
                    playlists: doc.playlists.clone(),
                })
            })
            .unwrap_or_else(|_| TopicDeletion {
                deleted: 0,
                playlists: Vec::new(),
            });

        info!(
            "Deleted topic '{}' with {} playlist(s)",
            topic, outcome.deleted
        );
        outcome
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::backing::MemoryBacking;
    use crate::error::ErrorKind;
    use crate::model::{PlaylistId, PlaylistUpdate};
    use crate::transfer::ImportMode;

    fn catalog() -> (DataStore<MemoryBacking>, Vec<PlaylistId>) {
        let mut store = DataStore::in_memory();
        let go = store.create_playlist("Concurrency", "Go").expect("create");
        let rust = store.create_playlist("Ownership", "Rust").expect("create");
        let go2 = store.create_playlist("Generics", "Go").expect("create");
        let loose = store.create_playlist("Misc", "Temp").expect("create");
        store
            .update_playlist(&loose.id, PlaylistUpdate::default().clear_topic())
            .expect("clear");
        (store, vec![go.id, rust.id, go2.id, loose.id])
    }

    #[test]
    fn test_topics_in_first_appearance_order() {
        let (store, _) = catalog();
        assert_eq!(store.topics(), vec!["Go", "Rust", UNCATEGORIZED]);

        let groups = store.playlists_by_topic();
        assert_eq!(groups[0].playlists.len(), 2);
        assert_eq!(groups[2].playlists[0].name, "Misc");
    }

    #[test]
    fn test_rename_topic_returns_full_catalog() {
        let (mut store, ids) = catalog();
        let playlists = store.rename_topic("Go", "Golang").expect("rename");
        assert_eq!(playlists.len(), 4);
        assert_eq!(playlists[0].topic.as_deref(), Some("Golang"));
        assert_eq!(playlists[1].topic.as_deref(), Some("Rust"));
        assert_eq!(
            store.playlist(&ids[2]).expect("exists").topic.as_deref(),
            Some("Golang")
        );
    }

    #[test]
    fn test_rename_uncategorized_updates_empty_and_absent() {
        let (mut store, ids) = catalog();
        store
            .update_playlist(&ids[1], PlaylistUpdate::default().clear_topic())
            .expect("clear");
        store.rename_topic(UNCATEGORIZED, "Sorted").expect("rename");

        assert_eq!(store.playlist(&ids[1]).expect("exists").topic.as_deref(), Some("Sorted"));
        assert_eq!(store.playlist(&ids[3]).expect("exists").topic.as_deref(), Some("Sorted"));
        assert_eq!(store.playlist(&ids[0]).expect("exists").topic.as_deref(), Some("Go"));
    }

    #[test]
    fn test_rename_topic_rejects_blank() {
        let (mut store, _) = catalog();
        let err = store.rename_topic("Go", "   ").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_check_topic_deletable() {
        let (store, _) = catalog();
        let check = store.check_topic_deletable("Go");
        assert!(!check.deletable);
        assert_eq!(check.playlist_count, 2);
        assert!(store.check_topic_deletable("Nothing here").deletable);
    }

    #[test]
    fn test_delete_topic_and_playlists() {
        let (mut store, ids) = catalog();
        let outcome = store.delete_topic_and_playlists("Go");
        assert_eq!(outcome.deleted, 2);
        assert_eq!(outcome.playlists.len(), 2);
        assert!(store.playlist(&ids[0]).is_none());
        assert!(store.playlist(&ids[1]).is_some());
    }

    /// A store holding one playlist whose topic is stored as `""`.
    fn with_empty_topic() -> (DataStore<MemoryBacking>, PlaylistId) {
        let mut store = DataStore::in_memory();
        let json = r#"{"playlists":[
            {"id": "blank", "name": "Blank topic", "topic": ""},
            {"id": "go", "name": "Concurrency", "topic": "Go"}
        ]}"#;
        assert!(store.import_json(json, ImportMode::Replace).success);
        (store, PlaylistId::new("blank"))
    }

    #[test]
    fn test_rename_stored_empty_topic() {
        let (mut store, id) = with_empty_topic();
        store.rename_topic("", "New").expect("rename");
        assert_eq!(
            store.playlist(&id).expect("exists").topic.as_deref(),
            Some("New")
        );
        assert_eq!(store.topics(), vec!["New", "Go"]);
    }

    #[test]
    fn test_delete_stored_empty_topic() {
        let (mut store, id) = with_empty_topic();
        assert_eq!(store.check_topic_deletable("").playlist_count, 1);
        let outcome = store.delete_topic_and_playlists("");
        assert_eq!(outcome.deleted, 1);
        assert!(store.playlist(&id).is_none());
        assert_eq!(store.playlists().len(), 1);
    }

    #[test]
    fn test_delete_uncategorized_topic() {
        let (mut store, ids) = catalog();
        let outcome = store.delete_topic_and_playlists(UNCATEGORIZED);
        assert_eq!(outcome.deleted, 1);
        assert!(store.playlist(&ids[3]).is_none());
    }
}
