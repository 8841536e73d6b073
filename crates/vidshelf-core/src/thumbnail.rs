//! Thumbnail derivation for video URLs.
//!
//! Thumbnails are computed once, when a video is added, by pulling the
//! 11-character `YouTube` video id out of the URL. URLs that do not match a
//! known shape simply get no thumbnail.

use std::sync::LazyLock;

use regex::Regex;

/// Known `YouTube` URL shapes: `watch?v=`, `youtu.be/`, `embed/`, `v/`, `e/`,
/// and nested paths such as `/user/<name>/<id>`.
static VIDEO_ID_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r#"(?:youtube\.com/(?:[^/]+/.+/|(?:v|e(?:mbed)?)/|.*[?&]v=)|youtu\.be/)([^"&?/\s]{11})"#,
    )
    .ok()
});

/// Extract the 11-character `YouTube` video id from a URL.
#[must_use]
pub fn extract_video_id(url: &str) -> Option<String> {
    let pattern = VIDEO_ID_PATTERN.as_ref()?;
    pattern
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Generate a `YouTube` thumbnail URL for a video id.
///
/// Returns the medium-quality thumbnail (mqdefault), which is always present.
#[must_use]
pub fn youtube_thumbnail_url(video_id: &str) -> String {
    // https://img.youtube.com/vi/{VIDEO_ID}/{QUALITY}.jpg
    // Quality options: default, mqdefault, hqdefault, sddefault, maxresdefault
    format!("https://img.youtube.com/vi/{video_id}/mqdefault.jpg")
}

/// Derive the thumbnail for a video URL, if it is a recognised `YouTube` URL.
#[must_use]
pub fn thumbnail_for_url(url: &str) -> Option<String> {
    extract_video_id(url).map(|id| youtube_thumbnail_url(&id))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_watch_url() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_extract_watch_url_with_extra_params() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ&t=42"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_extract_short_url() {
        assert_eq!(
            extract_video_id("https://youtu.be/dQw4w9WgXcQ?si=abc"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_extract_embed_and_v_urls() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/embed/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/v/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_extract_no_match() {
        assert_eq!(extract_video_id("https://vimeo.com/123456789"), None);
        assert_eq!(extract_video_id("https://youtu.be/short"), None);
        assert_eq!(extract_video_id(""), None);
    }

    #[test]
    fn test_youtube_thumbnail_url() {
        assert_eq!(
            youtube_thumbnail_url("dQw4w9WgXcQ"),
            "https://img.youtube.com/vi/dQw4w9WgXcQ/mqdefault.jpg"
        );
    }

    #[test]
    fn test_thumbnail_for_url() {
        assert_eq!(
            thumbnail_for_url("https://youtu.be/dQw4w9WgXcQ"),
            Some("https://img.youtube.com/vi/dQw4w9WgXcQ/mqdefault.jpg".to_string())
        );
        assert_eq!(thumbnail_for_url("https://example.com/video"), None);
    }
}
