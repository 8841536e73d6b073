//! Bulk resolution of missing video titles.
//!
//! Videos added without a title can have one looked up afterwards. Lookups
//! go through a [`TitleResolver`]; the bundled [`NoembedTitleResolver`] asks
//! the noembed.com oEmbed proxy. Requests are made one at a time with a fixed
//! pause in between to stay clear of rate limits.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::backing::KeyValueBacking;
use crate::config::{DEFAULT_TITLE_FETCH_DELAY_MS, StoreConfig};
use crate::error::{Error, Result};
use crate::model::{PlaylistId, VideoUpdate};
use crate::store::DataStore;

/// Looks up the display title of a video URL.
pub trait TitleResolver {
    /// Resolve `url` to a title. Any failure yields `None`.
    fn resolve_title(&self, url: &str) -> impl Future<Output = Option<String>> + Send;
}

/// Response body of the noembed endpoint. Unsupported URLs come back with
/// `error` set and no `title`.
#[derive(Debug, Deserialize)]
struct NoembedResponse {
    title: Option<String>,
    error: Option<String>,
}

/// Title resolver backed by noembed.com.
#[derive(Debug, Clone)]
pub struct NoembedTitleResolver {
    client: reqwest::Client,
    endpoint: String,
}

impl NoembedTitleResolver {
    /// Build a resolver using the endpoint and timeout from `config`.
    ///
    /// # Errors
    ///
    /// Returns a network error if the HTTP client cannot be built.
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.title_fetch_timeout())
            .build()
            .map_err(|e| Error::network_error(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: config.noembed_endpoint.clone(),
        })
    }

    /// The endpoint queried for titles.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn fetch(&self, url: &str) -> Result<Option<String>> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("url", url)])
            .send()
            .await
            .map_err(|e| Error::network_error(format!("Title request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::network_error(format!(
                "Title request returned HTTP {}",
                response.status()
            )));
        }

        let body: NoembedResponse = response
            .json()
            .await
            .map_err(|e| Error::network_error(format!("Invalid title response: {e}")))?;

        if let Some(error) = body.error {
            debug!("noembed has no title for {}: {}", url, error);
        }
        Ok(body.title)
    }
}

impl TitleResolver for NoembedTitleResolver {
    async fn resolve_title(&self, url: &str) -> Option<String> {
        match self.fetch(url).await {
            Ok(title) => title
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
            Err(e) => {
                debug!("Could not resolve title for {}: {}", url, e);
                None
            }
        }
    }
}

/// Pacing and cancellation for a bulk title fetch.
#[derive(Debug, Clone)]
pub struct TitleFetchOptions {
    /// Pause between consecutive lookups.
    pub delay: Duration,
    cancelled: Arc<AtomicBool>,
}

impl Default for TitleFetchOptions {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(DEFAULT_TITLE_FETCH_DELAY_MS),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl TitleFetchOptions {
    /// Options with the configured delay.
    #[must_use]
    pub fn from_config(config: &StoreConfig) -> Self {
        Self {
            delay: config.title_fetch_delay(),
            ..Self::default()
        }
    }

    /// Use a shared cancellation flag.
    #[must_use]
    pub fn with_cancellation(mut self, cancelled: Arc<AtomicBool>) -> Self {
        self.cancelled = cancelled;
        self
    }

    /// Set the pause between lookups.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Request cancellation of the fetch.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Get a cancellation token that can be shared across tasks.
    #[must_use]
    pub fn cancellation_token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }
}

/// Outcome of a bulk title fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleFetchSummary {
    /// Videos that were missing a title when the fetch started.
    pub total: usize,
    /// Titles found and stored.
    pub resolved: usize,
    /// Whether the fetch stopped early.
    pub cancelled: bool,
}

impl<B: KeyValueBacking> DataStore<B> {
    /// Look up titles for every untitled video in a playlist.
    ///
    /// Lookups run sequentially in playlist order with `options.delay`
    /// between them. `on_progress(completed, total)` fires after every
    /// attempt, successful or not. Failed lookups are skipped.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown playlist.
    pub async fn fetch_missing_titles<R: TitleResolver + Sync>(
        &mut self,
        playlist_id: &PlaylistId,
        resolver: &R,
        options: &TitleFetchOptions,
        mut on_progress: impl FnMut(usize, usize) + Send,
    ) -> Result<TitleFetchSummary> {
        let missing = self.videos_missing_titles(playlist_id)?;
        let mut summary = TitleFetchSummary {
            total: missing.len(),
            ..TitleFetchSummary::default()
        };
        info!(
            "Fetching titles for {} video(s) in playlist {}",
            summary.total, playlist_id
        );

        for (index, video) in missing.iter().enumerate() {
            if options.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            if let Some(title) = resolver.resolve_title(&video.url).await {
                match self.update_video(playlist_id, &video.id, VideoUpdate::default().title(title)) {
                    Ok(_) => summary.resolved += 1,
                    Err(e) => debug!("Resolved title for {} not stored: {}", video.id, e),
                }
            }

            let completed = index + 1;
            on_progress(completed, summary.total);

            if completed < summary.total {
                if options.is_cancelled() {
                    summary.cancelled = true;
                    break;
                }
                tokio::time::sleep(options.delay).await;
            }
        }

        info!(
            "Resolved {}/{} title(s) in playlist {}{}",
            summary.resolved,
            summary.total,
            playlist_id,
            if summary.cancelled { " (cancelled)" } else { "" }
        );
        Ok(summary)
    }
}
