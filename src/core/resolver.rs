//! Media resolver seam
//!
//! The orchestrator only talks to the media library through this trait. The
//! production implementation drives yt-dlp
//! ([`crate::core::youtube_downloader::YtDlpResolver`]); tests script it.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::core::error_handling::DownloadError;
use crate::core::models::{Locator, MediaItem, PlaylistInfo, StreamVariant};

/// Invoked at chunk granularity with `(downloaded_bytes, total_bytes)`
pub type ProgressCallback = Arc<dyn Fn(u64, Option<u64>) + Send + Sync>;

#[async_trait]
pub trait MediaResolver: Send + Sync {
    /// Fetch title and available stream variants of one media item
    async fn resolve(&self, locator: &Locator) -> Result<MediaItem, DownloadError>;

    /// Fetch a playlist's title and its item locators in order
    async fn resolve_playlist(&self, locator: &Locator) -> Result<PlaylistInfo, DownloadError>;

    /// Transfer `variant` of `item` into the `destination` directory and
    /// return the written file. Must stop promptly once `cancel` fires.
    async fn save(
        &self,
        item: &MediaItem,
        variant: &StreamVariant,
        destination: &Path,
        on_progress: ProgressCallback,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, DownloadError>;
}

#[async_trait]
impl<R: MediaResolver + ?Sized> MediaResolver for Arc<R> {
    async fn resolve(&self, locator: &Locator) -> Result<MediaItem, DownloadError> {
        (**self).resolve(locator).await
    }

    async fn resolve_playlist(&self, locator: &Locator) -> Result<PlaylistInfo, DownloadError> {
        (**self).resolve_playlist(locator).await
    }

    async fn save(
        &self,
        item: &MediaItem,
        variant: &StreamVariant,
        destination: &Path,
        on_progress: ProgressCallback,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, DownloadError> {
        (**self)
            .save(item, variant, destination, on_progress, cancel)
            .await
    }
}
