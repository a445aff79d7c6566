//! Scripted media resolver shared by the integration tests

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::core::error_handling::DownloadError;
use crate::core::models::{
    Locator, LocatorKind, MediaItem, PlaylistEntry, PlaylistInfo, ProgressState, StreamVariant,
    VariantKind,
};
use crate::core::resolver::{MediaResolver, ProgressCallback};
use crate::ui::events::{EventReceiver, Notification, PresentationEvent};

pub const CHUNKS: u64 = 4;

pub fn watch_url(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", id)
}

pub fn locator(id: &str) -> Locator {
    Locator::parse(&watch_url(id)).unwrap()
}

pub fn playlist_locator(id: &str) -> Locator {
    Locator::parse(&format!("https://www.youtube.com/playlist?list={}", id)).unwrap()
}

pub fn audio_variant() -> StreamVariant {
    StreamVariant {
        format_id: "140".to_string(),
        kind: VariantKind::Audio,
        ext: "m4a".to_string(),
        filesize: Some(4_000),
        bitrate: Some(128.0),
        has_audio: true,
    }
}

pub fn video_variant(height: u32) -> StreamVariant {
    StreamVariant {
        format_id: format!("v{}", height),
        kind: VariantKind::Video { height },
        ext: "mp4".to_string(),
        filesize: Some(height as u64 * 100),
        bitrate: Some(height as f64),
        has_audio: true,
    }
}

pub fn media_item(id: &str, title: &str, variants: Vec<StreamVariant>) -> MediaItem {
    MediaItem {
        id: id.to_string(),
        title: title.to_string(),
        webpage_url: watch_url(id),
        duration: Some(180),
        variants,
    }
}

#[derive(Default)]
pub struct ScriptedResolver {
    items: HashMap<String, Result<MediaItem, DownloadError>>,
    playlists: HashMap<String, Result<PlaylistInfo, DownloadError>>,
    failing_saves: HashSet<String>,
    save_delay: Option<Duration>,
    pub save_started: Arc<Notify>,
    pub resolve_calls: AtomicUsize,
    pub playlist_calls: AtomicUsize,
    pub saved: Mutex<Vec<(String, String)>>,
}

impl ScriptedResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_item(mut self, item: MediaItem) -> Self {
        self.items.insert(watch_url(&item.id), Ok(item));
        self
    }

    pub fn with_failing_item(mut self, id: &str, err: DownloadError) -> Self {
        self.items.insert(watch_url(id), Err(err));
        self
    }

    /// Resolution succeeds but the transfer fails
    pub fn with_failing_save(mut self, id: &str) -> Self {
        self.failing_saves.insert(id.to_string());
        self
    }

    pub fn with_playlist(mut self, id: &str, title: &str, item_ids: &[&str]) -> Self {
        let entries = item_ids
            .iter()
            .map(|item_id| PlaylistEntry {
                id: item_id.to_string(),
                title: Some(format!("Entry {}", item_id)),
                locator: Locator::with_kind(locator(item_id).url().clone(), LocatorKind::Single),
            })
            .collect();
        self.playlists.insert(
            playlist_locator(id).as_str().to_string(),
            Ok(PlaylistInfo {
                id: id.to_string(),
                title: title.to_string(),
                entries,
            }),
        );
        self
    }

    pub fn with_failing_playlist(mut self, id: &str, err: DownloadError) -> Self {
        self.playlists
            .insert(playlist_locator(id).as_str().to_string(), Err(err));
        self
    }

    pub fn with_save_delay(mut self, delay: Duration) -> Self {
        self.save_delay = Some(delay);
        self
    }

    pub fn total_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst) + self.playlist_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaResolver for ScriptedResolver {
    async fn resolve(&self, locator: &Locator) -> Result<MediaItem, DownloadError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        self.items.get(locator.as_str()).cloned().unwrap_or_else(|| {
            Err(DownloadError::unexpected(format!("no script for {}", locator)))
        })
    }

    async fn resolve_playlist(&self, locator: &Locator) -> Result<PlaylistInfo, DownloadError> {
        self.playlist_calls.fetch_add(1, Ordering::SeqCst);
        self.playlists.get(locator.as_str()).cloned().unwrap_or_else(|| {
            Err(DownloadError::unexpected(format!("no script for {}", locator)))
        })
    }

    async fn save(
        &self,
        item: &MediaItem,
        variant: &StreamVariant,
        destination: &Path,
        on_progress: ProgressCallback,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, DownloadError> {
        self.save_started.notify_one();

        if let Some(delay) = self.save_delay {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => return Err(DownloadError::Cancelled),
            }
        }

        if self.failing_saves.contains(&item.id) {
            return Err(DownloadError::unexpected("connection reset"));
        }

        let total = variant.filesize.unwrap_or(1_000);
        for chunk in 1..=CHUNKS {
            on_progress(total * chunk / CHUNKS, Some(total));
        }

        let path = destination.join(format!("{}.{}", item.title, variant.ext));
        tokio::fs::write(&path, b"media").await?;
        self.saved
            .lock()
            .push((item.id.clone(), variant.format_id.clone()));
        Ok(path)
    }
}

/// Everything queued on the receiver, split by kind
#[derive(Debug, Default)]
pub struct CollectedEvents {
    pub progress: Vec<ProgressState>,
    pub notifications: Vec<Notification>,
    pub completed: usize,
}

pub fn collect_events(rx: &mut EventReceiver) -> CollectedEvents {
    let mut collected = CollectedEvents::default();
    while let Ok(event) = rx.try_recv() {
        match event {
            PresentationEvent::Progress(state) => collected.progress.push(state),
            PresentationEvent::Notification(n) => collected.notifications.push(n),
            PresentationEvent::Completed(_) => collected.completed += 1,
        }
    }
    collected
}
