//! Download form state
//!
//! Models the input surface of the downloader window: a URL field, an Audio
//! tab (single item or playlist) and a Video tab (1080p or 720p), and a
//! submit step that receives the result of the directory picker.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::core::models::{DownloadMode, DownloadRequest, Locator, Resolution, SelectionPolicy};
use crate::ui::events::{EventEmitter, Notification};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tab {
    Audio,
    Video,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioMode {
    Single,
    Playlist,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadForm {
    pub url: String,
    tab: Tab,
    audio_mode: AudioMode,
    video_resolution: Resolution,
}

impl Default for DownloadForm {
    fn default() -> Self {
        Self {
            url: String::new(),
            tab: Tab::Audio,
            audio_mode: AudioMode::Single,
            video_resolution: Resolution::P1080,
        }
    }
}

impl DownloadForm {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn tab(&self) -> Tab {
        self.tab
    }

    /// Switching tabs keeps the choice made on the other tab
    pub fn select_tab(&mut self, tab: Tab) {
        self.tab = tab;
    }

    pub fn set_audio_mode(&mut self, mode: AudioMode) {
        self.audio_mode = mode;
    }

    pub fn set_video_resolution(&mut self, resolution: Resolution) {
        self.video_resolution = resolution;
    }

    /// Build a request from the form and the picked directory.
    ///
    /// An empty URL is rejected before the directory is even looked at; a
    /// cancelled picker (`None`) is rejected next.
    pub fn request(&self, destination: Option<PathBuf>) -> Result<DownloadRequest, Notification> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(Notification::warning("⚠️ Please enter a URL!"));
        }

        let destination =
            destination.ok_or_else(|| Notification::warning("⚠️ No folder selected!"))?;

        let locator = Locator::parse(url).map_err(|e| Notification::warning(e.to_string()))?;

        let (policy, mode) = match self.tab {
            Tab::Audio => {
                let mode = match self.audio_mode {
                    AudioMode::Single => DownloadMode::Single,
                    AudioMode::Playlist => DownloadMode::Playlist,
                };
                (SelectionPolicy::AudioOnly, mode)
            }
            Tab::Video => (
                SelectionPolicy::VideoByResolution(self.video_resolution),
                DownloadMode::Single,
            ),
        };

        if mode == DownloadMode::Playlist && !locator.is_playlist() {
            return Err(Notification::warning(format!(
                "⚠️ {} is not a playlist URL",
                locator
            )));
        }
        if self.tab == Tab::Video && locator.is_playlist_page() {
            return Err(Notification::warning(
                "⚠️ Playlists can only be downloaded from the Audio tab",
            ));
        }

        Ok(DownloadRequest {
            locator,
            policy,
            mode,
            destination,
        })
    }

    /// Like [`Self::request`], but reports a rejection as a notification
    pub fn submit(&self, destination: Option<PathBuf>, events: &EventEmitter) -> Option<DownloadRequest> {
        match self.request(destination) {
            Ok(request) => Some(request),
            Err(notification) => {
                tracing::debug!("Form rejected: {}", notification.message);
                events.notify(notification);
                None
            }
        }
    }
}
