//! Core data models for the downloader

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use url::Url;

use crate::core::error_handling::DownloadError;
use crate::utils::validation::{is_playlist_url, validate_url};

/// Whether a locator names one media item or a playlist

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LocatorKind {
    Single,

    Playlist,
}

/// A URL naming a single media item or a playlist, classified before resolution

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    url: Url,

    kind: LocatorKind,
}

impl Locator {
    /// Parse and classify a raw URL
    pub fn parse(raw: &str) -> AppResult<Self> {
        let url = validate_url(raw.trim()).map_err(|e| AppError::InvalidLocator(e.to_string()))?;
        let kind = if is_playlist_url(&url) {
            LocatorKind::Playlist
        } else {
            LocatorKind::Single
        };
        Ok(Self { url, kind })
    }

    /// Build a locator with an explicit kind, e.g. for playlist entries
    pub fn with_kind(url: Url, kind: LocatorKind) -> Self {
        Self { url, kind }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    pub fn kind(&self) -> LocatorKind {
        self.kind
    }

    pub fn is_playlist(&self) -> bool {
        self.kind == LocatorKind::Playlist
    }

    /// A bare `/playlist?list=` page, with no single item to fall back to
    pub fn is_playlist_page(&self) -> bool {
        self.is_playlist() && self.url.path().trim_end_matches('/').ends_with("/playlist")
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

/// Vertical pixel resolution such as `1080p`

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Resolution(u32);

impl Resolution {
    pub const P720: Resolution = Resolution(720);
    pub const P1080: Resolution = Resolution(1080);

    pub fn new(height: u32) -> Self {
        Self(height)
    }

    pub fn height(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}p", self.0)
    }
}

impl FromStr for Resolution {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_suffix('p')
            .or_else(|| trimmed.strip_suffix('P'))
            .unwrap_or(trimmed);
        match digits.parse::<u32>() {
            Ok(height) if height > 0 => Ok(Self(height)),
            _ => Err(AppError::Parse(format!("Invalid resolution: {}", s))),
        }
    }
}

impl TryFrom<String> for Resolution {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Resolution> for String {
    fn from(value: Resolution) -> Self {
        value.to_string()
    }
}

/// What to fetch for each item. Fixed for the whole run.

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SelectionPolicy {
    AudioOnly,

    VideoByResolution(Resolution),
}

impl fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AudioOnly => f.write_str("audio only"),
            Self::VideoByResolution(res) => write!(f, "video {}", res),
        }
    }
}

/// Single item vs. entire playlist

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DownloadMode {
    Single,

    Playlist,
}

/// One user-initiated download request

#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub locator: Locator,

    pub policy: SelectionPolicy,

    pub mode: DownloadMode,

    pub destination: PathBuf,
}

/// Encoding tag of a stream variant

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum VariantKind {
    Audio,

    Video { height: u32 },
}

/// One downloadable encoding of a media item, as reported by the resolver

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamVariant {
    pub format_id: String,

    pub kind: VariantKind,

    pub ext: String,

    /// Size in bytes, used for progress when the transfer reports no total
    pub filesize: Option<u64>,

    /// Total bitrate in kbps
    pub bitrate: Option<f64>,

    /// Video variants may or may not carry an audio track
    pub has_audio: bool,
}

impl StreamVariant {
    pub fn height(&self) -> Option<u32> {
        match self.kind {
            VariantKind::Video { height } => Some(height),
            VariantKind::Audio => None,
        }
    }

    pub fn is_audio_only(&self) -> bool {
        self.kind == VariantKind::Audio
    }
}

/// Resolved single media item

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: String,

    pub title: String,

    pub webpage_url: String,

    pub duration: Option<u64>,

    pub variants: Vec<StreamVariant>,
}

/// Resolved playlist with its entries in resolver order

#[derive(Debug, Clone)]
pub struct PlaylistInfo {
    pub id: String,

    pub title: String,

    pub entries: Vec<PlaylistEntry>,
}

#[derive(Debug, Clone)]
pub struct PlaylistEntry {
    pub id: String,

    pub title: Option<String>,

    pub locator: Locator,
}

/// Status line plus fractional progress shown by the presentation layer

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressState {
    pub status_text: String,

    pub fraction: f64,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self {
            status_text: String::new(),
            fraction: 0.0,
        }
    }
}

/// Per-item result

#[derive(Debug, Clone)]
pub enum DownloadOutcome {
    Success { title: String, path: PathBuf },

    Failure(DownloadError),
}

impl DownloadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn error(&self) -> Option<&DownloadError> {
        match self {
            Self::Failure(err) => Some(err),
            Self::Success { .. } => None,
        }
    }
}

/// Aggregate of one orchestration run

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchSummary {
    pub run_id: uuid::Uuid,

    pub title: Option<String>,

    pub total: usize,

    pub succeeded: usize,

    pub failed: usize,

    /// Items skipped because the run was cancelled, counted within `failed`
    pub cancelled: usize,

    pub started_at: chrono::DateTime<chrono::Utc>,

    pub finished_at: chrono::DateTime<chrono::Utc>,
}

impl BatchSummary {
    pub fn from_outcomes(
        run_id: uuid::Uuid,
        title: Option<String>,
        outcomes: &[DownloadOutcome],
        started_at: chrono::DateTime<chrono::Utc>,
    ) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        let cancelled = outcomes
            .iter()
            .filter(|o| matches!(o.error(), Some(DownloadError::Cancelled)))
            .count();

        Self {
            run_id,
            title,
            total: outcomes.len(),
            succeeded,
            failed: outcomes.len() - succeeded,
            cancelled,
            started_at,
            finished_at: chrono::Utc::now(),
        }
    }
}

/// Application error types

#[derive(Debug, thiserror::Error)]

pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid URL: {0}")]
    InvalidLocator(String),

    #[error("Parsing error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("System error: {0}")]
    System(String),
}

/// Result type alias for application operations

pub type AppResult<T> = Result<T, AppError>;
