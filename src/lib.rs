//! tubefetch - Core Library
//!
//! Downloads the video or audio track of a media URL, or the audio of every
//! item in a playlist, through yt-dlp, reporting progress to a presentation
//! layer over a channel.

pub mod core;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use core::{
    config::AppConfig,
    error_handling::{DownloadError, ResolutionReason},
    models::{
        AppError, AppResult, BatchSummary, DownloadMode, DownloadOutcome, DownloadRequest,
        Locator, ProgressState, Resolution, SelectionPolicy,
    },
    orchestrator::BatchOrchestrator,
    resolver::MediaResolver,
    runtime::{spawn_download_runtime, DownloadRuntimeHandle},
    youtube_downloader::{YoutubeDownloaderConfig, YtDlpResolver},
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
