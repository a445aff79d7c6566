//! yt-dlp backed media resolver
//!
//! Resolves items and playlists with `--dump-json` / `--dump-single-json`
//! and saves variants by running yt-dlp with a machine-readable progress
//! template, forwarding every progress line to the caller's callback.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::error_handling::{classify_ytdlp_stderr, DownloadError, ResolutionReason};
use crate::core::models::{
    AppError, AppResult, Locator, LocatorKind, MediaItem, PlaylistEntry, PlaylistInfo,
    StreamVariant, VariantKind,
};
use crate::core::resolver::{MediaResolver, ProgressCallback};
use crate::core::selection::companion_audio;
use crate::utils::validation::{extract_playlist_id, validate_url};

const PROGRESS_PREFIX: &str = "TF_PROGRESS|";
const OUTPUT_PREFIX: &str = "TF_OUTPUT|";

/// yt-dlp invocation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YoutubeDownloaderConfig {
    /// yt-dlp executable, looked up on PATH when not absolute
    pub binary_path: PathBuf,
    /// Passed to `--socket-timeout`
    pub socket_timeout_seconds: u64,
    /// Stop reading playlists after this many entries
    pub playlist_max_items: Option<usize>,
    /// Extra arguments appended to every download invocation
    pub extra_args: Vec<String>,
}

impl Default for YoutubeDownloaderConfig {
    fn default() -> Self {
        Self {
            binary_path: PathBuf::from("yt-dlp"),
            socket_timeout_seconds: 30,
            playlist_max_items: None,
            extra_args: Vec::new(),
        }
    }
}

pub struct YtDlpResolver {
    config: YoutubeDownloaderConfig,
}

impl YtDlpResolver {
    pub fn new(config: YoutubeDownloaderConfig) -> AppResult<Self> {
        if config.binary_path.as_os_str().is_empty() {
            return Err(AppError::Config(
                "yt-dlp binary path must not be empty".to_string(),
            ));
        }
        if config.socket_timeout_seconds == 0 {
            return Err(AppError::Config(
                "socket_timeout_seconds must be greater than 0".to_string(),
            ));
        }

        info!("🎥 Initialized yt-dlp resolver: {:?}", config);
        Ok(Self { config })
    }

    pub fn get_config(&self) -> &YoutubeDownloaderConfig {
        &self.config
    }

    /// Check whether the yt-dlp binary can be executed
    pub async fn check_available(&self) -> AppResult<bool> {
        let output = Command::new(&self.config.binary_path)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await;

        match output {
            Ok(output) => {
                if output.status.success() {
                    let version = String::from_utf8_lossy(&output.stdout);
                    info!("✅ yt-dlp is available (version {})", version.trim());
                } else {
                    warn!("⚠️ yt-dlp exited with {}", output.status);
                }
                Ok(output.status.success())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("⚠️ yt-dlp is not available at {:?}", self.config.binary_path);
                Ok(false)
            }
            Err(e) => Err(AppError::System(format!("Failed to check yt-dlp: {}", e))),
        }
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.config.binary_path);
        command
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .env("PYTHONIOENCODING", "UTF-8");
        command
    }

    async fn dump_json(&self, args: &[String]) -> Result<serde_json::Value, DownloadError> {
        debug!("Running yt-dlp {:?}", args);
        let output = self
            .command()
            .args(args)
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_ytdlp_stderr(&stderr));
        }

        serde_json::from_slice(&output.stdout).map_err(|e| {
            DownloadError::resolution(
                ResolutionReason::Parse,
                format!("Failed to parse yt-dlp output: {}", e),
            )
        })
    }

    fn spawn_error(&self, err: std::io::Error) -> DownloadError {
        if err.kind() == std::io::ErrorKind::NotFound {
            DownloadError::unexpected(format!(
                "yt-dlp not found at {:?}; install it or set youtube.binary_path",
                self.config.binary_path
            ))
        } else {
            DownloadError::unexpected(format!("Failed to run yt-dlp: {}", err))
        }
    }

    fn download_args(&self, item: &MediaItem, variant: &StreamVariant, destination: &Path) -> Vec<String> {
        let selector = if variant.height().is_some() && !variant.has_audio {
            format!("{0}+bestaudio/{0}", variant.format_id)
        } else {
            variant.format_id.clone()
        };
        let template = destination.join("%(title)s.%(ext)s");

        let mut args = vec![
            "-f".to_string(),
            selector,
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--newline".to_string(),
            "--progress".to_string(),
            "--progress-template".to_string(),
            format!(
                "download:{}%(progress.downloaded_bytes)s|%(progress.total_bytes)s|%(progress.total_bytes_estimate)s",
                PROGRESS_PREFIX
            ),
            "--print".to_string(),
            format!("after_move:{}%(filepath)s", OUTPUT_PREFIX),
            "--socket-timeout".to_string(),
            self.config.socket_timeout_seconds.to_string(),
            "-o".to_string(),
            template.to_string_lossy().into_owned(),
        ];
        args.extend(self.config.extra_args.iter().cloned());
        args.push(item.webpage_url.clone());
        args
    }
}

#[async_trait]
impl MediaResolver for YtDlpResolver {
    async fn resolve(&self, locator: &Locator) -> Result<MediaItem, DownloadError> {
        info!("📺 Resolving media: {}", locator);
        let args = vec![
            "--dump-json".to_string(),
            "--no-warnings".to_string(),
            "--no-playlist".to_string(),
            locator.as_str().to_string(),
        ];
        let json = self.dump_json(&args).await?;
        let item = parse_media_item_from_json(&json)?;
        info!(
            "📋 Resolved '{}' with {} variants",
            item.title,
            item.variants.len()
        );
        Ok(item)
    }

    async fn resolve_playlist(&self, locator: &Locator) -> Result<PlaylistInfo, DownloadError> {
        info!("📋 Resolving playlist: {}", locator);
        let mut args = vec![
            "--flat-playlist".to_string(),
            "--dump-single-json".to_string(),
            "--no-warnings".to_string(),
        ];
        if let Some(max) = self.config.playlist_max_items {
            args.push("--playlist-end".to_string());
            args.push(max.to_string());
        }
        args.push(locator.as_str().to_string());

        let json = self.dump_json(&args).await?;
        let fallback_id = extract_playlist_id(locator.url()).unwrap_or_default();
        parse_playlist_from_json(&json, &fallback_id)
    }

    async fn save(
        &self,
        item: &MediaItem,
        variant: &StreamVariant,
        destination: &Path,
        on_progress: ProgressCallback,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, DownloadError> {
        let args = self.download_args(item, variant, destination);
        info!(
            "⬇️ Downloading '{}' (format {}) -> {}",
            item.title,
            variant.format_id,
            destination.display()
        );

        let mut child = self
            .command()
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DownloadError::unexpected("Failed to capture yt-dlp stdout"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| DownloadError::unexpected("Failed to capture yt-dlp stderr"))?;

        let stderr_reader = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf).await;
            buf
        });

        let mut lines = BufReader::new(stdout).lines();
        let mut output_path = None;
        let mut stream_progress = match companion_audio(&item.variants, variant) {
            Some(audio) => StreamProgress::merging(audio.filesize.unwrap_or(0)),
            None => StreamProgress::default(),
        };

        loop {
            tokio::select! {
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        if let Some((downloaded, total)) = parse_progress_line(&line) {
                            let (downloaded, total) = stream_progress.advance(downloaded, total);
                            on_progress(downloaded, total);
                        } else if let Some(path) = parse_output_line(&line) {
                            output_path = Some(path);
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Failed to read yt-dlp output: {}", e);
                        break;
                    }
                },
                _ = cancel.cancelled() => {
                    info!("🛑 Cancelling download of '{}'", item.title);
                    let _ = child.kill().await;
                    stderr_reader.abort();
                    return Err(DownloadError::Cancelled);
                }
            }
        }

        let status = child.wait().await?;
        let stderr_content = stderr_reader.await.unwrap_or_default();

        if !status.success() {
            return Err(classify_ytdlp_stderr(&stderr_content));
        }

        let path = output_path.ok_or_else(|| {
            DownloadError::unexpected("yt-dlp finished without reporting an output file")
        })?;
        info!("✅ Saved {}", path.display());
        Ok(path)
    }
}

/// Folds the byte counters of a `video+audio` download into one running
/// total. yt-dlp restarts its counters when the second stream begins.
#[derive(Debug, Default)]
struct StreamProgress {
    merging: bool,
    /// Expected size of the audio stream while it has not started
    pending_bytes: u64,
    finished_bytes: u64,
    last_downloaded: u64,
    last_total: Option<u64>,
}

impl StreamProgress {
    fn merging(audio_bytes: u64) -> Self {
        Self {
            merging: true,
            pending_bytes: audio_bytes,
            ..Self::default()
        }
    }

    fn advance(&mut self, downloaded: u64, total: Option<u64>) -> (u64, Option<u64>) {
        if !self.merging {
            return (downloaded, total);
        }

        if downloaded < self.last_downloaded {
            let previous = self.last_total.unwrap_or(0).max(self.last_downloaded);
            self.finished_bytes += previous;
            self.pending_bytes = 0;
        }
        self.last_downloaded = downloaded;
        self.last_total = total;

        (
            self.finished_bytes + downloaded,
            total.map(|t| self.finished_bytes + t + self.pending_bytes),
        )
    }
}

// Parsing functions

fn parse_media_item_from_json(json: &serde_json::Value) -> Result<MediaItem, DownloadError> {
    let id = json["id"]
        .as_str()
        .ok_or_else(|| {
            DownloadError::resolution(ResolutionReason::Parse, "Missing video ID in yt-dlp output")
        })?
        .to_string();

    let live = json["is_live"].as_bool().unwrap_or(false)
        || matches!(
            json["live_status"].as_str(),
            Some("is_live") | Some("is_upcoming")
        );
    if live {
        return Err(DownloadError::resolution(
            ResolutionReason::LiveStream,
            format!("{} is a live stream", id),
        ));
    }

    let title = json["title"].as_str().unwrap_or("Unknown Title").to_string();
    let webpage_url = json["webpage_url"]
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| format!("https://www.youtube.com/watch?v={}", id));

    let variants = json["formats"]
        .as_array()
        .map(|formats| formats.iter().filter_map(parse_variant_from_json).collect())
        .unwrap_or_default();

    Ok(MediaItem {
        id,
        title,
        webpage_url,
        duration: json["duration"].as_f64().map(|d| d as u64),
        variants,
    })
}

fn parse_variant_from_json(json: &serde_json::Value) -> Option<StreamVariant> {
    let format_id = json["format_id"].as_str()?.to_string();
    let vcodec = json["vcodec"].as_str();
    let acodec = json["acodec"].as_str();
    let has_audio = acodec.is_some_and(|c| c != "none");
    let has_video = vcodec != Some("none");
    let height = json["height"].as_u64().map(|h| h as u32);

    let kind = match (has_video, height) {
        (true, Some(height)) => VariantKind::Video { height },
        (false, _) if has_audio => VariantKind::Audio,
        // storyboards, manifests without dimensions
        _ => return None,
    };

    Some(StreamVariant {
        format_id,
        kind,
        ext: json["ext"].as_str().unwrap_or("mp4").to_string(),
        filesize: json["filesize"]
            .as_u64()
            .or_else(|| json["filesize_approx"].as_f64().map(|s| s as u64)),
        bitrate: json["tbr"].as_f64().or_else(|| json["abr"].as_f64()),
        has_audio,
    })
}

fn parse_playlist_from_json(
    json: &serde_json::Value,
    fallback_id: &str,
) -> Result<PlaylistInfo, DownloadError> {
    let entries = json["entries"].as_array().ok_or_else(|| {
        DownloadError::resolution(ResolutionReason::Parse, "yt-dlp output has no playlist entries")
    })?;

    let entries = entries
        .iter()
        .filter_map(parse_playlist_entry_from_json)
        .collect::<Vec<_>>();

    let id = json["id"].as_str().unwrap_or(fallback_id).to_string();
    let title = json["title"]
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| format!("Playlist {}", id));

    Ok(PlaylistInfo { id, title, entries })
}

fn parse_playlist_entry_from_json(json: &serde_json::Value) -> Option<PlaylistEntry> {
    let id = json["id"].as_str()?.to_string();
    let raw_url = json["url"]
        .as_str()
        .filter(|u| u.starts_with("http"))
        .map(str::to_string)
        .unwrap_or_else(|| format!("https://www.youtube.com/watch?v={}", id));

    let url = match validate_url(&raw_url) {
        Ok(url) => url,
        Err(e) => {
            warn!("Skipping playlist entry {}: {}", id, e);
            return None;
        }
    };

    Some(PlaylistEntry {
        title: json["title"].as_str().map(str::to_string),
        locator: Locator::with_kind(url, LocatorKind::Single),
        id,
    })
}

/// Parse `TF_PROGRESS|<downloaded>|<total>|<estimate>`; yt-dlp prints `NA` for unknown fields
fn parse_progress_line(line: &str) -> Option<(u64, Option<u64>)> {
    let rest = line.trim().strip_prefix(PROGRESS_PREFIX)?;
    let mut fields = rest.split('|').map(parse_byte_count);
    let downloaded = fields.next().flatten()?;
    let total = fields.next().flatten();
    let estimate = fields.next().flatten();
    Some((downloaded, total.or(estimate)))
}

fn parse_byte_count(field: &str) -> Option<u64> {
    field
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v as u64)
}

fn parse_output_line(line: &str) -> Option<PathBuf> {
    let path = line.trim().strip_prefix(OUTPUT_PREFIX)?;
    if path.is_empty() || path == "NA" {
        return None;
    }
    Some(PathBuf::from(path))
}
