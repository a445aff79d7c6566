//! Download error taxonomy
//!
//! Every failure of one item's download is mapped into [`DownloadError`]. The
//! orchestrator converts these into `DownloadOutcome::Failure` and a single
//! user notification; nothing here is retried.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use thiserror::Error;

use crate::core::models::SelectionPolicy;

/// Why a locator could not be resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResolutionReason {
    /// Malformed or unsupported URL
    InvalidLocator,
    AgeRestricted,
    /// Removed, region-blocked or otherwise not served
    Unavailable,
    Private,
    /// Live streams cannot be saved as a finished file
    LiveStream,
    /// The tool produced output we could not understand
    Parse,
}

impl ResolutionReason {
    pub fn describe(self) -> &'static str {
        match self {
            Self::InvalidLocator => "invalid or unsupported URL",
            Self::AgeRestricted => "video is age restricted",
            Self::Unavailable => "video is unavailable",
            Self::Private => "video is private",
            Self::LiveStream => "live streams cannot be downloaded",
            Self::Parse => "could not read media information",
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum DownloadError {
    #[error("Could not resolve media ({}): {message}", .reason.describe())]
    Resolution {
        reason: ResolutionReason,
        message: String,
    },

    #[error("No stream available for {policy}")]
    NoVariant { policy: SelectionPolicy },

    #[error("{message}")]
    Unexpected { message: String },

    #[error("Download cancelled")]
    Cancelled,
}

impl DownloadError {
    pub fn resolution(reason: ResolutionReason, message: impl Into<String>) -> Self {
        Self::Resolution {
            reason,
            message: message.into(),
        }
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected {
            message: message.into(),
        }
    }

    /// Short label used in status lines and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Resolution { .. } => "ResolutionError",
            Self::NoVariant { .. } => "NoVariantError",
            Self::Unexpected { .. } => "UnexpectedError",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl From<std::io::Error> for DownloadError {
    fn from(err: std::io::Error) -> Self {
        Self::unexpected(format!("IO error: {}", err))
    }
}

static HTTP_ERROR_REGEX: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"HTTP Error (\d{3})").ok());

/// Status code of the last `HTTP Error NNN` yt-dlp reported
fn http_status(stderr: &str) -> Option<u16> {
    HTTP_ERROR_REGEX
        .as_ref()?
        .captures_iter(stderr)
        .last()
        .and_then(|caps| caps.get(1))
        .and_then(|code| code.as_str().parse().ok())
}

/// Map yt-dlp stderr into the error taxonomy.
///
/// Resolution problems are recognised by the messages yt-dlp prints for them;
/// anything else is reported as unexpected with the last `ERROR:` line.
pub fn classify_ytdlp_stderr(stderr: &str) -> DownloadError {
    let lower = stderr.to_lowercase();
    let message = last_error_line(stderr);

    // the item resolved fine; the chosen stream was refused at transfer time
    if lower.contains("requested format is not available") {
        return DownloadError::unexpected(format!("yt-dlp: {}", message));
    }

    let reason = if lower.contains("confirm your age")
        || lower.contains("age-restricted")
        || lower.contains("age restricted")
        || lower.contains("inappropriate for some users")
    {
        Some(ResolutionReason::AgeRestricted)
    } else if lower.contains("private video") {
        Some(ResolutionReason::Private)
    } else if lower.contains("is a live")
        || lower.contains("live event will begin")
        || lower.contains("premieres in")
        || lower.contains("is live")
    {
        Some(ResolutionReason::LiveStream)
    } else if lower.contains("unsupported url")
        || lower.contains("is not a valid url")
        || lower.contains("incomplete youtube id")
    {
        Some(ResolutionReason::InvalidLocator)
    } else if lower.contains("video unavailable")
        || lower.contains("this video is not available")
        || lower.contains("not available in your country")
        || lower.contains("has been removed")
        || lower.contains("copyright")
        || (lower.contains("geo") && lower.contains("block"))
    {
        Some(ResolutionReason::Unavailable)
    } else if lower.contains("unable to extract") || lower.contains("regex") {
        Some(ResolutionReason::Parse)
    } else {
        match http_status(stderr) {
            Some(404) | Some(410) => Some(ResolutionReason::Unavailable),
            _ => None,
        }
    };

    match reason {
        Some(reason) => DownloadError::resolution(reason, message),
        None => DownloadError::unexpected(format!("yt-dlp: {}", message)),
    }
}

fn last_error_line(stderr: &str) -> String {
    let line = stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| l.to_lowercase().starts_with("error"))
        .unwrap_or("");

    if line.is_empty() {
        let trimmed = stderr.trim();
        return trimmed.chars().take(300).collect();
    }

    line.strip_prefix("ERROR: ")
        .or_else(|| line.strip_prefix("ERROR:"))
        .unwrap_or(line)
        .to_string()
}
