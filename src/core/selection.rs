//! Stream variant selection

use std::cmp::Ordering;

use crate::core::error_handling::DownloadError;
use crate::core::models::{Resolution, SelectionPolicy, StreamVariant};

/// The chosen variant, plus the requested resolution when it had to fall back
#[derive(Debug, Clone, PartialEq)]
pub struct Selection<'a> {
    pub variant: &'a StreamVariant,
    pub fallback_from: Option<Resolution>,
}

/// Pick the variant `policy` asks for.
///
/// Video requests fall back to the highest available resolution instead of
/// failing; only a complete absence of matching streams is an error.
pub fn select_variant(
    variants: &[StreamVariant],
    policy: SelectionPolicy,
) -> Result<Selection<'_>, DownloadError> {
    match policy {
        SelectionPolicy::AudioOnly => variants
            .iter()
            .filter(|v| v.is_audio_only())
            .max_by(|a, b| compare_audio(a, b))
            .map(|variant| Selection {
                variant,
                fallback_from: None,
            })
            .ok_or(DownloadError::NoVariant { policy }),
        SelectionPolicy::VideoByResolution(wanted) => {
            let exact = variants
                .iter()
                .filter(|v| v.height() == Some(wanted.height()))
                .max_by(|a, b| compare_video(a, b));
            if let Some(variant) = exact {
                return Ok(Selection {
                    variant,
                    fallback_from: None,
                });
            }

            variants
                .iter()
                .filter(|v| v.height().is_some())
                .max_by(|a, b| {
                    a.height()
                        .cmp(&b.height())
                        .then_with(|| compare_video(a, b))
                })
                .map(|variant| Selection {
                    variant,
                    fallback_from: Some(wanted),
                })
                .ok_or(DownloadError::NoVariant { policy })
        }
    }
}

/// Audio stream merged into `variant` at download time, if it has no audio of its own
pub fn companion_audio<'a>(
    variants: &'a [StreamVariant],
    variant: &StreamVariant,
) -> Option<&'a StreamVariant> {
    if variant.is_audio_only() || variant.has_audio {
        return None;
    }
    variants
        .iter()
        .filter(|v| v.is_audio_only())
        .max_by(|a, b| compare_audio(a, b))
}

/// Bytes the whole transfer of `variant` is expected to take, merged audio included
pub fn expected_bytes(variants: &[StreamVariant], variant: &StreamVariant) -> Option<u64> {
    let audio = companion_audio(variants, variant).and_then(|a| a.filesize);
    variant.filesize.map(|size| size + audio.unwrap_or(0))
}

fn compare_audio(a: &StreamVariant, b: &StreamVariant) -> Ordering {
    cmp_opt_f64(a.bitrate, b.bitrate).then_with(|| a.filesize.cmp(&b.filesize))
}

/// Same height: prefer streams that already carry audio, then the larger one
fn compare_video(a: &StreamVariant, b: &StreamVariant) -> Ordering {
    a.has_audio
        .cmp(&b.has_audio)
        .then_with(|| cmp_opt_f64(a.bitrate, b.bitrate))
        .then_with(|| a.filesize.cmp(&b.filesize))
}

fn cmp_opt_f64(a: Option<f64>, b: Option<f64>) -> Ordering {
    a.unwrap_or(0.0).total_cmp(&b.unwrap_or(0.0))
}
