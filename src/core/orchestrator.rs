//! Batch download orchestrator
//!
//! Drives one download per locator through a [`MediaResolver`], pushing
//! progress and notifications to the presentation layer. Failures are caught
//! per item: a single download ends with `DownloadOutcome::Failure`, and a
//! playlist moves on to its next entry.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::core::error_handling::DownloadError;
use crate::core::models::{
    BatchSummary, DownloadMode, DownloadOutcome, DownloadRequest, Locator, ProgressState,
    SelectionPolicy,
};
use crate::core::progress_tracker::ProgressTracker;
use crate::core::resolver::{MediaResolver, ProgressCallback};
use crate::core::selection::{expected_bytes, select_variant};
use crate::ui::events::{EventEmitter, Notification};
use crate::utils::file_utils::ensure_dir_exists;

pub struct BatchOrchestrator<R> {
    resolver: R,
    events: EventEmitter,
    cancel: CancellationToken,
    tracker: Arc<Mutex<ProgressTracker>>,
}

impl<R: MediaResolver> BatchOrchestrator<R> {
    pub fn new(resolver: R, events: EventEmitter) -> Self {
        Self {
            resolver,
            events,
            cancel: CancellationToken::new(),
            tracker: Arc::new(Mutex::new(ProgressTracker::new())),
        }
    }

    /// Use an externally owned token so the run can be cancelled from elsewhere
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Current progress snapshot
    pub fn progress(&self) -> ProgressState {
        self.tracker.lock().state().clone()
    }

    /// Execute a request and finish with a [`BatchSummary`] event
    pub async fn run(&self, request: &DownloadRequest) -> Vec<DownloadOutcome> {
        match request.mode {
            DownloadMode::Playlist => {
                self.download_playlist(&request.locator, request.policy, &request.destination)
                    .await
            }
            DownloadMode::Single => {
                let started_at = chrono::Utc::now();
                let outcome = self
                    .download_single(&request.locator, request.policy, &request.destination)
                    .await;
                let title = match &outcome {
                    DownloadOutcome::Success { title, .. } => Some(title.clone()),
                    DownloadOutcome::Failure(_) => None,
                };
                let outcomes = vec![outcome];
                self.events.completed(BatchSummary::from_outcomes(
                    Uuid::new_v4(),
                    title,
                    &outcomes,
                    started_at,
                ));
                outcomes
            }
        }
    }

    /// Download one item. Never fails past this point: errors become
    /// `Failure` plus exactly one error notification.
    pub async fn download_single(
        &self,
        locator: &Locator,
        policy: SelectionPolicy,
        destination: &Path,
    ) -> DownloadOutcome {
        self.download_item(locator, policy, destination, format!("Resolving {}", locator))
            .await
    }

    /// `resolving_status` is shown while the locator resolves and replaces
    /// the previous item's progress
    #[instrument(skip_all, fields(locator = %locator, policy = %policy))]
    async fn download_item(
        &self,
        locator: &Locator,
        policy: SelectionPolicy,
        destination: &Path,
        resolving_status: String,
    ) -> DownloadOutcome {
        match self
            .try_download(locator, policy, destination, resolving_status)
            .await
        {
            Ok((title, path)) => {
                info!("✅ Downloaded '{}' to {}", title, path.display());
                self.events
                    .notify(Notification::info(format!("Download complete: {}", title)));
                DownloadOutcome::Success { title, path }
            }
            Err(err) => {
                warn!("❌ {} for {}: {}", err.kind(), locator, err);
                let state = self.tracker.lock().set_status(format!("Download failed: {}", err));
                self.events.progress(state);
                self.events.notify(Notification::error(err.to_string()));
                DownloadOutcome::Failure(err)
            }
        }
    }

    async fn try_download(
        &self,
        locator: &Locator,
        policy: SelectionPolicy,
        destination: &Path,
        resolving_status: String,
    ) -> Result<(String, PathBuf), DownloadError> {
        if self.cancel.is_cancelled() {
            return Err(DownloadError::Cancelled);
        }

        let state = self.tracker.lock().reset(resolving_status);
        self.events.progress(state);
        let item = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(DownloadError::Cancelled),
            resolved = self.resolver.resolve(locator) => resolved?,
        };

        let selection = select_variant(&item.variants, policy)?;
        let variant = selection.variant;
        if let Some(wanted) = selection.fallback_from {
            let available = variant
                .height()
                .map(|h| format!("{}p", h))
                .unwrap_or_else(|| variant.format_id.clone());
            info!(
                "{} not available for '{}', falling back to {}",
                wanted, item.title, available
            );
            self.emit_status(format!(
                "{} not available, downloading the highest resolution ({}) of {}",
                wanted, available, item.title
            ));
        } else {
            self.emit_status(format!("Starting download: {}", item.title));
        }

        ensure_dir_exists(destination).map_err(|e| DownloadError::unexpected(e.to_string()))?;

        self.tracker
            .lock()
            .begin(&item.title, expected_bytes(&item.variants, variant));
        let tracker = Arc::clone(&self.tracker);
        let events = self.events.clone();
        let on_progress: ProgressCallback = Arc::new(move |downloaded, total| {
            let state = tracker.lock().update(downloaded, total);
            events.progress(state);
        });

        let path = self
            .resolver
            .save(&item, variant, destination, on_progress, &self.cancel)
            .await?;

        let state = self
            .tracker
            .lock()
            .complete(format!("✅ Download complete: {}", item.title));
        self.events.progress(state);

        Ok((item.title, path))
    }

    /// Download every entry of a playlist, one at a time, in resolver order.
    ///
    /// Always audio-only. Returns one outcome per entry; entries skipped after
    /// cancellation are `Failure(Cancelled)`.
    #[instrument(skip_all, fields(locator = %locator))]
    pub async fn download_playlist(
        &self,
        locator: &Locator,
        policy: SelectionPolicy,
        destination: &Path,
    ) -> Vec<DownloadOutcome> {
        let run_id = Uuid::new_v4();
        let started_at = chrono::Utc::now();

        let policy = match policy {
            SelectionPolicy::AudioOnly => policy,
            SelectionPolicy::VideoByResolution(res) => {
                warn!("Playlist downloads are audio only, ignoring {}", res);
                self.events.notify(Notification::warning(
                    "Playlists are downloaded as audio only",
                ));
                SelectionPolicy::AudioOnly
            }
        };

        let state = self.tracker.lock().reset(format!("Resolving playlist {}", locator));
        self.events.progress(state);

        let resolved = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(DownloadError::Cancelled),
            resolved = self.resolver.resolve_playlist(locator) => resolved,
        };
        let playlist = match resolved {
            Ok(playlist) => playlist,
            Err(err) => {
                warn!("❌ Playlist {} could not be resolved: {}", locator, err);
                let state = self.tracker.lock().set_status(format!("Playlist failed: {}", err));
                self.events.progress(state);
                self.events.notify(Notification::error(err.to_string()));
                self.events.completed(BatchSummary::from_outcomes(
                    run_id,
                    None,
                    &[],
                    started_at,
                ));
                return Vec::new();
            }
        };

        let total = playlist.entries.len();
        info!(
            "📋 Playlist '{}' ({}) with {} items [run {}]",
            playlist.title, playlist.id, total, run_id
        );
        self.emit_status(format!(
            "Starting playlist download: {} ({} items)",
            playlist.title, total
        ));

        let mut outcomes = Vec::with_capacity(total);
        for (index, entry) in playlist.entries.iter().enumerate() {
            if self.cancel.is_cancelled() {
                outcomes.push(DownloadOutcome::Failure(DownloadError::Cancelled));
                continue;
            }

            let label = entry.title.as_deref().unwrap_or(&entry.id);
            let status = format!("Downloading audio {}/{}: {}", index + 1, total, label);
            let outcome = self
                .download_item(&entry.locator, policy, destination, status)
                .await;
            if let DownloadOutcome::Failure(err) = &outcome {
                warn!(
                    "Playlist item {}/{} ({}) failed, continuing: {}",
                    index + 1,
                    total,
                    label,
                    err
                );
            }
            outcomes.push(outcome);
        }

        let summary =
            BatchSummary::from_outcomes(run_id, Some(playlist.title), &outcomes, started_at);
        if summary.cancelled > 0 {
            self.events.notify(Notification::warning(format!(
                "Playlist cancelled, {} items not downloaded",
                summary.cancelled
            )));
        }
        let state = self.tracker.lock().complete(format!(
            "✅ Playlist download finished: {} of {} downloaded",
            summary.succeeded, summary.total
        ));
        self.events.progress(state);
        info!(
            "🏁 Playlist run {} finished: {} ok, {} failed",
            run_id, summary.succeeded, summary.failed
        );
        self.events.completed(summary);

        outcomes
    }

    fn emit_status(&self, status: String) {
        let state = self.tracker.lock().set_status(status);
        self.events.progress(state);
    }
}
