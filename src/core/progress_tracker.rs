//! Per-item progress tracking
//!
//! Holds the [`ProgressState`] of the item currently downloading. The
//! orchestrator is the only writer; every change is forwarded to the
//! presentation layer as a snapshot.

use crate::core::models::ProgressState;

#[derive(Debug, Default)]
pub struct ProgressTracker {
    state: ProgressState,
    title: String,
    /// Size announced by the selected variant, used when the transfer has no total
    expected_bytes: Option<u64>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    /// Start a new item at fraction 0.0
    pub fn reset(&mut self, status_text: impl Into<String>) -> ProgressState {
        self.title.clear();
        self.expected_bytes = None;
        self.state = ProgressState {
            status_text: status_text.into(),
            fraction: 0.0,
        };
        self.state.clone()
    }

    /// Attach the resolved title and size of the item being downloaded
    pub fn begin(&mut self, title: &str, expected_bytes: Option<u64>) {
        self.title = title.to_string();
        self.expected_bytes = expected_bytes;
    }

    /// Replace the status text without touching the fraction
    pub fn set_status(&mut self, status_text: impl Into<String>) -> ProgressState {
        self.state.status_text = status_text.into();
        self.state.clone()
    }

    /// Record transferred bytes. The fraction never moves backwards within an item.
    pub fn update(&mut self, downloaded_bytes: u64, total_bytes: Option<u64>) -> ProgressState {
        let total = total_bytes.filter(|t| *t > 0).or(self.expected_bytes);
        if let Some(total) = total.filter(|t| *t > 0) {
            let fraction = (downloaded_bytes as f64 / total as f64).clamp(0.0, 1.0);
            if fraction > self.state.fraction {
                self.state.fraction = fraction;
            }
        }
        self.state.status_text = format!(
            "Downloading {}: {:.0}%",
            self.title,
            self.state.fraction * 100.0
        );
        self.state.clone()
    }

    /// Mark the item finished at exactly 1.0
    pub fn complete(&mut self, status_text: impl Into<String>) -> ProgressState {
        self.state = ProgressState {
            status_text: status_text.into(),
            fraction: 1.0,
        };
        self.state.clone()
    }
}
