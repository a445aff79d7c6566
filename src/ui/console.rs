//! Terminal presentation sink

use std::io::{self, Write};

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::core::models::{BatchSummary, ProgressState};
use crate::ui::events::{Notification, NotificationLevel};
use crate::ui::sink::PresentationSink;

const BAR_SCALE: u64 = 1000;

/// Renders progress on an indicatif bar.
///
/// The bar draws nothing when its target is not a terminal, so notifications
/// and the summary line then go to `plain` instead.
pub struct ConsoleSink {
    bar: ProgressBar,
    plain: Box<dyn Write + Send>,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::with_output(ProgressDrawTarget::stderr(), Box::new(io::stderr()))
    }

    pub fn with_output(target: ProgressDrawTarget, plain: Box<dyn Write + Send>) -> Self {
        let bar = ProgressBar::with_draw_target(Some(BAR_SCALE), target);
        let style = ProgressStyle::with_template("{bar:40.red/white} {percent:>3}% {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏ ");
        bar.set_style(style);
        bar.set_message("Ready to download!");
        Self { bar, plain }
    }

    fn print_line(&mut self, line: String) {
        if self.bar.is_hidden() {
            if let Err(err) = writeln!(self.plain, "{}", line) {
                tracing::debug!("Failed to write console line: {}", err);
            }
        } else {
            self.bar.println(line);
        }
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl PresentationSink for ConsoleSink {
    fn render_progress(&mut self, state: &ProgressState) {
        if self.bar.is_finished() {
            self.bar.reset();
        }
        self.bar
            .set_position((state.fraction.clamp(0.0, 1.0) * BAR_SCALE as f64).round() as u64);
        self.bar.set_message(state.status_text.clone());
    }

    fn notify(&mut self, notification: &Notification) {
        let icon = match notification.level {
            NotificationLevel::Info => "ℹ️",
            NotificationLevel::Warning => "⚠️",
            NotificationLevel::Error => "❌",
        };
        self.print_line(format!("{} {}", icon, notification.message));
    }

    fn completed(&mut self, summary: &BatchSummary) {
        let elapsed = summary.finished_at - summary.started_at;
        let title = summary.title.as_deref().unwrap_or("download");
        let mut line = format!(
            "🏁 {}: {} of {} succeeded in {}s",
            title,
            summary.succeeded,
            summary.total,
            elapsed.num_seconds()
        );
        if summary.cancelled > 0 {
            line.push_str(&format!(" ({} cancelled)", summary.cancelled));
        }
        if self.bar.is_hidden() {
            self.bar.finish();
            self.print_line(line);
        } else {
            self.bar.finish_with_message(line);
        }
    }
}
