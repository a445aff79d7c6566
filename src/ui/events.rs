//! Presentation events
//!
//! Download work never touches presentation state directly. It sends
//! [`PresentationEvent`]s over a channel which the task that owns the
//! presentation drains (see [`crate::ui::sink::pump_events`]).

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::core::models::{BatchSummary, ProgressState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

/// Transient message, the equivalent of a snackbar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PresentationEvent {
    Progress(ProgressState),
    Notification(Notification),
    Completed(BatchSummary),
}

pub type EventReceiver = mpsc::UnboundedReceiver<PresentationEvent>;

/// Sending half handed to the orchestrator and to progress callbacks.
///
/// Sends never block, so it is safe to call from the resolver's transfer task.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    sender: mpsc::UnboundedSender<PresentationEvent>,
}

impl EventEmitter {
    pub fn channel() -> (Self, EventReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    pub fn progress(&self, state: ProgressState) {
        self.emit(PresentationEvent::Progress(state));
    }

    pub fn notify(&self, notification: Notification) {
        self.emit(PresentationEvent::Notification(notification));
    }

    pub fn completed(&self, summary: BatchSummary) {
        self.emit(PresentationEvent::Completed(summary));
    }

    fn emit(&self, event: PresentationEvent) {
        if self.sender.send(event).is_err() {
            tracing::debug!("Presentation receiver dropped, event discarded");
        }
    }
}
