//! Presentation sink seam and the event pump that feeds it

use crate::core::models::{BatchSummary, ProgressState};
use crate::ui::events::{EventReceiver, Notification, PresentationEvent};

/// Whatever displays download state: a terminal, a GUI window, a test recorder.
///
/// Only ever called from the task that drains the event channel.
pub trait PresentationSink {
    fn render_progress(&mut self, state: &ProgressState);

    fn notify(&mut self, notification: &Notification);

    fn completed(&mut self, summary: &BatchSummary);
}

fn dispatch<S: PresentationSink + ?Sized>(sink: &mut S, event: &PresentationEvent) {
    match event {
        PresentationEvent::Progress(state) => sink.render_progress(state),
        PresentationEvent::Notification(notification) => sink.notify(notification),
        PresentationEvent::Completed(summary) => sink.completed(summary),
    }
}

/// Feed events into `sink` until a run completes.
///
/// Returns the run's summary, or `None` if every sender was dropped first.
pub async fn pump_events<S: PresentationSink + ?Sized>(
    rx: &mut EventReceiver,
    sink: &mut S,
) -> Option<BatchSummary> {
    while let Some(event) = rx.recv().await {
        dispatch(sink, &event);
        if let PresentationEvent::Completed(summary) = event {
            return Some(summary);
        }
    }
    None
}

/// Feed whatever is queued right now without waiting, for hosts that run
/// their own event loop and poll once per frame.
pub fn drain_pending<S: PresentationSink + ?Sized>(rx: &mut EventReceiver, sink: &mut S) -> usize {
    let mut handled = 0;
    while let Ok(event) = rx.try_recv() {
        dispatch(sink, &event);
        handled += 1;
    }
    handled
}
