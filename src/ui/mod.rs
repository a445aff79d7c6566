//! Presentation layer
//!
//! Events emitted by download work, the sink trait that renders them, the
//! terminal renderer and the download form model.

pub mod console;
pub mod events;
pub mod form;
pub mod sink;

pub use console::ConsoleSink;
pub use events::{EventEmitter, EventReceiver, Notification, NotificationLevel, PresentationEvent};
pub use form::{AudioMode, DownloadForm, Tab};
pub use sink::{drain_pending, pump_events, PresentationSink};
