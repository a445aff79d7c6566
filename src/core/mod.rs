//! Core business logic module
//!
//! Domain models, the media resolver seam and its yt-dlp implementation,
//! the batch orchestrator and the runtime that executes it.

pub mod config;
pub mod error_handling;
pub mod models;
pub mod orchestrator;
pub mod progress_tracker;
pub mod resolver;
pub mod runtime;
pub mod selection;
pub mod youtube_downloader;

#[cfg(test)]
mod test_support;

#[cfg(test)]
mod orchestrator_integration_tests;


// Re-export commonly used types
pub use config::AppConfig;
pub use orchestrator::BatchOrchestrator;
