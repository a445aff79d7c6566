//! Helpers shared by the library and the binary: URL checks, directory
//! setup and tracing initialisation.

pub mod file_utils;
pub mod logging;
pub mod validation;

// Re-export commonly used utilities
pub use file_utils::*;
pub use logging::*;
pub use validation::*;
