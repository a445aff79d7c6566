//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins over the configured level
fn build_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tubefetch={default_level}")))
}

#[cfg(feature = "local-logging")]
fn try_init_file_logging(default_level: &str) -> Result<(), String> {
    use std::sync::OnceLock;
    use tracing_appender::non_blocking::WorkerGuard;

    static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

    let log_dir = std::env::current_dir()
        .map_err(|e| format!("Failed to resolve current directory: {e}"))?
        .join("log");
    std::fs::create_dir_all(&log_dir)
        .map_err(|e| format!("Failed to create log directory: {e}"))?;

    let file_appender = tracing_appender::rolling::never(&log_dir, "tubefetch.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::fmt()
        .with_env_filter(build_filter(default_level))
        .with_writer(non_blocking)
        .with_ansi(false)
        .try_init()
        .map_err(|e| e.to_string())
}

/// Install the global subscriber once; later calls are no-ops.
///
/// Without the `local-logging` feature output goes to stderr so it does not
/// interleave with the progress bar on stdout.
pub fn init_tracing(default_level: &str) {
    #[cfg(feature = "local-logging")]
    {
        match try_init_file_logging(default_level) {
            Ok(()) => return,
            Err(err) => eprintln!("File logging unavailable, using stderr: {err}"),
        }
    }

    let _ = tracing_subscriber::fmt()
        .with_env_filter(build_filter(default_level))
        .with_writer(std::io::stderr)
        .try_init();
}
