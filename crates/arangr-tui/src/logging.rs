use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding the log filter directive
pub const LOG_ENV: &str = "ARANGR_LOG";

const LOG_FILE_PREFIX: &str = "arangr-assistant.log";

/// Directory for rolling log files
pub fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("arangr")
        .join("logs")
}

/// Initialise file logging.
///
/// The terminal is owned by the dialog, so everything goes to a
/// daily-rolling file. Keep the returned guard alive for the whole of
/// `main`; dropping it stops the writer thread.
pub fn init_logging() -> WorkerGuard {
    let log_dir = log_dir();

    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!(
            "arangr-assistant: warning: failed to create log directory {}: {e}",
            log_dir.display()
        );
    }

    let file_appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(env_filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .init();

    guard
}
