//! Structured logging to a daily-rolling file, optionally mirrored to stderr.

use std::path::Path;

use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Overrides the log filter, e.g. `HYDRATEME_LOG=hydrateme=trace`.
pub const LOG_ENV: &str = "HYDRATEME_LOG";

const LOG_FILE_PREFIX: &str = "hydrateme.log";

/// Installs the global subscriber.
///
/// Never fails: when the log directory is unusable, logging goes to stderr
/// only and the caller carries on. The file writer is the plain blocking
/// appender, with no background worker thread, so the process may still
/// `fork` afterwards.
pub fn init(log_dir: &Path, verbose: bool, stderr: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

    let (file_layer, file_error) = match file_writer(log_dir) {
        Ok(writer) => (
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_writer(writer),
            ),
            None,
        ),
        Err(e) => {
            eprintln!(
                "hydrateme: cannot log to {}: {e}; logging to stderr only",
                log_dir.display()
            );
            (None, Some(e))
        }
    };

    let stderr_layer = (stderr || file_error.is_some()).then(|| {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
    });

    // A subscriber may already be installed (tests, embedding); keep it.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init();

    if let Some(e) = file_error {
        tracing::warn!(error = %e, dir = %log_dir.display(), "file logging disabled");
    }
}

/// Opens the daily-rolling log file, creating `log_dir` as needed.
fn file_writer(log_dir: &Path) -> Result<RollingFileAppender, InitError> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .build(log_dir)
}
