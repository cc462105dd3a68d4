//! Telemetry and observability setup
//!
//! Configures structured logging with tracing and tracing-subscriber, plus an
//! optional daily-rolling log file.

use crate::config::ObservabilityConfig;
use std::path::Path;
use std::sync::{Once, OnceLock};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

// Flushes the file writer on drop, so it lives as long as the process.
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

const DEFAULT_LOG_FILE_NAME: &str = "vigil.log";

/// Initialize tracing subscriber for structured logging
///
/// This can only be called once per process. Subsequent calls are silently ignored.
///
/// RUST_LOG takes precedence over `log_level`. When `log_file` is set, the
/// same events are also written there without ANSI colours, rotated daily and
/// capped at `log_max_files` files.
///
/// # Examples
///
/// ```no_run
/// vigil::telemetry::init(&vigil::config::ObservabilityConfig::default());
/// tracing::info!("Application started");
/// ```
pub fn init(config: &ObservabilityConfig) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("vigil={},tower_http=debug", config.log_level))
        });

        let mut file_error = None;
        let file_layer = match config.log_file.as_deref() {
            Some(path) => match file_writer(path, config.log_max_files) {
                Ok((writer, guard)) => {
                    let _ = FILE_GUARD.set(guard);
                    Some(fmt::layer().with_writer(writer).with_ansi(false))
                }
                Err(e) => {
                    file_error = Some((path.display().to_string(), e));
                    None
                }
            },
            None => None,
        };

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .with(file_layer)
            .init();

        if let Some((path, e)) = file_error {
            tracing::warn!(
                path = %path,
                error = %e,
                "Could not open log file, logging to stdout only"
            );
        }
    });
}

/// Non-blocking writer for a daily-rolling file named after `path`
fn file_writer(path: &Path, max_files: usize) -> Result<(NonBlocking, WorkerGuard), InitError> {
    let directory = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let prefix = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(DEFAULT_LOG_FILE_NAME);

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .max_log_files(max_files.max(1))
        .build(directory)?;

    Ok(tracing_appender::non_blocking(appender))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_file_writer_creates_log_in_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let (mut writer, guard) = file_writer(&dir.path().join("vigil.log"), 3).unwrap();

        writer.write_all(b"hello\n").unwrap();
        drop(guard);

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].starts_with("vigil.log"));
    }

    #[test]
    fn test_file_writer_fails_when_directory_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "x").unwrap();

        assert!(file_writer(&blocker.join("vigil.log"), 3).is_err());
    }
}
