//! Tracing subscriber setup.
//!
//! Log lines go to stderr and, when a log directory is configured, to
//! `jnuexam.log` inside it through a non-blocking writer. `RUST_LOG` takes
//! precedence over the configured level.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_PREFIX: &str = "jnuexam";
const LOG_FILE_SUFFIX: &str = "log";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter: {0}")]
    Filter(String),

    #[error("failed to open log file in {}: {reason}", .dir.display())]
    File { dir: PathBuf, reason: String },

    #[error(transparent)]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Level used when `RUST_LOG` is not set.
    pub level: Level,
    /// Also write logs to a file in this directory.
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            log_dir: None,
        }
    }
}

impl LoggingConfig {
    /// Debug-level logging.
    pub fn verbose() -> Self {
        Self {
            level: Level::DEBUG,
            ..Self::default()
        }
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }
}

/// Install the global subscriber.
///
/// The returned guard flushes the log file when dropped and must be held for
/// as long as logging is needed. It is `None` when no log directory is set.
pub fn init(config: LoggingConfig) -> Result<Option<WorkerGuard>, LoggingError> {
    let filter = EnvFilter::builder()
        .with_default_directive(config.level.into())
        .from_env()
        .map_err(|e| LoggingError::Filter(e.to_string()))?;

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            let (writer, guard) = tracing_appender::non_blocking(open_log_file(dir)?);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_timer(LocalTime::rfc_3339());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_timer(LocalTime::rfc_3339())
                .with_target(false),
        )
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}

fn open_log_file(dir: &Path) -> Result<RollingFileAppender, LoggingError> {
    let file_err = |reason: String| LoggingError::File {
        dir: dir.to_path_buf(),
        reason,
    };

    fs::create_dir_all(dir).map_err(|e| file_err(e.to_string()))?;
    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .build(dir)
        .map_err(|e| file_err(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, Level::INFO);
        assert!(config.log_dir.is_none());
        assert_eq!(LoggingConfig::verbose().level, Level::DEBUG);
    }

    #[test]
    fn test_open_log_file_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("logs/nested");
        open_log_file(&log_dir).unwrap();
        assert!(log_dir.is_dir());
    }

    #[test]
    fn test_open_log_file_under_a_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"x").unwrap();

        let err = open_log_file(&blocker.join("logs")).unwrap_err();
        assert!(matches!(err, LoggingError::File { .. }));
    }
}
