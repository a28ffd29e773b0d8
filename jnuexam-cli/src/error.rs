//! CLI error type.

use std::fmt;

use jnuexam::config::ConfigError;
use jnuexam::download::DownloadError;
use jnuexam::logging::LoggingError;
use jnuexam::session::SessionError;

/// Errors surfaced by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Bad arguments or configuration.
    Config(String),
    /// Reading or writing the settings file failed.
    ConfigFile(ConfigError),
    /// Logging could not be set up.
    Logging(LoggingError),
    /// A browse or download operation failed.
    Session(SessionError),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "{}", msg),
            CliError::ConfigFile(e) => write!(f, "{}", e),
            CliError::Logging(e) => write!(f, "{}", e),
            CliError::Session(SessionError::Download(e)) => describe_download(f, e),
            CliError::Session(e) => write!(f, "{}", e),
        }
    }
}

fn describe_download(f: &mut fmt::Formatter<'_>, err: &DownloadError) -> fmt::Result {
    match err {
        DownloadError::NetworkFailure { .. } => {
            write!(f, "Network error: {}. Check your connection or try another source.", err)
        }
        DownloadError::RemoteError { .. } => write!(f, "Server error: {}", err),
        DownloadError::FilesystemFailure { .. } => write!(f, "Could not save file: {}", err),
        DownloadError::AlreadyInFlight(_) => write!(f, "Busy: {}", err),
        DownloadError::MalformedManifest(_) => {
            write!(f, "The file list could not be read: {}", err)
        }
        DownloadError::NotOffered { .. } => write!(
            f,
            "Unavailable: {}. Switch with 'jnuexam source set <id>'.",
            err
        ),
        DownloadError::Interrupted(_) => write!(f, "Interrupted: {}", err),
    }
}

impl std::error::Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::ConfigFile(e)
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e)
    }
}

impl From<SessionError> for CliError {
    fn from(e: SessionError) -> Self {
        CliError::Session(e)
    }
}

impl From<DownloadError> for CliError {
    fn from(e: DownloadError) -> Self {
        CliError::Session(SessionError::Download(e))
    }
}
