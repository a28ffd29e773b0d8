//! Error types for transfers.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::Target;
use crate::manifest::ManifestError;

/// Result type for download operations.
pub type DownloadResult<T> = Result<T, DownloadError>;

/// Everything that can end a transfer early.
///
/// None of these are fatal: the slot is back to idle by the time the caller
/// sees the error, so the same request can simply be retried.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Connection, TLS, timeout or mid-stream read failure.
    #[error("network failure while fetching {url}: {reason}")]
    NetworkFailure { url: String, reason: String },

    /// The server answered with a non-success status.
    #[error("server returned HTTP {status_code} for {url}")]
    RemoteError { url: String, status_code: u16 },

    /// Creating a directory, writing, or renaming into place failed.
    #[error("filesystem failure at {}: {source}", .path.display())]
    FilesystemFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The slot for this target already has a transfer running.
    #[error("a {0} transfer is already in progress")]
    AlreadyInFlight(Target),

    /// The downloaded manifest could not be parsed.
    #[error(transparent)]
    MalformedManifest(#[from] ManifestError),

    /// The selected mirror does not host the file.
    #[error("source '{source_id}' does not offer {file}")]
    NotOffered { file: String, source_id: String },

    /// The worker stopped without reporting a result.
    #[error("{0} transfer ended without reporting a result")]
    Interrupted(Target),
}

impl DownloadError {
    pub(crate) fn network(url: &str, reason: impl ToString) -> Self {
        Self::NetworkFailure {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn filesystem(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::FilesystemFailure {
            path: path.into(),
            source,
        }
    }

    /// Whether the request was refused before any network activity.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::AlreadyInFlight(_) | Self::NotOffered { .. })
    }
}
