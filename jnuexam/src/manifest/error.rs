//! Error types for manifest ingestion.

use thiserror::Error;

/// Result type for manifest operations.
pub type ManifestResult<T> = Result<T, ManifestError>;

/// Errors raised while turning a payload into a [`Manifest`](super::Manifest).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManifestError {
    /// The payload is not valid JSON, or a required field is absent or of
    /// the wrong type.
    #[error("malformed manifest: {0}")]
    Malformed(String),
}
