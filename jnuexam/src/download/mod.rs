//! Background transfers with single-flight protection.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    DownloadCoordinator                       │
//! │                                                              │
//! │   manifest slot ──┐                  ┌── file slot           │
//! │                   ▼                  ▼                       │
//! │            ┌─────────────────────────────────┐               │
//! │            │   HttpTransport (reqwest)       │               │
//! │            └─────────────────────────────────┘               │
//! │                   │                  │                       │
//! │          in-memory buffer      AtomicFile (.part + rename)   │
//! │                   │                  │                       │
//! │                   ▼                  ▼                       │
//! │        TransferEvent::Progress ... TransferEvent::Finished   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! At most one manifest fetch and one file download run at a time; the two
//! targets do not block each other. A second request for a busy target is
//! refused with [`DownloadError::AlreadyInFlight`] before any network work.
//!
//! Files are streamed to a temporary sibling and renamed into place, so a
//! failed download never leaves a partial file at the destination.

mod coordinator;
mod error;
mod filename;
mod http;
mod persist;
mod progress;
mod state;

pub use coordinator::{
    DownloadCoordinator, Target, TransferEvent, TransferHandle, DEFAULT_EVENT_CAPACITY,
};
pub use error::{DownloadError, DownloadResult};
pub use filename::{sanitize_filename, FALLBACK_FILENAME, MAX_FILENAME_CHARS};
pub use http::{
    BoxFuture, HttpTransport, ReqwestTransport, ResponseBody, DEFAULT_CONNECT_TIMEOUT_SECS,
    DEFAULT_READ_TIMEOUT_SECS,
};
pub use persist::AtomicFile;
pub use progress::{Progress, ProgressTracker};
pub use state::{Slot, SlotGuard, SlotOutcome, SlotState};

#[cfg(test)]
pub(crate) use http::mock;
