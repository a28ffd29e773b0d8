//! JNU-EXAM downloader core.
//!
//! Browses the exam archive's published manifest and downloads files from a
//! chosen mirror. The manifest is a flat list of directory records that may
//! skip intermediate ancestors; [`manifest`] turns it into a tree plus a flat
//! search index. [`download`] streams manifests and files with progress and at
//! most one transfer per target, and [`session`] ties both to the current
//! mirror and selection.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use jnuexam::download::{DownloadCoordinator, ReqwestTransport};
//! use jnuexam::session::Session;
//! use jnuexam::source::SourceTable;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = Arc::new(ReqwestTransport::new()?);
//! let session = Session::new(DownloadCoordinator::new(transport), SourceTable::builtin(), Some("github"));
//!
//! session.refresh(|p| println!("{}", p)).await?;
//! session.select("README.md")?;
//! let handle = session.begin_quick_download(std::path::Path::new("/tmp"))?;
//! let saved = session.complete_download(handle, |_| {}).await?;
//! println!("saved to {}", saved.display());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod download;
pub mod logging;
pub mod manifest;
pub mod session;
pub mod source;

pub use manifest::format_size;
