//! Manifest ingestion and the browsing structures derived from it.
//!
//! - `model`: typed manifest (`Manifest`, `DirRecord`, `FileEntry`) and parsing
//! - `tree`: hierarchical `DirNode` synthesis from the flat directory list
//! - `search`: flattened `SearchIndex` for substring lookup
//! - `catalog`: the manifest/tree/index triple, built and replaced as a unit

mod catalog;
mod error;
mod model;
mod search;
mod tree;

pub use catalog::Catalog;
pub use error::{ManifestError, ManifestResult};
pub use model::{DirRecord, FileEntry, Manifest};
pub use search::SearchIndex;
pub use tree::{synthesize, DirNode};

const KIB: f64 = 1024.0;
const MIB: f64 = 1024.0 * 1024.0;

/// Format a byte count the way the file details pane shows it.
///
/// ```
/// assert_eq!(jnuexam::manifest::format_size(2_097_152), "2.00 MB");
/// assert_eq!(jnuexam::manifest::format_size(1536), "1.50 KB");
/// assert_eq!(jnuexam::manifest::format_size(512), "512 B");
/// ```
pub fn format_size(bytes: u64) -> String {
    let size = bytes as f64;
    if size >= MIB {
        format!("{:.2} MB", size / MIB)
    } else if size >= KIB {
        format!("{:.2} KB", size / KIB)
    } else {
        format!("{} B", bytes)
    }
}
