//! Coordination state shared by a presentation layer.
//!
//! A [`Session`] holds what the user is currently looking at: the active
//! mirror, the catalog built from that mirror's manifest, the selected file
//! and the last completed download. Transfers run through the session's
//! [`DownloadCoordinator`], whose slots are the only gate on concurrency.
//!
//! Refreshes are split into `begin_refresh` and `complete_refresh` so the
//! caller can render progress in between. A manifest that arrives after the
//! user switched mirrors is discarded instead of replacing the catalog.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::download::{
    sanitize_filename, DownloadCoordinator, DownloadError, Progress, TransferHandle,
};
use crate::manifest::{Catalog, FileEntry, Manifest};
use crate::source::{Source, SourceTable};

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error("no manifest loaded yet, refresh first")]
    NoCatalog,

    #[error("no file selected")]
    NoSelection,

    #[error("no file at '{0}' in the manifest")]
    FileNotFound(String),
}

/// Result of switching the active source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceChange {
    pub previous: String,
    pub current: String,
    /// The requested id was unknown and the default was used instead.
    pub fell_back: bool,
}

impl SourceChange {
    pub fn changed(&self) -> bool {
        self.previous != self.current
    }
}

/// A manifest fetch started by [`Session::begin_refresh`].
#[derive(Debug)]
pub struct PendingRefresh {
    source_id: String,
    handle: TransferHandle<Manifest>,
}

impl PendingRefresh {
    /// Source that was current when the fetch started.
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn url(&self) -> &str {
        self.handle.url()
    }
}

/// What happened to a fetched manifest.
#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    /// The catalog was replaced.
    Applied(Arc<Catalog>),
    /// The source changed while the fetch was running; nothing was replaced.
    Discarded { requested: String, current: String },
}

impl RefreshOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, RefreshOutcome::Applied(_))
    }
}

pub struct Session {
    sources: SourceTable,
    coordinator: DownloadCoordinator,
    current_source: RwLock<String>,
    catalog: RwLock<Option<Arc<Catalog>>>,
    selected: RwLock<Option<FileEntry>>,
    last_download: RwLock<Option<PathBuf>>,
}

impl Session {
    /// Create a session starting on `initial_source`.
    ///
    /// An absent or unknown id starts on the table's default source.
    pub fn new(coordinator: DownloadCoordinator, sources: SourceTable, initial_source: Option<&str>) -> Self {
        let current = match initial_source {
            Some(id) => sources.resolve_or_default(id).id.clone(),
            None => sources.default_source().id.clone(),
        };
        debug!(source = %current, "session created");

        Self {
            sources,
            coordinator,
            current_source: RwLock::new(current),
            catalog: RwLock::new(None),
            selected: RwLock::new(None),
            last_download: RwLock::new(None),
        }
    }

    pub fn sources(&self) -> &SourceTable {
        &self.sources
    }

    pub fn coordinator(&self) -> &DownloadCoordinator {
        &self.coordinator
    }

    /// The active source.
    pub fn current_source(&self) -> Source {
        let id = self.current_source.read();
        self.sources.resolve_or_default(&id).clone()
    }

    /// Switch the active source. Unknown ids select the default source.
    pub fn set_source(&self, id: &str) -> SourceChange {
        let (target, fell_back) = match self.sources.resolve(id) {
            Ok(source) => (source.id.clone(), false),
            Err(_) => (self.sources.resolve_or_default(id).id.clone(), true),
        };

        let mut current = self.current_source.write();
        let previous = std::mem::replace(&mut *current, target.clone());
        if previous != target {
            info!(from = %previous, to = %target, "switched source");
        }

        SourceChange {
            previous,
            current: target,
            fell_back,
        }
    }

    /// Start fetching the current source's manifest.
    pub fn begin_refresh(&self) -> SessionResult<PendingRefresh> {
        let source = self.current_source();
        let handle = self.coordinator.begin_manifest(&source.manifest_url)?;
        info!(source = %source.id, url = %source.manifest_url, "refreshing manifest");
        Ok(PendingRefresh {
            source_id: source.id,
            handle,
        })
    }

    /// Wait for a refresh and install the resulting catalog.
    ///
    /// The catalog is left untouched on failure, and also when the current
    /// source no longer matches the one the fetch was started for.
    pub async fn complete_refresh<F>(&self, pending: PendingRefresh, on_progress: F) -> SessionResult<RefreshOutcome>
    where
        F: FnMut(Progress),
    {
        let PendingRefresh { source_id, handle } = pending;
        let manifest = handle.wait_with(on_progress).await?;

        let current = self.current_source.read();
        if *current != source_id {
            warn!(requested = %source_id, current = %*current, "discarding manifest from previous source");
            return Ok(RefreshOutcome::Discarded {
                requested: source_id,
                current: current.clone(),
            });
        }

        let catalog = Arc::new(Catalog::build(manifest));
        *self.catalog.write() = Some(Arc::clone(&catalog));
        drop(current);

        self.reselect(&catalog);
        info!(
            source = %source_id,
            files = catalog.index().len(),
            dirs = catalog.tree().dir_count(),
            "catalog updated"
        );
        Ok(RefreshOutcome::Applied(catalog))
    }

    /// `begin_refresh` followed by `complete_refresh`.
    pub async fn refresh<F>(&self, on_progress: F) -> SessionResult<RefreshOutcome>
    where
        F: FnMut(Progress),
    {
        let pending = self.begin_refresh()?;
        self.complete_refresh(pending, on_progress).await
    }

    /// The catalog from the most recent applied refresh.
    pub fn catalog(&self) -> Option<Arc<Catalog>> {
        self.catalog.read().clone()
    }

    fn require_catalog(&self) -> SessionResult<Arc<Catalog>> {
        self.catalog().ok_or(SessionError::NoCatalog)
    }

    /// Files whose name contains `query`, case-insensitively.
    pub fn search(&self, query: &str) -> SessionResult<Vec<FileEntry>> {
        let catalog = self.require_catalog()?;
        Ok(catalog.search(query).into_iter().cloned().collect())
    }

    /// Select the file at `path` for download.
    pub fn select(&self, path: &str) -> SessionResult<FileEntry> {
        let catalog = self.require_catalog()?;
        let entry = catalog
            .find_file(path)
            .cloned()
            .ok_or_else(|| SessionError::FileNotFound(path.to_string()))?;
        debug!(path = %entry.path, "selected file");
        *self.selected.write() = Some(entry.clone());
        Ok(entry)
    }

    pub fn selected(&self) -> Option<FileEntry> {
        self.selected.read().clone()
    }

    pub fn clear_selection(&self) {
        *self.selected.write() = None;
    }

    /// Download URL of the selected file on the current source.
    pub fn selected_url(&self) -> SessionResult<String> {
        let entry = self.selected().ok_or(SessionError::NoSelection)?;
        let source = self.current_source();
        source
            .file_url(&entry)
            .map(str::to_string)
            .ok_or_else(|| {
                DownloadError::NotOffered {
                    file: entry.path.clone(),
                    source_id: source.id.clone(),
                }
                .into()
            })
    }

    /// Start downloading the selected file to `dest`.
    pub fn begin_download(&self, dest: &Path) -> SessionResult<TransferHandle<PathBuf>> {
        let url = self.selected_url()?;
        let handle = self.coordinator.begin_file(&url, dest)?;
        info!(url = %url, dest = %dest.display(), "download started");
        Ok(handle)
    }

    /// Start downloading the selected file into `dir` under its own
    /// (sanitized) name.
    pub fn begin_quick_download(&self, dir: &Path) -> SessionResult<TransferHandle<PathBuf>> {
        let entry = self.selected().ok_or(SessionError::NoSelection)?;
        self.begin_download(&dir.join(sanitize_filename(&entry.name)))
    }

    /// Wait for a download and remember where it was saved.
    pub async fn complete_download<F>(&self, handle: TransferHandle<PathBuf>, on_progress: F) -> SessionResult<PathBuf>
    where
        F: FnMut(Progress),
    {
        let path = handle.wait_with(on_progress).await?;
        *self.last_download.write() = Some(path.clone());
        Ok(path)
    }

    /// Where the last successful download was saved.
    pub fn last_download(&self) -> Option<PathBuf> {
        self.last_download.read().clone()
    }

    // A refreshed catalog holds new FileEntry values; keep the selection
    // pointing at the same path if it still exists.
    fn reselect(&self, catalog: &Catalog) {
        let mut selected = self.selected.write();
        if let Some(entry) = selected.as_ref() {
            *selected = catalog.find_file(&entry.path).cloned();
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("current_source", &*self.current_source.read())
            .field("has_catalog", &self.catalog.read().is_some())
            .field("selected", &self.selected.read().as_ref().map(|e| e.path.clone()))
            .field("coordinator", &self.coordinator)
            .finish()
    }
}
