//! Single-flight transfer coordination.
//!
//! The coordinator owns two independent slots, one for the manifest and one
//! for file downloads. Beginning a transfer claims the target's slot, spawns
//! a background task and returns a [`TransferHandle`] that yields the
//! transfer's events:
//!
//! ```text
//! begin_*() ──► claim slot ──► spawn worker ──► Progress, Progress, ... Finished
//!                   │                                                  │
//!                   └─ AlreadyInFlight if busy        slot Idle again ◄┘
//! ```
//!
//! The slot is released before the `Finished` event is sent, so a caller that
//! has seen the terminal event can immediately begin the next transfer.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{debug, info, warn, Instrument};

use super::error::{DownloadError, DownloadResult};
use super::http::HttpTransport;
use super::persist::AtomicFile;
use super::progress::{Progress, ProgressTracker};
use super::state::{Slot, SlotOutcome};
use crate::manifest::{Manifest, ManifestError};

/// Default capacity of a transfer's event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// The logical target of a transfer. Each target has its own slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Manifest,
    File,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Manifest => write!(f, "manifest"),
            Target::File => write!(f, "file"),
        }
    }
}

/// An event emitted by a running transfer.
#[derive(Debug)]
pub enum TransferEvent<T> {
    /// Bytes arrived. Successive values never go backwards.
    Progress(Progress),
    /// The transfer ended. Always the last event, sent exactly once.
    Finished(DownloadResult<T>),
}

/// Receiving end of a transfer's event stream.
#[derive(Debug)]
pub struct TransferHandle<T> {
    target: Target,
    url: String,
    events: mpsc::Receiver<TransferEvent<T>>,
}

impl<T> TransferHandle<T> {
    pub fn target(&self) -> Target {
        self.target
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Next event, or `None` once the terminal event has been taken.
    pub async fn next_event(&mut self) -> Option<TransferEvent<T>> {
        self.events.recv().await
    }

    /// Wait for the transfer to finish, discarding progress.
    pub async fn wait(self) -> DownloadResult<T> {
        self.wait_with(|_| {}).await
    }

    /// Wait for the transfer to finish, passing each progress value to
    /// `on_progress`.
    pub async fn wait_with<F>(mut self, mut on_progress: F) -> DownloadResult<T>
    where
        F: FnMut(Progress),
    {
        while let Some(event) = self.events.recv().await {
            match event {
                TransferEvent::Progress(progress) => on_progress(progress),
                TransferEvent::Finished(result) => return result,
            }
        }
        Err(DownloadError::Interrupted(self.target))
    }
}

/// Worker-side sender for progress events.
///
/// Progress is best-effort: if the consumer falls behind, intermediate values
/// are skipped rather than stalling the transfer. Ordering is preserved.
struct ProgressSink<T> {
    tx: mpsc::Sender<TransferEvent<T>>,
}

impl<T> ProgressSink<T> {
    fn emit(&self, progress: Progress) {
        if let Err(mpsc::error::TrySendError::Full(_)) =
            self.tx.try_send(TransferEvent::Progress(progress))
        {
            debug!(received = progress.received(), "progress consumer lagging, skipped update");
        }
    }
}

/// Coordinates manifest and file transfers over a shared transport.
#[derive(Clone)]
pub struct DownloadCoordinator {
    transport: Arc<dyn HttpTransport>,
    manifest_slot: Slot,
    file_slot: Slot,
    event_capacity: usize,
}

impl fmt::Debug for DownloadCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadCoordinator")
            .field("manifest_slot", &self.manifest_slot.state())
            .field("file_slot", &self.file_slot.state())
            .field("event_capacity", &self.event_capacity)
            .finish()
    }
}

impl DownloadCoordinator {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            manifest_slot: Slot::new(),
            file_slot: Slot::new(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Set the per-transfer event channel capacity (minimum 1).
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    /// The slot gating `target`.
    pub fn slot(&self, target: Target) -> &Slot {
        match target {
            Target::Manifest => &self.manifest_slot,
            Target::File => &self.file_slot,
        }
    }

    pub fn is_in_flight(&self, target: Target) -> bool {
        !self.slot(target).is_idle()
    }

    /// Fetch and parse a manifest in the background.
    ///
    /// The body is held in memory, decoded as UTF-8 and parsed; nothing is
    /// written to disk. Must be called from within a Tokio runtime.
    pub fn begin_manifest(&self, url: &str) -> DownloadResult<TransferHandle<Manifest>> {
        self.spawn(Target::Manifest, url, |transport, url, sink| async move {
            fetch_manifest(transport.as_ref(), &url, &sink).await
        })
    }

    /// Download a file to `dest` in the background.
    ///
    /// Missing parent directories are created. The file only appears at
    /// `dest` once the whole body has been received. Must be called from
    /// within a Tokio runtime.
    pub fn begin_file(&self, url: &str, dest: &Path) -> DownloadResult<TransferHandle<PathBuf>> {
        let dest = dest.to_path_buf();
        self.spawn(Target::File, url, move |transport, url, sink| async move {
            fetch_file(transport.as_ref(), &url, &dest, &sink).await
        })
    }

    fn spawn<T, F, Fut>(&self, target: Target, url: &str, work: F) -> DownloadResult<TransferHandle<T>>
    where
        T: Send + 'static,
        F: FnOnce(Arc<dyn HttpTransport>, String, ProgressSink<T>) -> Fut,
        Fut: Future<Output = DownloadResult<T>> + Send + 'static,
    {
        let guard = self
            .slot(target)
            .try_claim()
            .ok_or(DownloadError::AlreadyInFlight(target))?;

        let (tx, rx) = mpsc::channel(self.event_capacity);
        let sink = ProgressSink { tx: tx.clone() };
        let job = work(Arc::clone(&self.transport), url.to_string(), sink);
        let span = tracing::info_span!("transfer", %target, url = %url);

        tokio::spawn(
            async move {
                let started = Instant::now();
                let result = job.await;
                let elapsed_ms = started.elapsed().as_millis() as u64;

                let outcome = match &result {
                    Ok(_) => {
                        info!(elapsed_ms, "transfer succeeded");
                        SlotOutcome::Succeeded
                    }
                    Err(err) => {
                        warn!(elapsed_ms, error = %err, "transfer failed");
                        SlotOutcome::Failed
                    }
                };

                guard.finish(outcome);
                if tx.send(TransferEvent::Finished(result)).await.is_err() {
                    debug!("transfer handle dropped before completion");
                }
            }
            .instrument(span),
        );

        debug!(%target, url = %url, "transfer started");

        Ok(TransferHandle {
            target,
            url: url.to_string(),
            events: rx,
        })
    }
}

async fn fetch_manifest(
    transport: &dyn HttpTransport,
    url: &str,
    sink: &ProgressSink<Manifest>,
) -> DownloadResult<Manifest> {
    let mut body = transport.open(url).await?;
    let mut tracker = ProgressTracker::new(body.content_length());
    let capacity = tracker.total().unwrap_or(0).min(16 * 1024 * 1024) as usize;
    let mut buffer = Vec::with_capacity(capacity);

    while let Some(chunk) = body.next_chunk().await? {
        buffer.extend_from_slice(&chunk);
        sink.emit(tracker.advance(chunk.len()));
    }

    let text = String::from_utf8(buffer)
        .map_err(|e| ManifestError::Malformed(format!("manifest is not valid UTF-8: {}", e)))?;
    let manifest = Manifest::parse_str(text.trim_start_matches('\u{feff}'))?;

    debug!(
        dirs = manifest.dirs.len(),
        files = manifest.file_count(),
        bytes = tracker.received(),
        "parsed manifest"
    );
    Ok(manifest)
}

async fn fetch_file(
    transport: &dyn HttpTransport,
    url: &str,
    dest: &Path,
    sink: &ProgressSink<PathBuf>,
) -> DownloadResult<PathBuf> {
    let mut body = transport.open(url).await?;
    let mut tracker = ProgressTracker::new(body.content_length());
    let mut file = AtomicFile::create(dest)?;

    while let Some(chunk) = body.next_chunk().await? {
        file.write_chunk(&chunk)?;
        sink.emit(tracker.advance(chunk.len()));
    }

    let bytes = file.written();
    let path = file.commit()?;
    info!(dest = %path.display(), bytes, "saved download");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;

    use tokio::sync::Notify;

    use super::*;
    use crate::download::http::mock::{MockRoute, MockTransport};

    const MANIFEST: &str = r#"{"dirs": [{"path": "a/b", "name": "b",
        "files": [{"name": "x.pdf", "path": "a/b/x.pdf", "size": 2097152, "cf_url": "http://cf/x.pdf"}]}],
        "files": []}"#;

    fn coordinator(transport: &Arc<MockTransport>) -> DownloadCoordinator {
        DownloadCoordinator::new(Arc::clone(transport) as Arc<dyn HttpTransport>)
    }

    async fn collect<T>(mut handle: TransferHandle<T>) -> (Vec<Progress>, DownloadResult<T>) {
        let mut progress = Vec::new();
        let mut result = None;
        while let Some(event) = handle.next_event().await {
            assert!(result.is_none(), "event after terminal event");
            match event {
                TransferEvent::Progress(p) => progress.push(p),
                TransferEvent::Finished(r) => result = Some(r),
            }
        }
        (progress, result.expect("terminal event"))
    }

    #[tokio::test]
    async fn test_manifest_fetch_parses_body() {
        let transport = Arc::new(MockTransport::new());
        transport.route(
            "http://m/manifest.json",
            MockRoute::split(MANIFEST.as_bytes(), 3).with_content_length(),
        );
        let coordinator = coordinator(&transport);

        let handle = coordinator.begin_manifest("http://m/manifest.json").unwrap();
        assert_eq!(handle.target(), Target::Manifest);
        let (progress, result) = collect(handle).await;

        let manifest = result.unwrap();
        assert_eq!(manifest.dirs[0].files[0].size, 2_097_152);
        assert_eq!(progress.len(), 3);
        assert_eq!(progress.last().unwrap().ratio(), Some(1.0));
        assert!(coordinator.slot(Target::Manifest).is_idle());
    }

    #[tokio::test]
    async fn test_malformed_manifest_frees_slot() {
        let transport = Arc::new(MockTransport::new());
        transport.route("http://m/bad.json", MockRoute::body(b"<html>oops</html>"));
        let coordinator = coordinator(&transport);

        let err = coordinator.begin_manifest("http://m/bad.json").unwrap().wait().await.unwrap_err();
        assert!(matches!(err, DownloadError::MalformedManifest(_)));
        assert!(coordinator.slot(Target::Manifest).is_idle());
        assert_eq!(
            coordinator.slot(Target::Manifest).last_outcome(),
            Some(SlotOutcome::Failed)
        );
    }

    #[tokio::test]
    async fn test_manifest_with_invalid_utf8_is_malformed() {
        let transport = Arc::new(MockTransport::new());
        transport.route("http://m/bin", MockRoute::body(&[0xff, 0xfe, 0x00]));
        let coordinator = coordinator(&transport);

        let err = coordinator.begin_manifest("http://m/bin").unwrap().wait().await.unwrap_err();
        assert!(matches!(err, DownloadError::MalformedManifest(_)));
    }

    #[tokio::test]
    async fn test_manifest_with_byte_order_mark() {
        let transport = Arc::new(MockTransport::new());
        let mut body = "\u{feff}".as_bytes().to_vec();
        body.extend_from_slice(MANIFEST.as_bytes());
        transport.route("http://m/bom.json", MockRoute::body(&body));
        let coordinator = coordinator(&transport);

        assert!(coordinator.begin_manifest("http://m/bom.json").unwrap().wait().await.is_ok());
    }

    #[tokio::test]
    async fn test_file_download_writes_destination() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("saved/x.pdf");
        let payload = vec![7u8; 10_000];

        let transport = Arc::new(MockTransport::new());
        transport.route("http://f/x.pdf", MockRoute::split(&payload, 7).with_content_length());
        let coordinator = coordinator(&transport);

        let handle = coordinator.begin_file("http://f/x.pdf", &dest).unwrap();
        let (progress, result) = collect(handle).await;

        assert_eq!(result.unwrap(), dest);
        assert_eq!(fs::read(&dest).unwrap(), payload);
        let ratios: Vec<f64> = progress.iter().filter_map(Progress::ratio).collect();
        assert_eq!(ratios.len(), progress.len());
        assert!(ratios.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(progress.last().unwrap().received(), 10_000);
    }

    #[tokio::test]
    async fn test_unknown_length_reports_indeterminate_progress() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(MockTransport::new());
        transport.route("http://f/stream", MockRoute::split(b"abcdefgh", 4));
        let coordinator = coordinator(&transport);

        let handle = coordinator.begin_file("http://f/stream", &dir.path().join("s")).unwrap();
        let (progress, result) = collect(handle).await;

        assert!(result.is_ok());
        assert!(progress.iter().all(|p| p.ratio().is_none()));
        let received: Vec<u64> = progress.iter().map(Progress::received).collect();
        assert_eq!(received, vec![2, 4, 6, 8]);
    }

    #[tokio::test]
    async fn test_remote_error_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("never/x.pdf");
        let transport = Arc::new(MockTransport::new());
        transport.route("http://f/missing", MockRoute::status(404));
        let coordinator = coordinator(&transport);

        let err = coordinator.begin_file("http://f/missing", &dest).unwrap().wait().await.unwrap_err();
        assert!(matches!(err, DownloadError::RemoteError { status_code: 404, .. }));
        assert!(!dest.exists());
        assert!(!dir.path().join("never").exists());
        assert!(coordinator.slot(Target::File).is_idle());
    }

    #[tokio::test]
    async fn test_interrupted_stream_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("x.pdf");
        let transport = Arc::new(MockTransport::new());
        transport.route(
            "http://f/flaky",
            MockRoute::split(&[1u8; 4096], 4).with_content_length().failing_after(2),
        );
        let coordinator = coordinator(&transport);

        let err = coordinator.begin_file("http://f/flaky", &dest).unwrap().wait().await.unwrap_err();
        assert!(matches!(err, DownloadError::NetworkFailure { .. }));
        assert!(!dest.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_second_file_download_is_refused_while_first_runs() {
        let dir = tempfile::tempdir().unwrap();
        let gate = Arc::new(Notify::new());
        let transport = Arc::new(MockTransport::new());
        transport.route("http://f/one", MockRoute::body(b"one").gated(Arc::clone(&gate)));
        transport.route("http://f/two", MockRoute::body(b"two"));
        let coordinator = coordinator(&transport);

        let first = coordinator.begin_file("http://f/one", &dir.path().join("one")).unwrap();
        let second = coordinator.begin_file("http://f/two", &dir.path().join("two"));
        assert!(matches!(second, Err(DownloadError::AlreadyInFlight(Target::File))));

        gate.notify_one();
        first.wait().await.unwrap();
        assert!(!transport.opened().contains(&"http://f/two".to_string()));

        let third = coordinator.begin_file("http://f/two", &dir.path().join("two")).unwrap();
        third.wait().await.unwrap();
        assert_eq!(fs::read(dir.path().join("two")).unwrap(), b"two");
    }

    #[tokio::test]
    async fn test_manifest_and_file_slots_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let gate = Arc::new(Notify::new());
        let transport = Arc::new(MockTransport::new());
        transport.route("http://m/slow.json", MockRoute::body(MANIFEST.as_bytes()).gated(Arc::clone(&gate)));
        transport.route("http://f/x.pdf", MockRoute::body(b"pdf"));
        let coordinator = coordinator(&transport);

        let manifest = coordinator.begin_manifest("http://m/slow.json").unwrap();
        assert!(coordinator.is_in_flight(Target::Manifest));

        let file = coordinator.begin_file("http://f/x.pdf", &dir.path().join("x.pdf")).unwrap();
        file.wait().await.unwrap();
        assert!(coordinator.is_in_flight(Target::Manifest));

        gate.notify_one();
        manifest.wait().await.unwrap();
        assert!(!coordinator.is_in_flight(Target::Manifest));
    }

    #[tokio::test]
    async fn test_dropped_handle_still_releases_slot() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(MockTransport::new());
        transport.route("http://f/x", MockRoute::split(&[0u8; 512], 8));
        let coordinator = coordinator(&transport);

        drop(coordinator.begin_file("http://f/x", &dir.path().join("x")).unwrap());

        for _ in 0..100 {
            if coordinator.slot(Target::File).completed() == 1 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(coordinator.slot(Target::File).is_idle());
        assert_eq!(coordinator.slot(Target::File).completed(), 1);
    }

    #[tokio::test]
    async fn test_small_event_capacity_still_delivers_terminal_event() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(MockTransport::new());
        transport.route("http://f/big", MockRoute::split(&[9u8; 4096], 64).with_content_length());
        let coordinator = coordinator(&transport).with_event_capacity(1);

        let handle = coordinator.begin_file("http://f/big", &dir.path().join("big")).unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let (progress, result) = collect(handle).await;

        assert!(result.is_ok());
        assert!(progress.len() <= 64);
        assert_eq!(fs::read(dir.path().join("big")).unwrap().len(), 4096);
    }
}
