//! The background library scanner.
//!
//! Exactly one [`Scanner`] is constructed per process (by the composition
//! root) and shared by handle. It walks the library once, extracts every file
//! that is not cached yet, and publishes progress through its
//! [`ProgressHub`] after every file.

use crate::progress::{Progress, ProgressHub};
use crate::scan::{ScanEffort, ScanEvent, scan};
use futures::{Stream, StreamExt};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::Path;
use std::pin::pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use subclipper_cache::Repository;
use subclipper_extract::SourceHandle;
use subclipper_storage::BackendHandle;
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::instrument;

/// Where the scanner is in its (single) run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    NotStarted,
    Walking,
    Extracting { handled: u64, total: u64 },
    Complete,
}
impl ScanState {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}
impl Display for ScanState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::NotStarted => write!(f, "not started"),
            Self::Walking => write!(f, "discovering files"),
            Self::Extracting { handled, total } => write!(f, "scanned {handled}/{total} files"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

/// Summary of a finished scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub total: u64,
    pub cached: u64,
    pub processed: u64,
    pub failed: u64,
}
impl ScanSummary {
    pub fn handled(&self) -> u64 {
        self.cached + self.processed + self.failed
    }
}

pub type ScannerHandle = Arc<Scanner>;

pub struct Scanner {
    backend: BackendHandle,
    cache: Repository,
    source: SourceHandle,
    progress: ProgressHub,
    state: watch::Sender<ScanState>,
    started: AtomicBool,
    task: Mutex<Option<AbortHandle>>,
}
impl Scanner {
    pub fn new(backend: BackendHandle, cache: Repository, source: SourceHandle) -> Self {
        Self {
            backend,
            cache,
            source,
            progress: ProgressHub::new(),
            state: watch::Sender::new(ScanState::NotStarted),
            started: AtomicBool::new(false),
            task: Mutex::new(None),
        }
    }

    /// Convenience constructor for the shared handle.
    pub fn handle(backend: BackendHandle, cache: Repository, source: SourceHandle) -> ScannerHandle {
        Arc::new(Self::new(backend, cache, source))
    }

    pub fn state(&self) -> ScanState {
        *self.state.borrow()
    }

    pub fn progress(&self) -> Progress {
        self.progress.latest()
    }

    /// See [`ProgressHub::subscribe`].
    pub fn subscribe(&self) -> impl Stream<Item = Progress> + Send + 'static {
        self.progress.subscribe()
    }

    /// Start the scan on a background task.
    ///
    /// Only the first call on a scanner starts anything; later calls return
    /// `None`. Must be called from within a Tokio runtime.
    pub fn start(self: &Arc<Self>) -> Option<JoinHandle<ScanSummary>> {
        if self.started.swap(true, Ordering::SeqCst) {
            tracing::debug!("Library scan already started; ignoring");
            return None;
        }
        let scanner = Arc::clone(self);
        // Owned by the task's future, so it is dropped even if the task is
        // aborted before it first runs.
        let finish = Finish(Arc::clone(self));
        let task = tokio::spawn(async move {
            let _finish = finish;
            scanner.run().await
        });
        *self.task.lock().unwrap_or_else(PoisonError::into_inner) = Some(task.abort_handle());
        Some(task)
    }

    /// Abort a running scan and wait until it has let go of the cache. Files
    /// that were already extracted stay cached. Does nothing if the scan was
    /// never started.
    pub async fn stop(&self) {
        let task = self.task.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(task) = task {
            if !self.state().is_complete() {
                tracing::debug!("Stopping the library scan");
            }
            task.abort();
            self.wait().await;
        }
    }

    /// Start the scan (if not already started) and wait for it to finish.
    pub async fn run_to_completion(self: &Arc<Self>) -> ScanSummary {
        match self.start() {
            Some(task) => match task.await {
                Ok(summary) => summary,
                Err(error) => {
                    tracing::error!(%error, "Library scan task did not finish");
                    ScanSummary::default()
                },
            },
            None => {
                self.wait().await;
                ScanSummary::default()
            },
        }
    }

    /// Wait until the scan is complete. Returns immediately if it already is.
    pub async fn wait(&self) {
        let mut state = self.state.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        _ = state.wait_for(ScanState::is_complete).await;
    }

    #[instrument(skip(self), fields(backend = self.backend.name(), source = self.source.name()))]
    async fn run(&self) -> ScanSummary {
        tracing::info!("Started scanning the library");
        let mut summary = ScanSummary::default();
        let mut events = pin!(scan(&self.backend, &self.cache, self.source.as_ref(), None::<&Path>));
        while let Some(event) = events.next().await {
            match event {
                ScanEvent::Started => {
                    self.state.send_replace(ScanState::Walking);
                },
                ScanEvent::DiscoveryComplete(total) => {
                    tracing::info!(files = total, "Library discovery complete");
                    summary.total = total;
                    self.state.send_replace(ScanState::Extracting { handled: 0, total });
                    // Nothing will ever be handled, so there is nothing to wait for.
                    self.progress.publish(if total == 0 { 1.0 } else { 0.0 });
                },
                ScanEvent::Scanned(scan) => {
                    match scan.effort {
                        ScanEffort::Cached => {
                            summary.cached += 1;
                            tracing::info!(file = %scan.video_id, "{}/{}: Skipping file already present in the cache", summary.handled(), summary.total);
                        },
                        ScanEffort::Processed => {
                            summary.processed += 1;
                            tracing::info!(file = %scan.video_id, records = scan.records, "{}/{}: Scanned file", summary.handled(), summary.total);
                        },
                    }
                    self.handled(&summary);
                },
                ScanEvent::Failed { file, error } => {
                    summary.failed += 1;
                    tracing::warn!(file = %file.path.display(), ?error, "{}/{}: Failed to scan file", summary.handled(), summary.total);
                    self.handled(&summary);
                },
                ScanEvent::Complete => {
                    tracing::info!(
                        cached = summary.cached,
                        processed = summary.processed,
                        failed = summary.failed,
                        "Library scan complete"
                    );
                    self.state.send_replace(ScanState::Complete);
                },
            }
        }
        summary
    }

    /// Mark the scan complete if it stopped without getting there.
    fn finish(&self) {
        if self.state().is_complete() {
            return;
        }
        tracing::warn!(state = %self.state(), "Library scan stopped before completing");
        self.state.send_replace(ScanState::Complete);
        self.progress.publish(1.0);
    }

    fn handled(&self, summary: &ScanSummary) {
        let handled = summary.handled();
        self.state.send_replace(ScanState::Extracting { handled, total: summary.total });
        self.progress.publish(handled as f64 / summary.total as f64);
    }
}

/// Runs [`Scanner::finish`] however the scan task ends: normally, by panic,
/// or by being aborted.
struct Finish(ScannerHandle);
impl Drop for Finish {
    fn drop(&mut self) {
        self.0.finish();
    }
}
