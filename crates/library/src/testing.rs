//! Fixtures shared by the tests of this crate.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use subclipper_cache::{Database, Repository};
use subclipper_extract::error::{ErrorKind as ExtractErrorKind, Result as ExtractResult};
use subclipper_extract::models::Event;
use subclipper_extract::{SourceHandle, SubtitleSource};
use subclipper_storage::BackendHandle;
use subclipper_storage::backend::LocalBackend;
use tempfile::TempDir;

/// Subtitle source that answers by file name and counts how often it is
/// asked. Files it has no answer for fail to extract.
#[derive(Clone, Default)]
pub(crate) struct StubSource {
    answers: Arc<HashMap<String, Vec<Event>>>,
    calls: Arc<AtomicUsize>,
    delay: Option<Duration>,
    panics_on: Option<String>,
}
impl StubSource {
    pub(crate) fn with(mut self, file_name: &str, events: Vec<Event>) -> Self {
        Arc::make_mut(&mut self.answers).insert(file_name.to_string(), events);
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Panic instead of answering for `file_name`.
    pub(crate) fn panicking_on(mut self, file_name: &str) -> Self {
        self.panics_on = Some(file_name.to_string());
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn handle(&self) -> SourceHandle {
        Arc::new(self.clone())
    }
}

#[async_trait]
impl SubtitleSource for StubSource {
    fn name(&self) -> &str {
        "stub"
    }

    async fn events(&self, path: &Path) -> ExtractResult<Vec<Event>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if self.panics_on.as_deref() == Some(name) {
            panic!("extraction of {name} blew up");
        }
        match self.answers.get(name) {
            Some(events) => Ok(events.clone()),
            None => exn::bail!(ExtractErrorKind::Failed {
                file: path.to_path_buf(),
                reason: "no subtitle stream".to_string(),
            }),
        }
    }
}

/// A temporary media library on disk, backed by an in-memory cache.
pub(crate) struct Library {
    pub(crate) _dir: TempDir,
    pub(crate) backend: BackendHandle,
    pub(crate) db: Database,
    pub(crate) cache: Repository,
}
impl Library {
    pub(crate) async fn new(files: &[&str]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        for file in files {
            let path = dir.path().join(file);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, b"not really a video").unwrap();
        }
        let backend: BackendHandle = Arc::new(LocalBackend::new("test", dir.path()).unwrap());
        let db = Database::connect_in_memory().await.unwrap();
        let cache = Repository::from(&db);
        Self { _dir: dir, backend, db, cache }
    }
}
