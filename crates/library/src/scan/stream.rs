use crate::error::{Error as LibraryError, ErrorKind as LibraryErrorKind};
use crate::scan::Scan;
use crate::scan::file::scan_file_inner;
use async_stream::stream;
use exn::ResultExt;
use futures::{Stream, StreamExt};
use std::path::{Path, PathBuf};
use subclipper_cache::Repository;
use subclipper_extract::SubtitleSource;
use subclipper_storage::{BackendHandle, FileInfo};

/// Everything that happens during a scan, in order.
///
/// A scan always starts with [`Started`](Self::Started), then reports the
/// number of files discovered, then exactly one [`Scanned`](Self::Scanned) or
/// [`Failed`](Self::Failed) per discovered file, and always ends with
/// [`Complete`](Self::Complete).
#[derive(Debug)]
pub enum ScanEvent {
    Started,
    DiscoveryComplete(u64),
    Scanned(Box<Scan>),
    /// The file could not be scanned. Failures never end the scan.
    Failed { file: FileInfo, error: LibraryError },
    Complete,
}
impl ScanEvent {
    /// Whether this event accounts for one discovered file.
    pub fn is_file(&self) -> bool {
        matches!(self, Self::Scanned(_) | Self::Failed { .. })
    }
}

/// Scan every regular file beneath `prefix` (or the whole library).
///
/// Discovery finishes before the first file is scanned so that the number of
/// files is known up front. Files are then scanned one at a time in discovery
/// order; no file is ever held across more than its own cache lookup,
/// extraction and write.
pub fn scan<'a>(
    backend: &'a BackendHandle,
    cache: &'a Repository,
    source: &'a dyn SubtitleSource,
    prefix: Option<impl AsRef<Path>>,
) -> impl Stream<Item = ScanEvent> + Send + 'a {
    let prefix = prefix.map(|p| p.as_ref().to_path_buf());
    stream! {
        yield ScanEvent::Started;
        let files = discover(backend, prefix).await;
        yield ScanEvent::DiscoveryComplete(files.len() as u64);
        for file in files {
            match scan_file_inner(backend, cache, source, &file).await {
                Ok(scan) => yield ScanEvent::Scanned(Box::new(scan)),
                Err(error) => {
                    let error = error.raise(LibraryErrorKind::Scan);
                    yield ScanEvent::Failed { file, error };
                },
            }
        }
        yield ScanEvent::Complete;
    }
}

async fn discover(backend: &BackendHandle, prefix: Option<PathBuf>) -> Vec<FileInfo> {
    let mut files = Vec::new();
    let mut listing = backend.list_stream(prefix.as_deref());
    while let Some(entry) = listing.next().await {
        match entry {
            Ok(file) => files.push(file),
            // An unreadable entry cannot be counted, let alone scanned.
            Err(error) => tracing::warn!(backend = backend.name(), ?error, "Skipping unreadable library entry"),
        }
    }
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::ScanEffort;
    use crate::testing::{Library, StubSource};
    use subclipper_extract::models::Event;

    async fn collect(library: &Library, source: &StubSource, prefix: Option<&str>) -> Vec<ScanEvent> {
        scan(&library.backend, &library.cache, source, prefix).collect().await
    }

    #[tokio::test]
    async fn test_empty_library() {
        let library = Library::new(&[]).await;
        let events = collect(&library, &StubSource::default(), None).await;
        assert!(matches!(
            events.as_slice(),
            [ScanEvent::Started, ScanEvent::DiscoveryComplete(0), ScanEvent::Complete]
        ));
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_the_scan() {
        let source = StubSource::default().with("b.mkv", vec![Event::new(0.0, 1000.0, "hello")]);
        let library = Library::new(&["a.mkv", "b.mkv", "c.mkv"]).await;
        let events = collect(&library, &source, None).await;

        assert!(matches!(events.first(), Some(ScanEvent::Started)));
        assert!(matches!(events.get(1), Some(ScanEvent::DiscoveryComplete(3))));
        assert!(matches!(events.last(), Some(ScanEvent::Complete)));
        assert_eq!(events.iter().filter(|e| e.is_file()).count(), 3);

        let failed: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                ScanEvent::Failed { file, .. } => Some(file.id()),
                _ => None,
            })
            .collect();
        assert_eq!(failed.len(), 2);
        assert!(failed.contains(&"a.mkv".to_string()) && failed.contains(&"c.mkv".to_string()));
        assert!(library.cache.has("b.mkv").await.unwrap());
    }

    #[tokio::test]
    async fn test_cached_files_are_skipped() {
        let source = StubSource::default()
            .with("ep1.mkv", vec![Event::new(0.0, 1000.0, "one")])
            .with("ep2.mkv", vec![Event::new(0.0, 1000.0, "two")]);
        let library = Library::new(&["show/ep1.mkv", "show/ep2.mkv"]).await;
        collect(&library, &source, None).await;
        assert_eq!(source.calls(), 2);

        let events = collect(&library, &source, None).await;
        assert_eq!(source.calls(), 2, "cached files must not be extracted again");
        assert!(events.iter().all(|e| match e {
            ScanEvent::Scanned(scan) => scan.effort == ScanEffort::Cached,
            other => !other.is_file(),
        }));
    }

    #[tokio::test]
    async fn test_prefix_limits_the_scan() {
        let source = StubSource::default()
            .with("ep1.mkv", vec![Event::new(0.0, 1000.0, "one")])
            .with("movie.mp4", vec![Event::new(0.0, 1000.0, "two")]);
        let library = Library::new(&["show/ep1.mkv", "movie.mp4"]).await;
        let events = collect(&library, &source, Some("show")).await;
        assert!(matches!(events.get(1), Some(ScanEvent::DiscoveryComplete(1))));
        assert!(library.cache.has("show/ep1.mkv").await.unwrap());
        assert!(!library.cache.has("movie.mp4").await.unwrap());
    }
}
