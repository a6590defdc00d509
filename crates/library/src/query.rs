//! Read-only façade over the cache, the media library and the scanner.
//!
//! Nothing here waits for the scan: results reflect whatever has been cached
//! so far, and "no results" is always an empty page or `None`, never an error.

use crate::error::{ErrorKind, Result};
use crate::progress::Progress;
use crate::scanner::ScannerHandle;
use exn::ResultExt;
use futures::Stream;
use std::path::Path;
use subclipper_cache::Repository;
use subclipper_extract::models::Subtitle;
use subclipper_storage::error::ErrorKind as StorageErrorKind;
use subclipper_storage::{BackendHandle, TreeNode};
use tracing::instrument;

/// One page of search results.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Zero-based page index that was requested.
    pub index: usize,
    /// Maximum number of items per page.
    pub length: usize,
    /// Number of matching subtitles across all pages.
    pub total: usize,
    pub items: Vec<Subtitle>,
}
impl Page {
    pub fn page_count(&self) -> usize {
        self.total.div_ceil(self.length)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Strip the root spellings (`.`, `/`, `./`) off the front of a search
/// prefix. Anything after them is kept as given: a trailing slash or a
/// partial file name changes what the prefix matches.
fn search_prefix(prefix: &str) -> &str {
    let mut prefix = prefix;
    loop {
        if prefix == "." {
            return "";
        }
        match prefix.strip_prefix("./").or_else(|| prefix.strip_prefix('/')) {
            Some(rest) => prefix = rest,
            None => return prefix,
        }
    }
}

#[derive(Clone)]
pub struct QueryService {
    backend: BackendHandle,
    cache: Repository,
    scanner: ScannerHandle,
    default_page_length: usize,
}
impl QueryService {
    pub fn new(backend: BackendHandle, cache: Repository, scanner: ScannerHandle, default_page_length: usize) -> Self {
        Self {
            backend,
            cache,
            scanner,
            default_page_length: default_page_length.max(1),
        }
    }

    pub fn default_page_length(&self) -> usize {
        self.default_page_length
    }

    fn page_length(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.default_page_length).max(1)
    }

    /// Directory tree beneath `subpath` (empty for the library root), read
    /// straight from the file system. `None` if the subpath does not exist.
    #[instrument(skip(self))]
    pub async fn list_path(&self, subpath: &str) -> Result<Option<TreeNode>> {
        match self.backend.tree(Path::new(subpath)).await {
            Ok(tree) => Ok(Some(tree)),
            Err(err) if matches!(&*err, StorageErrorKind::NotFound(_)) => Ok(None),
            Err(err) => Err(err.raise(ErrorKind::Storage)),
        }
    }

    /// Every subtitle matching the filters, in display order: by video, then
    /// by start time.
    async fn matching(&self, prefix: &str, text: &str) -> Result<Vec<Subtitle>> {
        let mut subtitles = self
            .cache
            .find_by_prefix_and_text(search_prefix(prefix), text)
            .await
            .or_raise(|| ErrorKind::Cache)?;
        subtitles.sort_by(Subtitle::display_cmp);
        Ok(subtitles)
    }

    /// Search subtitles of videos beneath `prefix` whose text contains
    /// `text`, and return page `page` (zero-based) of the ordered results.
    ///
    /// A page past the end is empty, not an error. `page_length` falls back
    /// to the configured default.
    #[instrument(skip(self))]
    pub async fn search(&self, prefix: &str, text: &str, page: usize, page_length: Option<usize>) -> Result<Page> {
        let length = self.page_length(page_length);
        let subtitles = self.matching(prefix, text).await?;
        let total = subtitles.len();
        let items = subtitles
            .chunks(length)
            .nth(page)
            .map(<[Subtitle]>::to_vec)
            .unwrap_or_default();
        Ok(Page { index: page, length, total, items })
    }

    /// Find the page of the unfiltered search that currently holds the
    /// subtitle `id`, so that it can be linked to directly.
    #[instrument(skip(self))]
    pub async fn locate(&self, id: &str, page_length: Option<usize>) -> Result<Option<usize>> {
        let length = self.page_length(page_length);
        let subtitles = self.matching("", "").await?;
        Ok(subtitles.iter().position(|subtitle| subtitle.id == id).map(|position| position / length))
    }

    pub async fn get(&self, id: &str) -> Result<Option<Subtitle>> {
        self.cache.find_by_id(id).await.or_raise(|| ErrorKind::Cache)
    }

    /// Every subtitle of one video, in display order.
    pub async fn video(&self, video_id: &str) -> Result<Vec<Subtitle>> {
        self.cache.list_by_video(video_id).await.or_raise(|| ErrorKind::Cache)
    }

    /// Subscribe to scan progress.
    ///
    /// The library is scanned as a whole, so every path observes the same
    /// library-wide progress. Each call is an independent subscription that
    /// only ends when the returned stream is dropped.
    pub fn subscribe_progress(&self, path: &str) -> impl Stream<Item = Progress> + Send + 'static {
        tracing::debug!(path, "New scan progress subscription");
        self.scanner.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::Scanner;
    use crate::testing::{Library, StubSource};
    use futures::StreamExt;
    use rstest::rstest;
    use std::collections::HashSet;
    use std::pin::pin;
    use subclipper_extract::models::Event;

    fn events(texts: &[&str]) -> Vec<Event> {
        texts
            .iter()
            .enumerate()
            .map(|(i, text)| Event::new(i as f64 * 1000.0, i as f64 * 1000.0 + 900.0, *text))
            .collect()
    }

    /// A scanned library: two shows and a movie, plus one broken file.
    async fn scanned() -> (Library, QueryService) {
        let source = StubSource::default()
            .with("ep1.mkv", events(&["Hello there", "General Kenobi", "You are a bold one"]))
            .with("ep2.mkv", events(&["hello again", "Goodbye"]))
            .with("pilot.mkv", events(&["It begins", "HELLO?", "Anyone?", "Nope"]))
            .with("movie.mp4", events(&["Fin"]));
        let library = Library::new(&[
            "Show/S01/ep1.mkv",
            "Show/S01/ep2.mkv",
            "Other/pilot.mkv",
            "movie.mp4",
            "Show/S01/broken.mkv",
        ])
        .await;
        let scanner = Scanner::handle(library.backend.clone(), library.cache.clone(), source.handle());
        scanner.run_to_completion().await;
        let service = QueryService::new(library.backend.clone(), library.cache.clone(), scanner, 50);
        (library, service)
    }

    #[tokio::test]
    async fn test_search_is_sorted_by_video_then_start() {
        let (_library, service) = scanned().await;
        let page = service.search("", "", 0, None).await.unwrap();
        assert_eq!(page.total, 10);
        assert_eq!(page.page_count(), 1);
        let mut expected = page.items.clone();
        expected.sort_by(Subtitle::display_cmp);
        assert_eq!(page.items, expected);
        assert_eq!(page.items[0].video_id, "Other/pilot.mkv");
        assert_eq!(page.items[0].text, "It begins");
    }

    #[rstest]
    #[case("", "hello", 3)]
    #[case("Show/", "hello", 2)]
    #[case("Show/S01/ep2.mkv", "", 2)]
    #[case("", "zzz", 0)]
    #[case("Nowhere/", "", 0)]
    #[case(".", "hello", 3)]
    #[case("/", "hello", 3)]
    #[case("./Show/", "hello", 2)]
    #[case("/Show/S01/ep2", "", 2)]
    #[case(".//Show", "hello", 2)]
    #[tokio::test]
    async fn test_search_containment(#[case] prefix: &str, #[case] text: &str, #[case] expected: usize) {
        let (_library, service) = scanned().await;
        let page = service.search(prefix, text, 0, None).await.unwrap();
        assert_eq!(page.total, expected);
        assert!(page.items.iter().all(|s| s.video_id.starts_with(search_prefix(prefix))));
        assert!(page.items.iter().all(|s| s.text.to_lowercase().contains(text)));
    }

    #[rstest]
    #[case(1)]
    #[case(3)]
    #[case(4)]
    #[case(10)]
    #[case(11)]
    #[tokio::test]
    async fn test_pagination_is_complete(#[case] length: usize) {
        let (_library, service) = scanned().await;
        let all = service.search("", "", 0, Some(usize::MAX)).await.unwrap().items;
        let mut concatenated = Vec::new();
        let mut page = 0;
        loop {
            let result = service.search("", "", page, Some(length)).await.unwrap();
            if result.is_empty() {
                break;
            }
            assert!(result.items.len() <= length);
            concatenated.extend(result.items);
            page += 1;
        }
        assert_eq!(page, all.len().div_ceil(length));
        assert_eq!(concatenated, all);
        let unique: HashSet<_> = concatenated.iter().map(|s| &s.id).collect();
        assert_eq!(unique.len(), all.len());
    }

    #[tokio::test]
    async fn test_page_out_of_range_is_empty() {
        let (_library, service) = scanned().await;
        let page = service.search("", "", 99, Some(5)).await.unwrap();
        assert!(page.is_empty());
        assert_eq!(page.total, 10);
        assert_eq!(page.page_count(), 2);
    }

    #[rstest]
    #[case(1)]
    #[case(3)]
    #[case(7)]
    #[tokio::test]
    async fn test_locate_agrees_with_search(#[case] length: usize) {
        let (_library, service) = scanned().await;
        let all = service.search("", "", 0, Some(usize::MAX)).await.unwrap().items;
        for subtitle in &all {
            let page = service.locate(&subtitle.id, Some(length)).await.unwrap().unwrap();
            let items = service.search("", "", page, Some(length)).await.unwrap().items;
            assert!(items.iter().any(|s| s.id == subtitle.id));
        }
        assert_eq!(service.locate("missing", Some(length)).await.unwrap(), None);
    }

    #[rstest]
    #[case("", "")]
    #[case(".", "")]
    #[case("/", "")]
    #[case("./", "")]
    #[case("./Show", "Show")]
    #[case("/Show/", "Show/")]
    #[case("Show/ep", "Show/ep")]
    #[case(".hidden/", ".hidden/")]
    fn test_search_prefix(#[case] prefix: &str, #[case] expected: &str) {
        assert_eq!(search_prefix(prefix), expected);
    }

    #[tokio::test]
    async fn test_get() {
        let (_library, service) = scanned().await;
        let first = service.search("Show/S01/ep1.mkv", "Kenobi", 0, None).await.unwrap().items.remove(0);
        assert_eq!(service.get(&first.id).await.unwrap(), Some(first));
        assert_eq!(service.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_failed_file_has_no_records() {
        let (_library, service) = scanned().await;
        assert!(service.video("Show/S01/broken.mkv").await.unwrap().is_empty());
        assert_eq!(service.video("Show/S01/ep1.mkv").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_list_path() {
        let (_library, service) = scanned().await;
        let root = service.list_path("").await.unwrap().unwrap();
        assert_eq!(root.file_count(), 5);
        let season = service.list_path("Show/S01").await.unwrap().unwrap();
        assert_eq!(season.path, "Show/S01");
        assert_eq!(season.children.len(), 3);
        assert_eq!(service.list_path("Nowhere").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_progress_subscriptions_are_independent() {
        let (_library, service) = scanned().await;
        let mut first = pin!(service.subscribe_progress(""));
        let mut second = pin!(service.subscribe_progress("Show"));
        assert_eq!(first.next().await, Some(Some(1.0)));
        assert_eq!(second.next().await, Some(Some(1.0)));
    }

    #[tokio::test]
    async fn test_empty_library() {
        let library = Library::new(&[]).await;
        let scanner = Scanner::handle(library.backend.clone(), library.cache.clone(), StubSource::default().handle());
        scanner.run_to_completion().await;
        let service = QueryService::new(library.backend.clone(), library.cache.clone(), scanner, 50);
        assert!(service.search("", "", 0, None).await.unwrap().is_empty());
        let mut progress = pin!(service.subscribe_progress(""));
        assert_eq!(progress.next().await, Some(Some(1.0)));
    }

    #[tokio::test]
    async fn test_single_file_scenario() {
        let source = StubSource::default().with("ep.mkv", events(&["first line", "say hello", "last line"]));
        let library = Library::new(&["ep.mkv"]).await;
        let scanner = Scanner::handle(library.backend.clone(), library.cache.clone(), source.handle());
        scanner.run_to_completion().await;
        let service = QueryService::new(library.backend.clone(), library.cache.clone(), scanner, 50);
        assert_eq!(service.search("", "hello", 0, None).await.unwrap().items.len(), 1);
        assert_eq!(service.search("", "zzz", 0, None).await.unwrap().items.len(), 0);
    }
}
