use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use crate::scan::error::{ErrorKind, Result as ScanResult};
use exn::ResultExt;
use subclipper_cache::Repository;
use subclipper_extract::{SubtitleSource, extract};
use subclipper_storage::{BackendHandle, FileInfo};

/// Indicates how much work was required to produce a [`Scan`] result.
///
/// Distinguishes between cache hits and actual extraction work, which is
/// useful for progress reporting and performance analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanEffort {
    /// At least one subtitle of this file was already cached, so the file was
    /// not handed to the extraction source at all.
    Cached,
    /// No cache entry existed for this file; its subtitles were freshly
    /// extracted and written to the cache.
    Processed,
}

/// The result of scanning a single media file.
#[derive(Debug, Clone)]
pub struct Scan {
    pub file: FileInfo,
    /// Library-wide identity of the file (its relative POSIX path).
    pub video_id: String,
    /// Number of subtitles written to the cache; always zero on a cache hit.
    pub records: usize,
    pub effort: ScanEffort,
}

/// Scans a single media file, extracting and caching its subtitles unless the
/// cache already knows about it.
///
/// 1. **Cache hit**: if any subtitle is cached for the file, nothing else
///    happens. Cached entries are never invalidated, even if the file has
///    since changed on disk.
/// 2. **Miss**: the file is handed to the extraction source and every
///    subtitle it yields is written in a single transaction.
///
/// A failed extraction writes nothing, so the file is still a miss on the
/// next scan. The same is true for a file without any subtitles.
pub async fn scan_file(
    backend: &BackendHandle,
    cache: &Repository,
    source: &dyn SubtitleSource,
    file: &FileInfo,
) -> LibraryResult<Scan> {
    scan_file_inner(backend, cache, source, file).await.or_raise(|| LibraryErrorKind::Scan)
}

pub(crate) async fn scan_file_inner(
    backend: &BackendHandle,
    cache: &Repository,
    source: &dyn SubtitleSource,
    file: &FileInfo,
) -> ScanResult<Scan> {
    let video_id = file.id();
    if cache.has(&video_id).await.or_raise(|| ErrorKind::Cache)? {
        return Ok(Scan {
            file: file.clone(),
            video_id,
            records: 0,
            effort: ScanEffort::Cached,
        });
    }
    let absolute = backend.resolve(&file.path).or_raise(|| ErrorKind::Storage)?;
    let subtitles = extract(source, &absolute, &video_id).await.or_raise(|| ErrorKind::Extract(file.path.clone()))?;
    cache.put_all(&subtitles).await.or_raise(|| ErrorKind::Cache)?;
    Ok(Scan {
        file: file.clone(),
        video_id,
        records: subtitles.len(),
        effort: ScanEffort::Processed,
    })
}
