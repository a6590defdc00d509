//! Read-only access to the media library.
//!
//! The library is never written to: clips are rendered into temporary
//! directories and extracted subtitles live in the cache database.

mod local;

pub use self::local::LocalBackend;
use crate::error::Result;
use crate::models::{FileInfo, TreeNode};
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::path::{Path, PathBuf};
use std::pin::Pin;

pub(crate) type FileInfoStream<'a> = Pin<Box<dyn Stream<Item = Result<FileInfo>> + Send + 'a>>;

/// A media library.
///
/// Every path is relative to the library root. Implementations normalise
/// incoming paths with [`validate_path`](crate::validate_path) (or its
/// root-allowing sibling for directory arguments) and reject anything that
/// would leave the root.
///
/// ```
/// use std::path::Path;
/// use subclipper_storage::{backend::StorageBackend, error::Result};
///
/// async fn episode_size(library: &dyn StorageBackend) -> Result<Option<u64>> {
///     let episode = Path::new("Show/Season 1/ep1.mkv");
///     match library.exists(episode).await? {
///         true => Ok(Some(library.stat(episode).await?.size)),
///         false => Ok(None),
///     }
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Used in logs only.
    fn name(&self) -> &str;

    /// Every media file beneath `prefix` (or the whole library), failing on
    /// the first unreadable entry. See [`list_stream`](Self::list_stream).
    async fn list(&self, prefix: Option<&Path>) -> Result<Vec<FileInfo>> {
        self.list_stream(prefix).try_collect().await
    }

    /// Walk the library, yielding every regular file beneath `prefix` as it
    /// is found. A prefix matches whole path components.
    ///
    /// The order is stable for one walk but is not promised across file
    /// systems or runs. An unreadable entry is yielded as an error and the
    /// walk carries on.
    ///
    /// ```
    /// use futures::TryStreamExt;
    /// use std::path::Path;
    /// # use subclipper_storage::{backend::StorageBackend, error::Result};
    /// # async fn example(library: &dyn StorageBackend) -> Result<()> {
    /// let mut season = library.list_stream(Some(Path::new("Show/Season 1")));
    /// while let Some(file) = season.try_next().await? {
    ///     println!("{} ({} bytes)", file.id(), file.size);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a>;

    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Metadata of one file, or [`NotFound`](crate::error::ErrorKind::NotFound).
    async fn stat(&self, path: &Path) -> Result<FileInfo>;

    /// Location of a library file for external tools (extraction, rendering)
    /// to open.
    fn resolve(&self, path: &Path) -> Result<PathBuf>;

    /// The directory tree at `subpath` (empty for the root), read afresh on
    /// every call. [`NotFound`](crate::error::ErrorKind::NotFound) if the
    /// subpath does not exist.
    async fn tree(&self, subpath: &Path) -> Result<TreeNode>;
}
