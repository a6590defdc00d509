//! Storage Error Types

use derive_more::{Display, Error};
use std::io::{Error as IoError, ErrorKind as IoErrorKind};
use std::path::{Path, PathBuf};

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Nothing exists at this path beneath the library root.
    #[display("not found in the media library: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    #[display("permission denied: {}", _0.display())]
    PermissionDenied(#[error(not(source))] PathBuf),
    #[display("I/O error reading {}: {source}", path.display())]
    Io { path: PathBuf, source: IoError },
    /// The path is malformed or points outside the library root.
    #[display("invalid library path: {}", _0.display())]
    InvalidPath(#[error(not(source))] PathBuf),
    /// The library root itself is unusable.
    #[display("not a media library directory: {}", _0.display())]
    InvalidRoot(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Classify an I/O error that happened while reading `path`.
    pub(crate) fn from_io(source: IoError, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        match source.kind() {
            IoErrorKind::NotFound => Self::NotFound(path),
            IoErrorKind::PermissionDenied => Self::PermissionDenied(path),
            _ => Self::Io { path, source },
        }
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}
