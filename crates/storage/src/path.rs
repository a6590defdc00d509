//! Relative paths inside the media library.
//!
//! A media file is identified by its path relative to the library root. Every
//! path that arrives from outside (search prefixes, tree subpaths, clip
//! sources) is normalised lexically here and can never name anything outside
//! the root.

use crate::error::{ErrorKind, Result};
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

/// Normal components of `path` after resolving `.` and `..` lexically.
fn components(path: &Path) -> Result<Vec<&OsStr>> {
    let invalid = || exn::Exn::from(ErrorKind::InvalidPath(path.to_path_buf()));
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            // Null bytes survive `components()` on Unix but truncate paths at
            // the syscall boundary.
            Component::Normal(part) if part.as_encoded_bytes().contains(&0) => return Err(invalid()),
            Component::Normal(part) => parts.push(part),
            Component::CurDir | Component::RootDir => {},
            Component::ParentDir => {
                if parts.pop().is_none() {
                    return Err(invalid());
                }
            },
            Component::Prefix(_) => return Err(invalid()),
        }
    }
    Ok(parts)
}

/// Normalise the path of a file or directory beneath the library root.
///
/// Leading slashes and `.` are dropped and `..` is resolved, as long as it
/// never climbs above the root. The root itself (an empty result) is
/// rejected; use [`subpath`] where the root is acceptable.
///
/// ```
/// use std::path::Path;
/// use subclipper_storage::validate_path;
/// assert_eq!(validate_path("/Show/./Season 1//ep1.mkv").unwrap(), Path::new("Show/Season 1/ep1.mkv"));
/// assert_eq!(validate_path("Show/extras/../ep1.mkv").unwrap(), Path::new("Show/ep1.mkv"));
/// assert!(validate_path("Show/../../etc/passwd").is_err());
/// assert!(validate_path("").is_err());
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let parts = components(path)?;
    if parts.is_empty() {
        exn::bail!(ErrorKind::InvalidPath(path.to_path_buf()));
    }
    Ok(parts.into_iter().collect())
}

/// Like [`validate`], except that the root (`""`, `"."`, `"/"`) is allowed
/// and normalises to the empty path.
pub fn subpath(path: impl AsRef<Path>) -> Result<PathBuf> {
    Ok(components(path.as_ref())?.into_iter().collect())
}

/// Render a relative path with POSIX separators, regardless of platform.
///
/// This is the canonical form of a media file's identity in the cache, so it
/// must not depend on the platform the scan ran on.
///
/// ```
/// use std::path::Path;
/// use subclipper_storage::to_posix;
/// assert_eq!(to_posix(Path::new("Show/./Season 1/ep1.mkv")), "Show/Season 1/ep1.mkv");
/// assert_eq!(to_posix(Path::new("")), "");
/// ```
pub fn to_posix(path: impl AsRef<Path>) -> String {
    path.as_ref()
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
