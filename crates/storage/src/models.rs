//! Storage models.

use std::path::PathBuf;

/// File metadata returned by storage backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Relative path from storage root
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
}
impl FileInfo {
    pub fn new(path: impl Into<PathBuf>, size: u64) -> Self {
        Self { path: path.into(), size }
    }

    /// The library-wide identity of this file: its relative path with POSIX
    /// separators.
    pub fn id(&self) -> String {
        crate::to_posix(&self.path)
    }
}

/// A node of the directory tree beneath the library root, used for navigation.
///
/// `path` is relative to the root with POSIX separators; the root itself is
/// the empty string. Files have no children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub path: String,
    pub is_dir: bool,
    pub children: Vec<TreeNode>,
}
impl TreeNode {
    pub fn file(path: impl Into<String>) -> Self {
        Self { path: path.into(), is_dir: false, children: Vec::new() }
    }

    pub fn dir(path: impl Into<String>, children: Vec<TreeNode>) -> Self {
        Self { path: path.into(), is_dir: true, children }
    }

    /// Final path component, or the empty string for the root.
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or_default()
    }

    /// Number of files anywhere beneath (or at) this node.
    pub fn file_count(&self) -> usize {
        match self.is_dir {
            true => self.children.iter().map(TreeNode::file_count).sum(),
            false => 1,
        }
    }
}
