//! The media library as a directory on the local file system.

use crate::backend::FileInfoStream;
use crate::error::{ErrorKind, Result};
use crate::models::TreeNode;
use crate::path::{subpath, validate};
use crate::{FileInfo, StorageBackend, to_posix};
use async_stream::stream;
use async_trait::async_trait;
use exn::ResultExt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tokio::fs::{self, DirEntry};

/// What the walk does with one directory entry.
enum Visit {
    File(FileInfo),
    Directory(PathBuf),
    Ignore,
}

type NodeFuture<'a> = Pin<Box<dyn Future<Output = Result<TreeNode>> + Send + 'a>>;

/// Media library rooted at a local directory.
///
/// The library is only ever read. Symlinks to files are followed, symlinks to
/// directories are not descended into, and entries that cannot be resolved
/// (dangling links, files removed mid-walk) are ignored.
///
/// ```no_run
/// use subclipper_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let library = LocalBackend::new("library", "/srv/media")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LocalBackend {
    name: String,
    root: PathBuf,
}
impl LocalBackend {
    /// Open the library at `root`, which must be an absolute path to an
    /// existing directory. A missing root is a configuration mistake, so it
    /// is never created on demand.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidRoot(root));
        }
        // Blocking, but only once at startup.
        let metadata = std::fs::metadata(&root).map_err(|e| ErrorKind::from_io(e, &root))?;
        if !metadata.is_dir() {
            exn::bail!(ErrorKind::InvalidRoot(root));
        }
        Ok(Self { name: name.into(), root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Library path of an absolute location found while walking the root.
    fn to_relative(&self, absolute: &Path) -> Result<PathBuf> {
        let relative = absolute
            .strip_prefix(&self.root)
            .or_raise(|| ErrorKind::InvalidPath(absolute.to_path_buf()))?;
        validate(relative)
    }

    async fn visit(&self, entry: DirEntry, prefix: Option<&Path>) -> Result<Visit> {
        let absolute = entry.path();
        // `fs::metadata` (not `DirEntry::metadata`) so that symlinks to files
        // are followed.
        let metadata = fs::metadata(&absolute).await.map_err(|e| ErrorKind::from_io(e, &absolute))?;
        let linked = entry.file_type().await.map_err(|e| ErrorKind::from_io(e, &absolute))?.is_symlink();
        if linked && metadata.is_dir() {
            // A link back up the tree would be walked forever.
            tracing::debug!(path = %absolute.display(), "Not descending into directory symlink");
            return Ok(Visit::Ignore);
        }
        let relative = self.to_relative(&absolute)?;
        let wanted = match prefix {
            None => true,
            // Directories above the prefix still have to be walked through.
            Some(prefix) if metadata.is_dir() => relative.starts_with(prefix) || prefix.starts_with(&relative),
            Some(prefix) => relative.starts_with(prefix),
        };
        Ok(match (wanted, metadata.is_dir(), metadata.is_file()) {
            (false, _, _) => Visit::Ignore,
            (true, true, _) => Visit::Directory(absolute),
            (true, false, true) => Visit::File(FileInfo::new(relative, metadata.len())),
            // Sockets, FIFOs, devices.
            (true, false, false) => Visit::Ignore,
        })
    }

    /// Tree of `absolute`. Directory symlinks below the starting point are
    /// listed as empty directories, matching what the walk descends into.
    fn node(&self, absolute: PathBuf, path: String, descend_links: bool) -> NodeFuture<'_> {
        Box::pin(async move {
            let metadata = fs::metadata(&absolute).await.map_err(|e| ErrorKind::from_io(e, &path))?;
            if !metadata.is_dir() {
                return Ok(TreeNode::file(path));
            }
            if !descend_links {
                let link = fs::symlink_metadata(&absolute).await.map_err(|e| ErrorKind::from_io(e, &path))?;
                if link.file_type().is_symlink() {
                    return Ok(TreeNode::dir(path, Vec::new()));
                }
            }
            let mut entries = fs::read_dir(&absolute).await.map_err(|e| ErrorKind::from_io(e, &path))?;
            let mut names = Vec::new();
            while let Some(entry) = entries.next_entry().await.map_err(|e| ErrorKind::from_io(e, &path))? {
                names.push(entry.file_name());
            }
            names.sort();
            let mut children = Vec::with_capacity(names.len());
            for name in names {
                let child = match path.as_str() {
                    "" => name.to_string_lossy().into_owned(),
                    parent => format!("{parent}/{}", name.to_string_lossy()),
                };
                match self.node(absolute.join(&name), child, false).await {
                    Ok(node) => children.push(node),
                    Err(err) if matches!(&*err, ErrorKind::NotFound(_)) => {
                        tracing::debug!(path = %absolute.join(&name).display(), "Skipping dangling directory entry");
                    },
                    Err(err) => return Err(err),
                }
            }
            Ok(TreeNode::dir(path, children))
        })
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a> {
        let prefix = match prefix.map(subpath).transpose() {
            Ok(prefix) => prefix.filter(|p| !p.as_os_str().is_empty()),
            Err(err) => return Box::pin(futures::stream::once(async { Err(err) })),
        };
        Box::pin(stream! {
            // Depth-first, siblings in name order, so that the order is
            // stable for the duration of one walk.
            let mut pending = vec![self.root.clone()];
            while let Some(directory) = pending.pop() {
                let mut entries = match fs::read_dir(&directory).await {
                    Ok(entries) => entries,
                    Err(err) => {
                        yield Err(exn::Exn::from(ErrorKind::from_io(err, &directory)));
                        continue;
                    },
                };
                let mut visits = Vec::new();
                loop {
                    match entries.next_entry().await {
                        Ok(Some(entry)) => visits.push((entry.file_name(), entry)),
                        Ok(None) => break,
                        Err(err) => {
                            yield Err(exn::Exn::from(ErrorKind::from_io(err, &directory)));
                            break;
                        },
                    }
                }
                visits.sort_by(|(a, _), (b, _)| a.cmp(b));
                let mut subdirectories = Vec::new();
                for (_, entry) in visits {
                    match self.visit(entry, prefix.as_deref()).await {
                        Ok(Visit::File(file)) => yield Ok(file),
                        Ok(Visit::Directory(path)) => subdirectories.push(path),
                        Ok(Visit::Ignore) => {},
                        Err(err) if matches!(&*err, ErrorKind::NotFound(_)) => {},
                        Err(err) => yield Err(err),
                    }
                }
                pending.extend(subdirectories.into_iter().rev());
            }
        })
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let absolute = self.resolve(path)?;
        fs::try_exists(&absolute).await.map_err(|e| exn::Exn::from(ErrorKind::from_io(e, path)))
    }

    async fn stat(&self, path: &Path) -> Result<FileInfo> {
        let relative = validate(path)?;
        let metadata = fs::metadata(self.root.join(&relative)).await.map_err(|e| ErrorKind::from_io(e, &relative))?;
        Ok(FileInfo::new(relative, metadata.len()))
    }

    fn resolve(&self, path: &Path) -> Result<PathBuf> {
        Ok(self.root.join(validate(path)?))
    }

    async fn tree(&self, path: &Path) -> Result<TreeNode> {
        let relative = subpath(path)?;
        let absolute = match relative.as_os_str().is_empty() {
            true => self.root.clone(),
            false => self.root.join(&relative),
        };
        self.node(absolute, to_posix(&relative), true).await
    }
}
