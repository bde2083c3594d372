//! Asynchronous filesystem primitives.
//!
//! Thin wrappers over `tokio::fs` that translate `std::io::Error` into
//! [`FsError`] by inspecting the error kind. Conditions a caller asked to
//! tolerate (an existing directory with `exist_ok`, a missing path for
//! [`stat_or_none`]) are absorbed into return values; everything else is
//! propagated.
//!
//! Timestamp propagation goes through the `filetime` crate, on the blocking
//! pool, since neither `std` nor `tokio` can set access times.

use std::ffi::OsString;
use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};

use filetime::FileTime;
use futures::future::{BoxFuture, FutureExt};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument, trace};

/// Errors from filesystem primitives.
#[derive(Error, Debug)]
pub enum FsError {
    #[error("No such file or directory: '{}'", path.display())]
    NotFound { path: PathBuf },

    #[error("File already exists: '{}'", path.display())]
    AlreadyExists { path: PathBuf },

    #[error("Not a symbolic link: '{}'", path.display())]
    InvalidLink { path: PathBuf },

    #[error("Directory not empty: '{}'", path.display())]
    DirectoryNotEmpty { path: PathBuf },

    /// Any other OS-level failure.
    #[error("{op} failed for '{}': {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FsError {
    /// Classify an `io::Error` raised by `op` on `path`.
    pub fn from_io(op: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            io::ErrorKind::NotFound => FsError::NotFound { path },
            io::ErrorKind::AlreadyExists => FsError::AlreadyExists { path },
            io::ErrorKind::DirectoryNotEmpty => FsError::DirectoryNotEmpty { path },
            _ => FsError::Io { op, path, source },
        }
    }

    pub(crate) fn task_failed(path: impl Into<PathBuf>, err: tokio::task::JoinError) -> Self {
        FsError::Io {
            op: "task",
            path: path.into(),
            source: io::Error::other(err.to_string()),
        }
    }

    /// The path the failing operation was applied to.
    pub fn path(&self) -> &Path {
        match self {
            FsError::NotFound { path }
            | FsError::AlreadyExists { path }
            | FsError::InvalidLink { path }
            | FsError::DirectoryNotEmpty { path }
            | FsError::Io { path, .. } => path,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FsError::NotFound { .. })
    }
}

pub type FsResult<T> = Result<T, FsError>;

/// Kind of a directory entry, as reported without following links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Symlink,
    Directory,
    Other,
}

/// One entry returned by [`scan_directory`].
#[derive(Debug, Clone)]
pub struct ScannedEntry {
    pub name: OsString,
    pub path: PathBuf,
    pub kind: EntryKind,
}

// ==================== Probes ====================

/// Read metadata for `path`.
///
/// With `preserve_symlinks` the link itself is inspected instead of its target.
pub async fn stat(path: impl AsRef<Path>, preserve_symlinks: bool) -> FsResult<Metadata> {
    let path = path.as_ref();
    let result = if preserve_symlinks {
        fs::symlink_metadata(path).await
    } else {
        fs::metadata(path).await
    };
    result.map_err(|e| FsError::from_io("stat", path, e))
}

/// Like [`stat`], but a missing path yields `None` instead of an error.
pub async fn stat_or_none(
    path: impl AsRef<Path>,
    preserve_symlinks: bool,
) -> FsResult<Option<Metadata>> {
    match stat(path, preserve_symlinks).await {
        Ok(meta) => Ok(Some(meta)),
        Err(FsError::NotFound { .. }) => Ok(None),
        // A file standing in for a path component means the path can't exist
        Err(FsError::Io { source, .. }) if source.kind() == io::ErrorKind::NotADirectory => {
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

pub async fn exists(path: impl AsRef<Path>) -> FsResult<bool> {
    Ok(stat_or_none(path, false).await?.is_some())
}

pub async fn is_file(path: impl AsRef<Path>) -> FsResult<bool> {
    Ok(stat_or_none(path, false)
        .await?
        .is_some_and(|meta| meta.is_file()))
}

pub async fn is_dir(path: impl AsRef<Path>) -> FsResult<bool> {
    Ok(stat_or_none(path, false)
        .await?
        .is_some_and(|meta| meta.is_dir()))
}

pub async fn is_symlink(path: impl AsRef<Path>) -> FsResult<bool> {
    Ok(stat_or_none(path, true)
        .await?
        .is_some_and(|meta| meta.file_type().is_symlink()))
}

/// True if `path` is a directory with no entries.
///
/// Stops reading at the first entry found.
pub async fn is_empty_dir(path: impl AsRef<Path>) -> FsResult<bool> {
    let path = path.as_ref();
    if !is_dir(path).await? {
        return Ok(false);
    }
    let mut entries = fs::read_dir(path)
        .await
        .map_err(|e| FsError::from_io("read_dir", path, e))?;
    let first = entries
        .next_entry()
        .await
        .map_err(|e| FsError::from_io("read_dir", path, e))?;
    Ok(first.is_none())
}

/// List the entries of a directory, classified without following links.
pub async fn scan_directory(path: impl AsRef<Path>) -> FsResult<Vec<ScannedEntry>> {
    let path = path.as_ref();
    let mut reader = fs::read_dir(path)
        .await
        .map_err(|e| FsError::from_io("read_dir", path, e))?;

    let mut scanned = Vec::new();
    while let Some(entry) = reader
        .next_entry()
        .await
        .map_err(|e| FsError::from_io("read_dir", path, e))?
    {
        let entry_path = entry.path();
        let file_type = entry
            .file_type()
            .await
            .map_err(|e| FsError::from_io("file_type", &entry_path, e))?;
        let kind = if file_type.is_symlink() {
            EntryKind::Symlink
        } else if file_type.is_dir() {
            EntryKind::Directory
        } else if file_type.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        };
        scanned.push(ScannedEntry {
            name: entry.file_name(),
            path: entry_path,
            kind,
        });
    }
    trace!(path = %path.display(), entries = scanned.len(), "Scanned directory");
    Ok(scanned)
}

// ==================== Links ====================

/// Read the target of a symbolic link.
pub async fn readlink(path: impl AsRef<Path>) -> FsResult<PathBuf> {
    let path = path.as_ref();
    fs::read_link(path).await.map_err(|e| match e.kind() {
        // EINVAL: the path exists but is not a link
        io::ErrorKind::InvalidInput => FsError::InvalidLink {
            path: path.to_path_buf(),
        },
        _ => FsError::from_io("readlink", path, e),
    })
}

/// Create a symbolic link at `link` pointing to `target`.
///
/// With `exist_ok`, an already existing `link` is left alone and treated as
/// success.
pub async fn symlink(
    target: impl AsRef<Path>,
    link: impl AsRef<Path>,
    exist_ok: bool,
) -> FsResult<()> {
    let target = target.as_ref();
    let link = link.as_ref();
    let resolved = match link.parent() {
        Some(parent) => parent.join(target),
        None => target.to_path_buf(),
    };
    let target_is_dir = is_dir(&resolved).await?;
    create_symlink(target, link, target_is_dir, exist_ok).await
}

async fn create_symlink(
    target: &Path,
    link: &Path,
    target_is_dir: bool,
    exist_ok: bool,
) -> FsResult<()> {
    #[cfg(unix)]
    let result = {
        let _ = target_is_dir;
        fs::symlink(target, link).await
    };
    #[cfg(windows)]
    let result = if target_is_dir {
        fs::symlink_dir(target, link).await
    } else {
        fs::symlink_file(target, link).await
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && exist_ok => {
            debug!(link = %link.display(), "Link already exists, leaving it in place");
            Ok(())
        }
        Err(e) => Err(FsError::from_io("symlink", link, e)),
    }
}

/// Recreate the symbolic link `path` at `new_path`.
///
/// The new link points at the same target. With `keep_times` the link's own
/// timestamps (not its target's) are copied.
#[instrument(level = "trace", skip_all, fields(path = %path.as_ref().display(), new_path = %new_path.as_ref().display()))]
pub async fn copy_symlink(
    path: impl AsRef<Path>,
    new_path: impl AsRef<Path>,
    keep_times: bool,
    exist_ok: bool,
) -> FsResult<()> {
    let path = path.as_ref();
    let new_path = new_path.as_ref();
    let target = readlink(path).await?;
    // Follows the link: decides whether a directory-typed link is needed
    let target_is_dir = is_dir(path).await?;
    create_symlink(&target, new_path, target_is_dir, exist_ok).await?;
    if keep_times {
        copy_times(path, new_path, true).await?;
    }
    Ok(())
}

/// Create a hard link `new_path` to `path`.
pub async fn hardlink(path: impl AsRef<Path>, new_path: impl AsRef<Path>) -> FsResult<()> {
    let new_path = new_path.as_ref();
    fs::hard_link(path.as_ref(), new_path)
        .await
        .map_err(|e| FsError::from_io("hardlink", new_path, e))
}

// ==================== Files ====================

/// Move `path` to `new_path` with the host's rename semantics.
pub async fn rename(path: impl AsRef<Path>, new_path: impl AsRef<Path>) -> FsResult<()> {
    let path = path.as_ref();
    fs::rename(path, new_path.as_ref())
        .await
        .map_err(|e| FsError::from_io("rename", path, e))
}

/// Copy a regular file byte for byte.
pub async fn copy_file(
    path: impl AsRef<Path>,
    new_path: impl AsRef<Path>,
    exist_ok: bool,
) -> FsResult<()> {
    let path = path.as_ref();
    let new_path = new_path.as_ref();
    if !exist_ok && stat_or_none(new_path, true).await?.is_some() {
        return Err(FsError::AlreadyExists {
            path: new_path.to_path_buf(),
        });
    }
    let bytes = fs::copy(path, new_path)
        .await
        .map_err(|e| FsError::from_io("copy", path, e))?;
    trace!(bytes, from = %path.display(), to = %new_path.display(), "Copied file");
    Ok(())
}

/// Write `contents` to a file that must not exist yet.
pub async fn write_new_file(path: impl AsRef<Path>, contents: &[u8]) -> FsResult<()> {
    let path = path.as_ref();
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
        .map_err(|e| FsError::from_io("create", path, e))?;
    file.write_all(contents)
        .await
        .map_err(|e| FsError::from_io("write", path, e))?;
    file.flush()
        .await
        .map_err(|e| FsError::from_io("write", path, e))
}

/// Remove a single non-directory entry.
pub async fn remove_file(path: impl AsRef<Path>) -> FsResult<()> {
    let path = path.as_ref();
    fs::remove_file(path)
        .await
        .map_err(|e| FsError::from_io("unlink", path, e))
}

// ==================== Directories ====================

/// Create a directory.
///
/// Returns whether the directory already existed. With `parents`, missing
/// ancestors are created one at a time; creation stops with an error when a
/// parent resolves to itself (the filesystem root). Without `exist_ok` an
/// existing directory is an [`FsError::AlreadyExists`].
pub async fn make_dir(
    path: impl AsRef<Path>,
    mode: u32,
    parents: bool,
    exist_ok: bool,
) -> FsResult<bool> {
    make_dir_at(path.as_ref(), mode, parents, exist_ok).await
}

fn make_dir_at(path: &Path, mode: u32, parents: bool, exist_ok: bool) -> BoxFuture<'_, FsResult<bool>> {
    async move {
        if let Some(meta) = stat_or_none(path, false).await? {
            if meta.is_dir() && exist_ok {
                return Ok(true);
            }
            return Err(FsError::AlreadyExists {
                path: path.to_path_buf(),
            });
        }

        match create_dir(path, mode).await {
            Ok(()) => Ok(false),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                // Lost a race with another creator
                if exist_ok && is_dir(path).await? {
                    Ok(true)
                } else {
                    Err(FsError::from_io("mkdir", path, e))
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound && parents => {
                let parent = match path.parent() {
                    Some(parent) if !parent.as_os_str().is_empty() && parent != path => parent,
                    _ => return Err(FsError::from_io("mkdir", path, e)),
                };
                trace!(parent = %parent.display(), "Creating missing ancestor");
                make_dir_at(parent, mode, true, true).await?;
                match create_dir(path, mode).await {
                    Ok(()) => Ok(false),
                    Err(e) if e.kind() == io::ErrorKind::AlreadyExists && exist_ok => Ok(true),
                    Err(e) => Err(FsError::from_io("mkdir", path, e)),
                }
            }
            Err(e) => Err(FsError::from_io("mkdir", path, e)),
        }
    }
    .boxed()
}

async fn create_dir(path: &Path, mode: u32) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    #[cfg(unix)]
    builder.mode(mode);
    #[cfg(not(unix))]
    let _ = mode;
    builder.create(path).await
}

// ==================== Metadata propagation ====================

/// Copy access and modification times from `from` to `to`.
///
/// With `link_aware` both paths are treated as links and the links' own
/// timestamps are read and written.
pub async fn copy_times(from: impl AsRef<Path>, to: impl AsRef<Path>, link_aware: bool) -> FsResult<()> {
    let meta = stat(from, link_aware).await?;
    let atime = FileTime::from_last_access_time(&meta);
    let mtime = FileTime::from_last_modification_time(&meta);
    set_times(to.as_ref(), atime, mtime, link_aware).await
}

pub(crate) async fn set_times(
    path: &Path,
    atime: FileTime,
    mtime: FileTime,
    link_aware: bool,
) -> FsResult<()> {
    let target = path.to_path_buf();
    let result = tokio::task::spawn_blocking(move || {
        if link_aware {
            filetime::set_symlink_file_times(&target, atime, mtime)
        } else {
            filetime::set_file_times(&target, atime, mtime)
        }
    })
    .await
    .map_err(|e| FsError::task_failed(path, e))?;
    result.map_err(|e| FsError::from_io("utimes", path, e))
}

/// Copy permission bits from `from` onto `to`.
pub async fn copy_permissions(from: impl AsRef<Path>, to: impl AsRef<Path>) -> FsResult<()> {
    let to = to.as_ref();
    let meta = stat(from, false).await?;
    fs::set_permissions(to, meta.permissions())
        .await
        .map_err(|e| FsError::from_io("chmod", to, e))
}
