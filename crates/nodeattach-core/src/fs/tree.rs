//! Recursive directory copy and removal.
//!
//! Both walks fan out one task per child entry into a [`JoinSet`]. The first
//! child to fail ends the walk and the siblings still running are aborted, so
//! a failed copy can leave a partial destination.

use std::path::{Path, PathBuf};

use futures::future::{BoxFuture, FutureExt};
use tokio::task::JoinSet;
use tracing::{debug, instrument, trace};

use super::ops::{
    self, EntryKind, FsError, FsResult, copy_file, copy_permissions, copy_symlink, copy_times,
    is_dir, make_dir, readlink, remove_file, scan_directory,
};

/// Options for [`copy_directory`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyOptions {
    /// Create missing ancestors of the destination.
    pub parents: bool,
    /// Propagate access and modification times.
    pub keep_times: bool,
    /// If the source itself is a symbolic link, reproduce the link instead of
    /// copying what it points to.
    pub create_symlink: bool,
}

impl CopyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn parents(mut self, parents: bool) -> Self {
        self.parents = parents;
        self
    }

    #[must_use]
    pub fn keep_times(mut self, keep_times: bool) -> Self {
        self.keep_times = keep_times;
        self
    }

    #[must_use]
    pub fn create_symlink(mut self, create_symlink: bool) -> Self {
        self.create_symlink = create_symlink;
        self
    }
}

/// Recursively copy the directory `src` to `dst`.
///
/// Files are copied over existing files of the same name and child symlinks
/// are reproduced as links. `opts` is handed unchanged to every nested call.
/// Entries that are neither files, links nor directories are skipped.
/// Copying a directory into itself is refused.
#[instrument(level = "debug", skip_all, fields(src = %src.as_ref().display(), dst = %dst.as_ref().display()))]
pub async fn copy_directory(
    src: impl AsRef<Path>,
    dst: impl AsRef<Path>,
    opts: CopyOptions,
) -> FsResult<()> {
    let src = src.as_ref().to_path_buf();
    let dst = dst.as_ref().to_path_buf();
    if dst.starts_with(&src) {
        return Err(FsError::Io {
            op: "copy_directory",
            path: dst,
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "cannot copy a directory into itself",
            ),
        });
    }
    copy_tree(src, dst, opts).await
}

fn copy_tree(src: PathBuf, dst: PathBuf, opts: CopyOptions) -> BoxFuture<'static, FsResult<()>> {
    async move {
        if opts.create_symlink {
            match readlink(&src).await {
                Ok(target) => {
                    let into_existing = is_dir(&dst).await?;
                    let link = match src.file_name() {
                        Some(name) if into_existing => dst.join(name),
                        _ => dst.clone(),
                    };
                    debug!(link = %link.display(), target = %target.display(), "Reproducing source link");
                    return ops::symlink(&target, &link, false).await;
                }
                Err(FsError::InvalidLink { .. }) => {}
                Err(e) => return Err(e),
            }
        }

        make_dir(&dst, 0o777, opts.parents, true).await?;

        let entries = scan_directory(&src).await?;
        let mut tasks: JoinSet<FsResult<()>> = JoinSet::new();
        for entry in entries {
            let target = dst.join(&entry.name);
            match entry.kind {
                EntryKind::File => tasks.spawn(async move {
                    copy_file(&entry.path, &target, true).await?;
                    if opts.keep_times {
                        copy_times(&entry.path, &target, false).await?;
                    }
                    Ok(())
                }),
                EntryKind::Symlink => tasks.spawn(async move {
                    copy_symlink(&entry.path, &target, opts.keep_times, false).await
                }),
                EntryKind::Directory => tasks.spawn(copy_tree(entry.path, target, opts)),
                EntryKind::Other => {
                    debug!(path = %entry.path.display(), "Skipping special file");
                    continue;
                }
            };
        }
        join_fail_fast(&src, tasks).await?;

        copy_permissions(&src, &dst).await?;
        if opts.keep_times {
            let link_aware = ops::is_symlink(&dst).await?;
            copy_times(&src, &dst, link_aware).await?;
        }
        trace!(src = %src.display(), "Directory copied");
        Ok(())
    }
    .boxed()
}

/// Remove the directory `path`.
///
/// Without `recursive`, a non-empty directory is an
/// [`FsError::DirectoryNotEmpty`]. With `recursive`, every entry is removed
/// first; links are unlinked, never followed.
#[instrument(level = "debug", skip(path), fields(path = %path.as_ref().display()))]
pub async fn remove_directory(path: impl AsRef<Path>, recursive: bool) -> FsResult<()> {
    remove_tree(path.as_ref().to_path_buf(), recursive).await
}

fn remove_tree(path: PathBuf, recursive: bool) -> BoxFuture<'static, FsResult<()>> {
    async move {
        if recursive {
            let entries = scan_directory(&path).await?;
            let mut tasks: JoinSet<FsResult<()>> = JoinSet::new();
            for entry in entries {
                match entry.kind {
                    EntryKind::Directory => tasks.spawn(remove_tree(entry.path, true)),
                    _ => tasks.spawn(async move { remove_file(&entry.path).await }),
                };
            }
            join_fail_fast(&path, tasks).await?;
        }

        tokio::fs::remove_dir(&path)
            .await
            .map_err(|e| FsError::from_io("rmdir", &path, e))
    }
    .boxed()
}

/// Wait for the child tasks in completion order.
///
/// Returns the first failure to complete. Dropping `tasks` on that path aborts
/// the children still running.
async fn join_fail_fast(parent: &Path, mut tasks: JoinSet<FsResult<()>>) -> FsResult<()> {
    while let Some(joined) = tasks.join_next().await {
        joined.map_err(|e| FsError::task_failed(parent, e))??;
    }
    Ok(())
}
