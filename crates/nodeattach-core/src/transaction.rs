//! Changing the attachment directory of a node.
//!
//! A [`DirChangeTask`] runs three stages in a fixed order: copy the old
//! directory to the new one, point the node's `DIR` property at the new
//! directory, then delete the old directory. Each stage is switched on or off
//! separately and skips itself when it has nothing to work with, so the same
//! task serves setting, unsetting and first-time assignment.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::config::AttachConfig;
use crate::fs::ops::{FsError, FsResult};
use crate::fs::tree::{CopyOptions, copy_directory, remove_directory};
use crate::node::{AttachNode, DIR_PROPERTY, relative_to};

/// One directory change, configured by builder methods and consumed by
/// [`run`](Self::run).
#[must_use = "a DirChangeTask does nothing until run"]
pub struct DirChangeTask<'n, 'a> {
    node: &'n mut AttachNode<'a>,
    config: &'n AttachConfig,
    old_dir: Option<PathBuf>,
    new_dir: Option<PathBuf>,
    stored: Option<Option<PathBuf>>,
    copy: bool,
    delete: bool,
    set_property: bool,
}

impl<'n, 'a> DirChangeTask<'n, 'a> {
    /// Start a change, capturing the node's current directory.
    ///
    /// Only a directory that exists counts as the old directory.
    pub async fn new(node: &'n mut AttachNode<'a>, config: &'n AttachConfig) -> FsResult<Self> {
        let old_dir = node.get_dir(config, false).await?;
        Ok(Self {
            node,
            config,
            old_dir,
            new_dir: None,
            stored: None,
            copy: false,
            delete: false,
            set_property: true,
        })
    }

    pub fn old_dir(&self) -> Option<&PathBuf> {
        self.old_dir.as_ref()
    }

    /// Target directory; `None` unsets.
    pub fn to(mut self, new_dir: Option<PathBuf>) -> Self {
        self.new_dir = new_dir;
        self
    }

    pub fn copy(mut self, copy: bool) -> Self {
        self.copy = copy;
        self
    }

    pub fn delete(mut self, delete: bool) -> Self {
        self.delete = delete;
        self
    }

    pub fn set_property(mut self, set_property: bool) -> Self {
        self.set_property = set_property;
        self
    }

    /// Store this value in `DIR` instead of the target directory.
    pub fn store(mut self, stored: Option<PathBuf>) -> Self {
        self.stored = Some(stored);
        self
    }

    /// Run copy, property change and delete, in that order.
    ///
    /// Returns the new directory.
    #[instrument(level = "debug", skip(self), fields(node = self.node.start(), old = ?self.old_dir, new = ?self.new_dir))]
    pub async fn run(self) -> FsResult<Option<PathBuf>> {
        let same_dir = self.old_dir.is_some() && self.old_dir == self.new_dir;

        if self.copy
            && !same_dir
            && let (Some(old), Some(new)) = (&self.old_dir, &self.new_dir)
        {
            let opts = CopyOptions::new()
                .parents(true)
                .keep_times(true)
                .create_symlink(self.config.copy_symlink_as_symlink);
            copy_directory(old, new, opts).await?;
            debug!(from = %old.display(), to = %new.display(), "Copied attachment directory");
        }

        if self.set_property {
            let target = match self.stored {
                Some(stored) => stored,
                None => self.new_dir.clone(),
            };
            let value = match target {
                Some(dir) => Some(stored_value(self.node, self.config, &dir)?),
                None => None,
            };
            self.node.set_property(DIR_PROPERTY, value.as_deref());
            debug!(value = ?value, "Updated DIR property");
        }

        if self.delete
            && !same_dir
            && let Some(old) = &self.old_dir
        {
            remove_directory(old, true).await?;
            debug!(dir = %old.display(), "Removed old attachment directory");
        }

        info!(node = self.node.start(), dir = ?self.new_dir, "Attachment directory changed");
        Ok(self.new_dir)
    }
}

/// Text written to `DIR` for `dir`: absolute, or relative to the document
/// when configured and the document has a location.
fn stored_value(node: &AttachNode<'_>, config: &AttachConfig, dir: &Path) -> FsResult<String> {
    let absolute = std::path::absolute(dir).map_err(|e| FsError::from_io("absolute", dir, e))?;
    let value = match node.document_dir() {
        Some(doc_dir) if config.dir_relative_paths => relative_to(&absolute, &doc_dir),
        _ => absolute,
    };
    Ok(value.to_string_lossy().into_owned())
}
