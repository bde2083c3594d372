//! The attachment orchestrator.
//!
//! [`Attacher`] combines directory resolution, the filesystem layer and the
//! directory-change transaction into the operations a front end exposes:
//! attaching files, deleting them, syncing the auto-tag and moving a node's
//! attachment directory. It owns the configuration and the collaborators; the
//! node being worked on is passed into every call.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use nodeattach_core::{AttachConfig, AttachNode, Attacher};
//! use nodeattach_core::node::MemoryOutline;
//!
//! # async fn demo() -> nodeattach_core::error::Result<()> {
//! let mut outline = MemoryOutline::with_path("/notes/todo.json");
//! let start = outline.add_entry(1, "Taxes");
//! let attacher = Attacher::new(AttachConfig::default());
//!
//! let mut node = AttachNode::at(&mut outline, start);
//! let name = attacher.attach(&mut node, Path::new("/tmp/receipt.pdf"), None).await?;
//! assert_eq!(name.as_deref(), Some("receipt.pdf"));
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeSet;
use std::path::{MAIN_SEPARATOR, Path, PathBuf};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::collab::{
    AttachEvent, Decision, EventSink, FixedPrompter, LinkStore, MemoryLinks, Prompter, StoredLink,
    TracingEvents,
};
use crate::config::{AttachConfig, AttachMethod, NewDirMethod};
use crate::error::{AttachError, DownloadError, FsError, Result};
use crate::fs::download::{UrlDownloader, UrlFetcher, download_file};
use crate::fs::ops::{
    copy_file, exists, hardlink, is_dir, is_empty_dir, make_dir, remove_file, rename,
    scan_directory, stat, stat_or_none, symlink, write_new_file,
};
use crate::fs::tree::{CopyOptions, copy_directory, remove_directory};
use crate::node::outline::Outline;
use crate::node::{AttachNode, DIR_PROPERTY, TagAction, expand_path};
use crate::transaction::DirChangeTask;

/// Mode of directories created for attachments.
const ATTACH_DIR_MODE: u32 = 0o755;

/// Copy and delete decisions for a directory change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirPolicy {
    pub copy: Decision,
    pub delete: Decision,
}

impl DirPolicy {
    pub fn new(copy: impl Into<Decision>, delete: impl Into<Decision>) -> Self {
        Self {
            copy: copy.into(),
            delete: delete.into(),
        }
    }

    /// Ask before copying and before deleting.
    pub fn ask() -> Self {
        Self::new(Decision::Ask, Decision::Ask)
    }
}

impl Default for DirPolicy {
    fn default() -> Self {
        Self::ask()
    }
}

/// Outcome of [`Attacher::attach_many`].
#[derive(Debug, Default)]
pub struct AttachTally {
    pub successes: usize,
    pub failures: usize,
    /// Sources that failed with an error, with the error.
    pub errors: Vec<(PathBuf, AttachError)>,
}

/// Attachment operations over outline nodes.
pub struct Attacher {
    config: AttachConfig,
    events: Arc<dyn EventSink>,
    links: Arc<dyn LinkStore>,
    prompter: Arc<dyn Prompter>,
    fetcher: Arc<dyn UrlFetcher>,
}

impl Attacher {
    /// An attacher that logs events, keeps links in memory, cancels every
    /// prompt and downloads with [`UrlDownloader`].
    pub fn new(config: AttachConfig) -> Self {
        Self {
            config,
            events: Arc::new(TracingEvents),
            links: Arc::new(MemoryLinks::new()),
            prompter: Arc::new(FixedPrompter::cancel()),
            fetcher: Arc::new(UrlDownloader::new()),
        }
    }

    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    #[must_use]
    pub fn with_links(mut self, links: Arc<dyn LinkStore>) -> Self {
        self.links = links;
        self
    }

    #[must_use]
    pub fn with_prompter(mut self, prompter: Arc<dyn Prompter>) -> Self {
        self.prompter = prompter;
        self
    }

    #[must_use]
    pub fn with_fetcher(mut self, fetcher: Arc<dyn UrlFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn config(&self) -> &AttachConfig {
        &self.config
    }

    // ==================== Directory resolution ====================

    /// The node's attachment directory, if it resolves.
    ///
    /// With `no_fs_check` the declared location is returned even if it does
    /// not exist yet.
    pub async fn dir_or_none(
        &self,
        node: &mut AttachNode<'_>,
        no_fs_check: bool,
    ) -> Result<Option<PathBuf>> {
        Ok(node.get_dir(&self.config, no_fs_check).await?)
    }

    /// Like [`dir_or_none`](Self::dir_or_none), failing with
    /// [`AttachError::NoAttachmentDirectory`] when nothing resolves.
    pub async fn dir(&self, node: &mut AttachNode<'_>, no_fs_check: bool) -> Result<PathBuf> {
        self.dir_or_none(node, no_fs_check)
            .await?
            .ok_or_else(|| AttachError::NoAttachmentDirectory {
                node: node.describe(),
            })
    }

    /// The node's attachment directory, created on disk if necessary.
    ///
    /// A node with neither `DIR` nor `ID` gets a directory through `method`
    /// (the configured preferred method when `None`). For
    /// [`NewDirMethod::Dir`], `new_dir` is used, or asked for.
    #[instrument(level = "debug", skip(self, node, new_dir), fields(node = node.start()))]
    pub async fn dir_or_create(
        &self,
        node: &mut AttachNode<'_>,
        method: Option<NewDirMethod>,
        new_dir: Option<&Path>,
    ) -> Result<PathBuf> {
        if let Some(dir) = node.get_dir(&self.config, false).await? {
            return Ok(dir);
        }
        let dir = match node.declared_dir(&self.config) {
            Some(dir) => dir,
            None => {
                let method = method.unwrap_or(self.config.preferred_new_method);
                self.assign_dir(node, method, new_dir).await?
            }
        };
        let existed = make_dir(&dir, ATTACH_DIR_MODE, true, true).await?;
        if !existed {
            info!(dir = %dir.display(), "Created attachment directory");
        }
        Ok(dir)
    }

    async fn assign_dir(
        &self,
        node: &mut AttachNode<'_>,
        method: NewDirMethod,
        new_dir: Option<&Path>,
    ) -> Result<PathBuf> {
        let method = match method {
            NewDirMethod::Ask => {
                let choice = self
                    .prompter
                    .choose("Create attachment directory from", &["id", "dir"])
                    .await?;
                if choice == 0 { NewDirMethod::Id } else { NewDirMethod::Dir }
            }
            other => other,
        };

        if method == NewDirMethod::Id {
            let id = node.id_get_or_create(self.config.id_method);
            return self
                .config
                .id_resolver(node.document_dir().as_deref())
                .get_from_id(&id)
                .ok_or(AttachError::IdPathResolutionFailed { id });
        }

        let raw = match new_dir {
            Some(dir) => dir.to_string_lossy().into_owned(),
            None => {
                self.prompter
                    .read_text("Attachment directory", None)
                    .await?
            }
        };
        let dir = expand_path(&raw, node.document_dir().as_deref());
        DirChangeTask::new(node, &self.config)
            .await?
            .to(Some(dir.clone()))
            .run()
            .await?;
        Ok(dir)
    }

    // ==================== Directory changes ====================

    /// Point the node at `new_dir`, copying and deleting the old directory as
    /// `policy` decides.
    #[instrument(level = "info", skip(self, node, new_dir, policy), fields(node = node.start(), new_dir = %new_dir.display()))]
    pub async fn set_directory(
        &self,
        node: &mut AttachNode<'_>,
        new_dir: &Path,
        policy: DirPolicy,
    ) -> Result<PathBuf> {
        let new_dir = expand_path(&new_dir.to_string_lossy(), node.document_dir().as_deref());
        let start = node.start();
        let task = DirChangeTask::new(node, &self.config).await?;

        let (copy, delete) = match task.old_dir().cloned() {
            Some(old) if old != new_dir => {
                let copy = policy
                    .copy
                    .resolve(
                        self.prompter.as_ref(),
                        &format!(
                            "Copy attachments from '{}' to '{}'?",
                            old.display(),
                            new_dir.display()
                        ),
                    )
                    .await?;
                let delete = policy
                    .delete
                    .resolve(
                        self.prompter.as_ref(),
                        &format!("Delete '{}'?", old.display()),
                    )
                    .await?;
                (copy, delete)
            }
            _ => (false, false),
        };

        task.to(Some(new_dir.clone()))
            .copy(copy)
            .delete(delete)
            .run()
            .await?;
        self.changed(start, Some(new_dir.clone()));
        Ok(new_dir)
    }

    /// Drop the node's own `DIR` and fall back to whatever resolves without it.
    ///
    /// The fallback is an inherited `DIR` or the ID directory. When the node
    /// has no local `DIR`, or the fallback is the directory already in use,
    /// nothing is copied or deleted. Otherwise `policy` decides whether the
    /// old contents move to the fallback (minting an ID if none resolves) and
    /// whether the old directory is deleted afterwards.
    #[instrument(level = "info", skip(self, node, policy), fields(node = node.start()))]
    pub async fn unset_directory(
        &self,
        node: &mut AttachNode<'_>,
        policy: DirPolicy,
    ) -> Result<Option<PathBuf>> {
        let start = node.start();
        let Some(local) = node.get_property(DIR_PROPERTY, false) else {
            debug!("No local DIR to unset");
            return Ok(node.get_dir(&self.config, false).await?);
        };

        let old = node.get_dir(&self.config, false).await?;
        node.set_property(DIR_PROPERTY, None);
        let fallback = node.get_dir(&self.config, true).await?;
        node.set_property(DIR_PROPERTY, Some(local.as_str()));

        let mut target = None;
        let mut delete = false;
        match old {
            Some(old) if fallback.as_ref() != Some(&old) => {
                let copy = policy
                    .copy
                    .resolve(
                        self.prompter.as_ref(),
                        &format!(
                            "Copy attachments from '{}' to the fallback directory?",
                            old.display()
                        ),
                    )
                    .await?;
                if copy {
                    target = match fallback {
                        Some(dir) => Some(dir),
                        None => {
                            let id = node.id_get_or_create(self.config.id_method);
                            let dir = self
                                .config
                                .id_resolver(node.document_dir().as_deref())
                                .get_from_id(&id)
                                .ok_or(AttachError::IdPathResolutionFailed { id })?;
                            Some(dir)
                        }
                    };
                }
                delete = policy
                    .delete
                    .resolve(
                        self.prompter.as_ref(),
                        &format!("Delete '{}'?", old.display()),
                    )
                    .await?;
            }
            Some(old) => debug!(dir = %old.display(), "Fallback is the current directory"),
            None => {}
        }

        let copy = target.is_some();
        DirChangeTask::new(node, &self.config)
            .await?
            .to(target)
            .copy(copy)
            .delete(delete)
            .store(None)
            .run()
            .await?;

        let dir = node.get_dir(&self.config, false).await?;
        self.changed(start, dir.clone());
        Ok(dir)
    }

    // ==================== Attaching ====================

    /// Import `source` into the node's attachment directory.
    ///
    /// Returns the attachment name, or `None` when the import did nothing
    /// (the source already is the destination).
    #[instrument(level = "info", skip(self, node, source), fields(node = node.start(), source = %source.display()))]
    pub async fn attach(
        &self,
        node: &mut AttachNode<'_>,
        source: &Path,
        method: Option<AttachMethod>,
    ) -> Result<Option<String>> {
        let method = method.unwrap_or(self.config.method);
        let name = attachment_name(source)?;
        let dir = self.dir_or_create(node, None, None).await?;
        let dest = dir.join(&name);

        if !import(source, &dest, method, &self.config).await? {
            debug!(dest = %dest.display(), "Source already in place");
            return Ok(None);
        }
        self.after_attach(node, &dir);
        if self.config.store_link {
            self.links
                .store(StoredLink::new(&dest, source.display().to_string()));
        }
        info!(name, method = method.as_str(), "Attached file");
        Ok(Some(name))
    }

    /// Download `url` into the node's attachment directory.
    ///
    /// The attachment is named `name`, or after the last segment of the URL.
    #[instrument(level = "info", skip(self, node), fields(node = node.start()))]
    pub async fn attach_url(
        &self,
        node: &mut AttachNode<'_>,
        url: &str,
        name: Option<&str>,
    ) -> Result<Option<String>> {
        let parsed = Url::parse(url).map_err(|e| DownloadError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let name = match name {
            Some(name) => plain_name(name)?.to_string(),
            None => url_name(&parsed).ok_or_else(|| AttachError::CannotDetermineName {
                source_name: url.to_string(),
            })?,
        };
        let dir = self.dir_or_create(node, None, None).await?;
        let dest = dir.join(&name);

        download_file(self.fetcher.as_ref(), &parsed, &dest, false).await?;
        self.after_attach(node, &dir);
        if self.config.store_link {
            self.links.store(StoredLink::new(&dest, url));
        }
        info!(name, "Attached download");
        Ok(Some(name))
    }

    /// Write `contents` as a new attachment called `name`.
    ///
    /// Fails with [`FsError::AlreadyExists`] if the name is taken.
    #[instrument(level = "info", skip(self, node, contents), fields(node = node.start(), bytes = contents.len()))]
    pub async fn attach_buffer(
        &self,
        node: &mut AttachNode<'_>,
        name: &str,
        contents: &[u8],
    ) -> Result<String> {
        let name = plain_name(name)?;
        let dir = self.dir_or_create(node, None, None).await?;
        write_new_file(dir.join(name), contents).await?;
        self.after_attach(node, &dir);
        Ok(name.to_string())
    }

    /// Import several sources at once.
    ///
    /// Failures are counted, not propagated. A source whose name was already
    /// taken by an earlier source in the batch is rejected as
    /// [`FsError::AlreadyExists`]. One change event and one tag update are
    /// issued for the whole batch.
    #[instrument(level = "info", skip(self, node, sources), fields(node = node.start(), count = sources.len()))]
    pub async fn attach_many(
        &self,
        node: &mut AttachNode<'_>,
        sources: &[PathBuf],
        method: Option<AttachMethod>,
    ) -> Result<AttachTally> {
        let method = method.unwrap_or(self.config.method);
        let dir = self.dir_or_create(node, None, None).await?;

        // Sources sharing a name would race on one destination.
        let mut names = BTreeSet::new();
        let mut planned = Vec::with_capacity(sources.len());
        let mut rejected: Vec<(&PathBuf, Result<Option<PathBuf>>)> = Vec::new();
        for source in sources {
            let name = match attachment_name(source) {
                Ok(name) => name,
                Err(e) => {
                    rejected.push((source, Err(e)));
                    continue;
                }
            };
            let dest = dir.join(&name);
            if names.insert(name) {
                planned.push((source, dest));
            } else {
                rejected.push((source, Err(FsError::AlreadyExists { path: dest }.into())));
            }
        }

        let mut outcomes: Vec<(&PathBuf, Result<Option<PathBuf>>)> = stream::iter(planned)
            .map(|(source, dest)| async move {
                let outcome = import(source, &dest, method, &self.config)
                    .await
                    .map(|imported| imported.then_some(dest));
                (source, outcome)
            })
            .buffer_unordered(self.config.max_concurrency.max(1))
            .collect()
            .await;
        outcomes.extend(rejected);

        let mut tally = AttachTally::default();
        for (source, outcome) in outcomes {
            match outcome {
                Ok(Some(dest)) => {
                    tally.successes += 1;
                    if self.config.store_link {
                        self.links
                            .store(StoredLink::new(&dest, source.display().to_string()));
                    }
                }
                Ok(None) => tally.failures += 1,
                Err(e) => {
                    warn!(source = %source.display(), error = %e, "Attach failed");
                    tally.failures += 1;
                    tally.errors.push((source.clone(), e));
                }
            }
        }

        self.changed(node.start(), Some(dir.clone()));
        let has_files = has_attachments(&dir, &self.config).await?;
        self.tag(node, has_files);
        info!(
            successes = tally.successes,
            failures = tally.failures,
            "Attached batch"
        );
        Ok(tally)
    }

    // ==================== Deleting ====================

    /// Delete one attachment by name. Directories are removed recursively.
    #[instrument(level = "info", skip(self, node), fields(node = node.start()))]
    pub async fn delete_one(&self, node: &mut AttachNode<'_>, name: &str) -> Result<()> {
        let name = plain_name(name)?;
        let dir = self.dir(node, false).await?;
        let path = dir.join(name);

        if stat(&path, true).await?.is_dir() {
            remove_directory(&path, true).await?;
        } else {
            remove_file(&path).await?;
        }
        info!(path = %path.display(), "Deleted attachment");
        self.changed(node.start(), Some(dir));
        Ok(())
    }

    /// Delete the node's attachment directory.
    ///
    /// The directory is first unlinked like a file, then removed as an empty
    /// directory. Only if it is not empty is `recursive` consulted (asking by
    /// default); declining fails with [`FsError::DirectoryNotEmpty`] and
    /// leaves everything in place.
    #[instrument(level = "info", skip(self, node), fields(node = node.start()))]
    pub async fn delete_all(
        &self,
        node: &mut AttachNode<'_>,
        recursive: Option<Decision>,
    ) -> Result<()> {
        let Some(dir) = node.get_dir(&self.config, false).await? else {
            debug!("No attachment directory to delete");
            self.tag(node, false);
            return Ok(());
        };

        if let Err(unlink_err) = remove_file(&dir).await {
            if !stat(&dir, true).await?.is_dir() {
                return Err(unlink_err.into());
            }
            match remove_directory(&dir, false).await {
                Ok(()) => {}
                Err(FsError::DirectoryNotEmpty { path }) => {
                    let recursive = recursive.unwrap_or(Decision::Ask);
                    let question = format!("Remove '{}' and everything in it?", path.display());
                    if !recursive.resolve(self.prompter.as_ref(), &question).await? {
                        return Err(FsError::DirectoryNotEmpty { path }.into());
                    }
                    remove_directory(&dir, true).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }

        info!(dir = %dir.display(), "Deleted attachment directory");
        self.changed(node.start(), Some(dir));
        self.tag(node, false);
        Ok(())
    }

    // ==================== Syncing ====================

    /// Bring the auto-tag in line with the directory contents.
    ///
    /// An empty directory is removed if `delete_empty` (or the configured
    /// policy) agrees.
    #[instrument(level = "debug", skip(self, node), fields(node = node.start()))]
    pub async fn sync(
        &self,
        node: &mut AttachNode<'_>,
        delete_empty: Option<Decision>,
    ) -> Result<()> {
        let Some(dir) = node.get_dir(&self.config, false).await? else {
            self.tag(node, false);
            return Ok(());
        };

        self.changed(node.start(), Some(dir.clone()));
        let has_files = has_attachments(&dir, &self.config).await?;
        self.tag(node, has_files);

        if is_empty_dir(&dir).await? {
            let policy = delete_empty.unwrap_or(self.config.sync_delete_empty_dir);
            let question = format!("Attachment directory '{}' is empty. Delete?", dir.display());
            if policy.resolve(self.prompter.as_ref(), &question).await? {
                remove_directory(&dir, false).await?;
                info!(dir = %dir.display(), "Removed empty attachment directory");
            }
        }
        Ok(())
    }

    /// Sync every node starting at one of `starts`, each node once.
    ///
    /// Start 0 is the document. Returns how many nodes were synced.
    pub async fn sync_all(
        &self,
        outline: &mut dyn Outline,
        starts: impl IntoIterator<Item = usize>,
        delete_empty: Option<Decision>,
    ) -> Result<usize> {
        let unique: BTreeSet<usize> = starts.into_iter().collect();
        let mut synced = 0;
        for start in unique {
            let node = if start == 0 {
                Some(AttachNode::document(&mut *outline))
            } else {
                AttachNode::entry(&mut *outline, start)
            };
            let Some(mut node) = node else {
                debug!(start, "No entry at position, skipping");
                continue;
            };
            self.sync(&mut node, delete_empty).await?;
            synced += 1;
        }
        Ok(synced)
    }

    // ==================== Browsing ====================

    /// Attachment names in the node's directory, sorted, litter excluded.
    pub async fn list(&self, node: &mut AttachNode<'_>) -> Result<Vec<String>> {
        let dir = self.dir(node, false).await?;
        let mut names: Vec<String> = scan_directory(&dir)
            .await?
            .into_iter()
            .map(|entry| entry.name.to_string_lossy().into_owned())
            .filter(|name| !self.config.is_litter(name))
            .collect();
        names.sort();
        Ok(names)
    }

    /// Full path of the attachment `name`. Existence is not checked.
    pub async fn expand(&self, node: &mut AttachNode<'_>, name: &str) -> Result<PathBuf> {
        let name = plain_name(name)?;
        Ok(self.dir(node, false).await?.join(name))
    }

    /// Announce that the attachment `name` is being opened.
    pub async fn open(&self, node: &mut AttachNode<'_>, name: &str) -> Result<PathBuf> {
        let path = self.expand(node, name).await?;
        if !exists(&path).await? {
            return Err(FsError::NotFound { path }.into());
        }
        self.events.emit(AttachEvent::Opened {
            node: node.start(),
            path: path.clone(),
        });
        Ok(path)
    }

    /// Announce that the attachment directory itself is being opened,
    /// creating it first if needed.
    pub async fn reveal(&self, node: &mut AttachNode<'_>) -> Result<PathBuf> {
        let dir = self.dir_or_create(node, None, None).await?;
        self.events.emit(AttachEvent::Opened {
            node: node.start(),
            path: dir.clone(),
        });
        Ok(dir)
    }

    /// Create an empty attachment called `name`.
    pub async fn new_file(&self, node: &mut AttachNode<'_>, name: &str) -> Result<PathBuf> {
        let name = self.attach_buffer(node, name, &[]).await?;
        self.expand(node, &name).await
    }

    /// Apply the archive-delete policy to a node being archived.
    ///
    /// Returns whether the attachments were deleted.
    #[instrument(level = "info", skip(self, node), fields(node = node.start()))]
    pub async fn archive(&self, node: &mut AttachNode<'_>) -> Result<bool> {
        if node.get_dir(&self.config, false).await?.is_none() {
            return Ok(false);
        }
        let question = format!("Delete all attachments of {}?", node.describe());
        if !self
            .config
            .archive_delete
            .resolve(self.prompter.as_ref(), &question)
            .await?
        {
            return Ok(false);
        }
        self.delete_all(node, Some(Decision::Always)).await?;
        Ok(true)
    }

    // ==================== Helpers ====================

    fn changed(&self, node: usize, dir: Option<PathBuf>) {
        self.events.emit(AttachEvent::Changed { node, dir });
    }

    fn tag(&self, node: &mut AttachNode<'_>, on: bool) {
        if let Some(tag) = self.config.auto_tag() {
            node.toggle_tag(tag, TagAction::from(on));
        }
    }

    fn after_attach(&self, node: &mut AttachNode<'_>, dir: &Path) {
        self.changed(node.start(), Some(dir.to_path_buf()));
        self.tag(node, true);
    }
}

/// Base name of `source`, refusing paths that end in a separator.
pub fn attachment_name(source: &Path) -> Result<String> {
    let raw = source.to_string_lossy();
    let unusable = || AttachError::CannotDetermineName {
        source_name: raw.to_string(),
    };
    if raw.ends_with('/') || raw.ends_with(MAIN_SEPARATOR) {
        return Err(unusable());
    }
    source
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(unusable)
}

/// `name` if it is a single path component.
fn plain_name(name: &str) -> Result<&str> {
    let is_plain = Path::new(name).file_name().and_then(|n| n.to_str()) == Some(name);
    if is_plain {
        Ok(name)
    } else {
        Err(AttachError::CannotDetermineName {
            source_name: name.to_string(),
        })
    }
}

fn url_name(url: &Url) -> Option<String> {
    url.path_segments()?
        .rev()
        .find(|segment| !segment.is_empty())
        .map(str::to_string)
}

/// Bring `source` to `dest`. Returns false if they are the same file.
async fn import(
    source: &Path,
    dest: &Path,
    method: AttachMethod,
    config: &AttachConfig,
) -> Result<bool> {
    let absolute = std::path::absolute(source).map_err(|e| FsError::from_io("absolute", source, e))?;
    let dest_absolute =
        std::path::absolute(dest).map_err(|e| FsError::from_io("absolute", dest, e))?;
    if absolute == dest_absolute {
        return Ok(false);
    }
    match method {
        AttachMethod::Mv => {
            if stat_or_none(dest, true).await?.is_some() {
                return Err(FsError::AlreadyExists {
                    path: dest.to_path_buf(),
                }
                .into());
            }
            rename(source, dest).await?;
        }
        AttachMethod::Cp => {
            if is_dir(source).await? {
                let opts = CopyOptions::new()
                    .keep_times(true)
                    .create_symlink(config.copy_symlink_as_symlink);
                copy_directory(source, dest, opts).await?;
            } else {
                copy_file(source, dest, false).await?;
            }
        }
        AttachMethod::Ln => hardlink(source, dest).await?,
        AttachMethod::Lns => {
            if !exists(&absolute).await? {
                return Err(FsError::NotFound { path: absolute }.into());
            }
            symlink(&absolute, dest, false).await?;
        }
    }
    Ok(true)
}

/// Whether `dir` holds anything other than litter.
async fn has_attachments(dir: &Path, config: &AttachConfig) -> Result<bool> {
    let entries = scan_directory(dir).await?;
    Ok(entries
        .iter()
        .any(|entry| !config.is_litter(&entry.name.to_string_lossy())))
}
