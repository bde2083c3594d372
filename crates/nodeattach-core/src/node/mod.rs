//! Outline locations that can own an attachment directory.
//!
//! An [`AttachNode`] is either a single entry of an outline or the whole
//! document. It is created on demand for each lookup and holds no state of
//! its own beyond a cache of its `DIR`/`ID` properties; the directory itself
//! lives in the outline as properties and tags.

pub mod memory;
pub mod outline;
pub mod paths;

use std::fmt;
use std::path::PathBuf;

use tracing::trace;

use crate::config::{AttachConfig, IdMethod, Inheritance};
use crate::fs::ops::{FsResult, is_dir};

pub use memory::{MemoryOutline, OutlineEntry, OutlineError};
pub use outline::Outline;
pub use paths::{expand_path, relative_to};

/// Property holding an explicit attachment directory.
pub const DIR_PROPERTY: &str = "DIR";
/// Property holding the identifier an attachment directory is derived from.
pub const ID_PROPERTY: &str = "ID";

/// Which part of the outline a node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    Document,
    /// An entry, by start position.
    Entry(usize),
}

impl NodeKind {
    /// Start position; 0 for the document.
    pub fn start(self) -> usize {
        match self {
            NodeKind::Document => 0,
            NodeKind::Entry(start) => start,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Location {
    Dir(PathBuf),
    Id(String),
    Nothing,
}

/// Change requested by [`AttachNode::toggle_tag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagAction {
    On,
    Off,
    Toggle,
}

impl From<bool> for TagAction {
    fn from(on: bool) -> Self {
        if on { TagAction::On } else { TagAction::Off }
    }
}

/// A location in an outline that may own an attachment directory.
pub struct AttachNode<'a> {
    outline: &'a mut dyn Outline,
    kind: NodeKind,
    location: Option<Location>,
}

impl<'a> AttachNode<'a> {
    /// The entry containing `position`, or the document if there is none.
    pub fn at(outline: &'a mut dyn Outline, position: usize) -> Self {
        let kind = outline
            .entry_at(position)
            .map_or(NodeKind::Document, NodeKind::Entry);
        Self::new(outline, kind)
    }

    pub fn document(outline: &'a mut dyn Outline) -> Self {
        Self::new(outline, NodeKind::Document)
    }

    /// The entry starting at `start`, if there is one.
    pub fn entry(outline: &'a mut dyn Outline, start: usize) -> Option<Self> {
        if start == 0 || !outline.has_entry(start) {
            return None;
        }
        Some(Self::new(outline, NodeKind::Entry(start)))
    }

    fn new(outline: &'a mut dyn Outline, kind: NodeKind) -> Self {
        Self {
            outline,
            kind,
            location: None,
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn start(&self) -> usize {
        self.kind.start()
    }

    pub fn is_document(&self) -> bool {
        self.kind == NodeKind::Document
    }

    /// Human readable description for messages.
    pub fn describe(&self) -> String {
        let file = self
            .outline
            .file_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<unsaved>".to_string());
        match self.kind {
            NodeKind::Document => format!("document {file}"),
            NodeKind::Entry(start) => format!("entry at {start} in {file}"),
        }
    }

    /// Absolute directory of the document's file.
    pub fn document_dir(&self) -> Option<PathBuf> {
        let parent = self.outline.file_path()?.parent()?;
        if parent.as_os_str().is_empty() {
            std::env::current_dir().ok()
        } else {
            std::path::absolute(parent).ok()
        }
    }

    /// Look up a property.
    ///
    /// The local entry is checked first. With `search_parents`, enclosing
    /// entries and finally the document are checked too. A document node
    /// reads document properties.
    pub fn get_property(&self, name: &str, search_parents: bool) -> Option<String> {
        let NodeKind::Entry(start) = self.kind else {
            return self.outline.document_property(name);
        };
        if let Some(value) = self.outline.entry_property(start, name) {
            return Some(value);
        }
        if !search_parents {
            return None;
        }
        let mut current = start;
        while let Some(parent) = self.outline.parent_entry(current) {
            if let Some(value) = self.outline.entry_property(parent, name) {
                trace!(name, parent, "Inherited property from ancestor");
                return Some(value);
            }
            current = parent;
        }
        self.outline.document_property(name)
    }

    /// [`get_property`](Self::get_property) with `search_parents` taken from
    /// the inheritance policy.
    pub fn property(&self, name: &str, inheritance: &Inheritance) -> Option<String> {
        self.get_property(name, inheritance.inherits(name))
    }

    /// Set or clear a property on the local entry, or on the document.
    pub fn set_property(&mut self, name: &str, value: Option<&str>) {
        let written = match self.kind {
            NodeKind::Entry(start) => self.outline.set_entry_property(start, name, value),
            NodeKind::Document => false,
        };
        if !written {
            self.outline.set_document_property(name, value);
        }
        if name.eq_ignore_ascii_case(DIR_PROPERTY) || name.eq_ignore_ascii_case(ID_PROPERTY) {
            self.location = None;
        }
    }

    /// The local `ID`, minting and storing one if there is none.
    pub fn id_get_or_create(&mut self, method: IdMethod) -> String {
        if let Some(id) = self.get_property(ID_PROPERTY, false) {
            return id;
        }
        let id = method.mint();
        trace!(node = self.start(), id, "Minted ID");
        self.set_property(ID_PROPERTY, Some(&id));
        id
    }

    /// Add, remove or flip `tag` on the local entry.
    ///
    /// Returns whether the tag is now set, or `None` for a document node,
    /// which carries no tags.
    pub fn toggle_tag(&mut self, tag: &str, action: TagAction) -> Option<bool> {
        let NodeKind::Entry(start) = self.kind else {
            return None;
        };
        let mut tags = self.outline.entry_tags(start);
        let present = tags.iter().any(|t| t == tag);
        let want = match action {
            TagAction::On => true,
            TagAction::Off => false,
            TagAction::Toggle => !present,
        };
        if want != present {
            if want {
                tags.push(tag.to_string());
            } else {
                tags.retain(|t| t != tag);
            }
            self.outline.set_entry_tags(start, tags);
        }
        Some(want)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        match self.kind {
            NodeKind::Entry(start) => self.outline.entry_tags(start).iter().any(|t| t == tag),
            NodeKind::Document => false,
        }
    }

    fn location(&mut self, config: &AttachConfig) -> Location {
        if let Some(location) = &self.location {
            return location.clone();
        }
        let inheritance = &config.use_inheritance;
        let location = if let Some(dir) = self.property(DIR_PROPERTY, inheritance) {
            Location::Dir(expand_path(&dir, self.document_dir().as_deref()))
        } else if let Some(id) = self.property(ID_PROPERTY, inheritance) {
            Location::Id(id)
        } else {
            Location::Nothing
        };
        self.location = Some(location.clone());
        location
    }

    /// Where the attachment directory is, or would be, without probing.
    ///
    /// `DIR` wins over `ID`.
    pub fn declared_dir(&mut self, config: &AttachConfig) -> Option<PathBuf> {
        match self.location(config) {
            Location::Dir(dir) => Some(dir),
            Location::Id(id) => config
                .id_resolver(self.document_dir().as_deref())
                .get_from_id(&id),
            Location::Nothing => None,
        }
    }

    /// Resolve the attachment directory.
    ///
    /// Without `no_fs_check` only directories that exist are returned; an
    /// `ID` is then resolved by probing every candidate base.
    pub async fn get_dir(
        &mut self,
        config: &AttachConfig,
        no_fs_check: bool,
    ) -> FsResult<Option<PathBuf>> {
        if no_fs_check {
            return Ok(self.declared_dir(config));
        }
        match self.location(config) {
            Location::Dir(dir) => {
                let exists = is_dir(&dir).await?;
                Ok(exists.then_some(dir))
            }
            Location::Id(id) => {
                config
                    .id_resolver(self.document_dir().as_deref())
                    .get_existing_from_id(&id)
                    .await
            }
            Location::Nothing => Ok(None),
        }
    }
}

impl fmt::Debug for AttachNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttachNode")
            .field("kind", &self.kind)
            .field("file", &self.outline.file_path())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outline() -> MemoryOutline {
        let mut outline = MemoryOutline::new();
        outline.add_entry(1, "Parent");
        outline.add_entry(2, "Child");
        outline
    }

    #[test]
    fn test_at_before_first_entry_is_document() {
        let mut outline = outline();
        assert!(AttachNode::at(&mut outline, 0).is_document());
        assert_eq!(AttachNode::at(&mut outline, 2).start(), 2);
        assert!(AttachNode::entry(&mut outline, 7).is_none());
    }

    #[test]
    fn test_get_property_inheritance() {
        let mut outline = outline();
        outline.set_entry_property(1, "ID", Some("parent-id"));
        outline.set_document_property("CATEGORY", Some("work"));

        let node = AttachNode::entry(&mut outline, 2).unwrap();
        assert_eq!(node.get_property("ID", false), None);
        assert_eq!(node.get_property("ID", true).as_deref(), Some("parent-id"));
        assert_eq!(node.get_property("CATEGORY", true).as_deref(), Some("work"));
        assert!(node.property("ID", &Inheritance::Never).is_none());
        assert!(node.property("ID", &Inheritance::Selective(vec!["ID".into()])).is_some());
    }

    #[test]
    fn test_set_property_on_document() {
        let mut outline = outline();
        let mut node = AttachNode::document(&mut outline);
        node.set_property("DIR", Some("/tmp/doc"));
        assert_eq!(node.get_property("DIR", false).as_deref(), Some("/tmp/doc"));
        drop(node);
        assert_eq!(outline.document_property("DIR").as_deref(), Some("/tmp/doc"));
    }

    #[test]
    fn test_id_get_or_create_is_stable() {
        let mut outline = outline();
        let mut node = AttachNode::entry(&mut outline, 1).unwrap();
        let first = node.id_get_or_create(IdMethod::Uuid);
        let second = node.id_get_or_create(IdMethod::Uuid);
        assert_eq!(first, second);
        assert_eq!(first.len(), 36);
    }

    #[test]
    fn test_toggle_tag() {
        let mut outline = outline();
        let mut node = AttachNode::entry(&mut outline, 1).unwrap();
        assert_eq!(node.toggle_tag("ATTACH", TagAction::Toggle), Some(true));
        assert_eq!(node.toggle_tag("ATTACH", TagAction::On), Some(true));
        assert!(node.has_tag("ATTACH"));
        assert_eq!(node.toggle_tag("ATTACH", TagAction::Toggle), Some(false));
        assert!(!node.has_tag("ATTACH"));

        let mut doc = AttachNode::document(&mut outline);
        assert_eq!(doc.toggle_tag("ATTACH", TagAction::On), None);
    }

    #[tokio::test]
    async fn test_local_dir_beats_ancestor_dir() {
        let mut outline = outline();
        outline.set_entry_property(1, "DIR", Some("/tmp/b"));
        outline.set_entry_property(2, "DIR", Some("/tmp/a"));
        let config = AttachConfig {
            use_inheritance: Inheritance::Always,
            ..AttachConfig::default()
        };

        let mut node = AttachNode::entry(&mut outline, 2).unwrap();
        let dir = node.get_dir(&config, true).await.unwrap();
        assert_eq!(dir, Some(PathBuf::from("/tmp/a")));
    }

    #[tokio::test]
    async fn test_dir_beats_id_and_cache_invalidates() {
        let mut outline = outline();
        outline.set_entry_property(1, "ID", Some("abcdef"));
        let config = AttachConfig {
            id_dir: PathBuf::from("/store"),
            ..AttachConfig::default()
        };

        let mut node = AttachNode::entry(&mut outline, 1).unwrap();
        assert_eq!(
            node.get_dir(&config, true).await.unwrap(),
            Some(PathBuf::from("/store/ab/cdef"))
        );
        node.set_property("DIR", Some("/elsewhere"));
        assert_eq!(
            node.get_dir(&config, true).await.unwrap(),
            Some(PathBuf::from("/elsewhere"))
        );
        // Not on disk
        assert_eq!(node.get_dir(&config, false).await.unwrap(), None);
    }
}
