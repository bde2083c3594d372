//! The outline document as seen by the attachment core.
//!
//! Entries are addressed by their start position, a positive integer that is
//! unique within one document. Position 0 stands for the document itself.

use std::path::Path;

/// Property and tag storage of one outline document.
pub trait Outline: Send {
    /// File the document is stored in, if any.
    fn file_path(&self) -> Option<&Path>;

    /// Start of the entry containing `position`, or `None` before the first
    /// entry.
    fn entry_at(&self, position: usize) -> Option<usize>;

    fn has_entry(&self, start: usize) -> bool;

    /// Start of the enclosing entry, `None` at top level.
    fn parent_entry(&self, start: usize) -> Option<usize>;

    fn entry_property(&self, start: usize, name: &str) -> Option<String>;

    /// Set (`Some`) or remove (`None`) an entry property. Returns false when
    /// there is no entry at `start`.
    fn set_entry_property(&mut self, start: usize, name: &str, value: Option<&str>) -> bool;

    fn document_property(&self, name: &str) -> Option<String>;

    fn set_document_property(&mut self, name: &str, value: Option<&str>);

    fn entry_tags(&self, start: usize) -> Vec<String>;

    /// Replace the tags of an entry. Returns false when there is no entry.
    fn set_entry_tags(&mut self, start: usize, tags: Vec<String>) -> bool;

    /// Start positions of every entry, in document order.
    fn entry_starts(&self) -> Vec<usize>;
}
