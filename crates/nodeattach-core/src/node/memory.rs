//! In-memory outline with JSON persistence.
//!
//! ```json
//! {
//!   "properties": { "DIR": "attachments" },
//!   "entries": [
//!     { "start": 1, "level": 1, "title": "Project", "properties": { "ID": "abcdef" }, "tags": [] },
//!     { "start": 2, "level": 2, "title": "Meeting notes" }
//!   ]
//! }
//! ```
//!
//! Property names are case-insensitive and stored upper-case.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::outline::Outline;

#[derive(Error, Debug)]
pub enum OutlineError {
    #[error("Failed to access outline file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse outline file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Outline has no file to save to")]
    NoFile,

    #[error("Invalid outline: {0}")]
    Invalid(String),
}

/// One heading of the outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineEntry {
    pub start: usize,
    pub level: u8,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryOutline {
    #[serde(skip)]
    path: Option<PathBuf>,
    #[serde(default)]
    properties: BTreeMap<String, String>,
    #[serde(default)]
    entries: Vec<OutlineEntry>,
}

impl MemoryOutline {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty outline that will be saved to `path`.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Read an outline from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, OutlineError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| OutlineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut outline: MemoryOutline =
            serde_json::from_str(&content).map_err(|source| OutlineError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        outline.normalize()?;
        outline.path = Some(path.to_path_buf());
        debug!(path = %path.display(), entries = outline.entries.len(), "Loaded outline");
        Ok(outline)
    }

    /// Write the outline back to the file it was loaded from.
    pub fn save(&self) -> Result<(), OutlineError> {
        let path = self.path.as_ref().ok_or(OutlineError::NoFile)?;
        let content = serde_json::to_string_pretty(self).map_err(|source| OutlineError::Parse {
            path: path.clone(),
            source,
        })?;
        std::fs::write(path, content).map_err(|source| OutlineError::Io {
            path: path.clone(),
            source,
        })
    }

    fn normalize(&mut self) -> Result<(), OutlineError> {
        let mut previous = 0;
        for entry in &mut self.entries {
            if entry.start <= previous {
                return Err(OutlineError::Invalid(format!(
                    "entry starts must be positive and increasing, got {} after {previous}",
                    entry.start
                )));
            }
            previous = entry.start;
            entry.properties = std::mem::take(&mut entry.properties)
                .into_iter()
                .map(|(k, v)| (k.to_ascii_uppercase(), v))
                .collect();
        }
        self.properties = std::mem::take(&mut self.properties)
            .into_iter()
            .map(|(k, v)| (k.to_ascii_uppercase(), v))
            .collect();
        Ok(())
    }

    /// Append an entry and return its start position.
    pub fn add_entry(&mut self, level: u8, title: impl Into<String>) -> usize {
        let start = self.entries.last().map_or(1, |e| e.start + 1);
        self.entries.push(OutlineEntry {
            start,
            level,
            title: title.into(),
            properties: BTreeMap::new(),
            tags: Vec::new(),
        });
        start
    }

    pub fn entries(&self) -> &[OutlineEntry] {
        &self.entries
    }

    pub fn entry(&self, start: usize) -> Option<&OutlineEntry> {
        let idx = self.entries.binary_search_by_key(&start, |e| e.start).ok()?;
        self.entries.get(idx)
    }

    fn entry_mut(&mut self, start: usize) -> Option<&mut OutlineEntry> {
        let idx = self.entries.binary_search_by_key(&start, |e| e.start).ok()?;
        self.entries.get_mut(idx)
    }
}

fn put(map: &mut BTreeMap<String, String>, name: &str, value: Option<&str>) {
    let key = name.to_ascii_uppercase();
    match value {
        Some(value) => {
            map.insert(key, value.to_string());
        }
        None => {
            map.remove(&key);
        }
    }
}

impl Outline for MemoryOutline {
    fn file_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn entry_at(&self, position: usize) -> Option<usize> {
        self.entries
            .iter()
            .take_while(|e| e.start <= position)
            .last()
            .map(|e| e.start)
    }

    fn has_entry(&self, start: usize) -> bool {
        self.entry(start).is_some()
    }

    fn parent_entry(&self, start: usize) -> Option<usize> {
        let idx = self.entries.binary_search_by_key(&start, |e| e.start).ok()?;
        let level = self.entries[idx].level;
        self.entries[..idx]
            .iter()
            .rev()
            .find(|e| e.level < level)
            .map(|e| e.start)
    }

    fn entry_property(&self, start: usize, name: &str) -> Option<String> {
        self.entry(start)?
            .properties
            .get(&name.to_ascii_uppercase())
            .cloned()
    }

    fn set_entry_property(&mut self, start: usize, name: &str, value: Option<&str>) -> bool {
        match self.entry_mut(start) {
            Some(entry) => {
                put(&mut entry.properties, name, value);
                true
            }
            None => false,
        }
    }

    fn document_property(&self, name: &str) -> Option<String> {
        self.properties.get(&name.to_ascii_uppercase()).cloned()
    }

    fn set_document_property(&mut self, name: &str, value: Option<&str>) {
        put(&mut self.properties, name, value);
    }

    fn entry_tags(&self, start: usize) -> Vec<String> {
        self.entry(start).map(|e| e.tags.clone()).unwrap_or_default()
    }

    fn set_entry_tags(&mut self, start: usize, tags: Vec<String>) -> bool {
        match self.entry_mut(start) {
            Some(entry) => {
                entry.tags = tags;
                true
            }
            None => false,
        }
    }

    fn entry_starts(&self) -> Vec<usize> {
        self.entries.iter().map(|e| e.start).collect()
    }
}
