//! Attachment configuration.
//!
//! [`AttachConfig`] is passed by value into the orchestrator; nothing in the
//! core reads configuration from global state. Every field has a default, so
//! an empty TOML table (or `AttachConfig::default()`) is a valid configuration.
//!
//! # Example
//!
//! ```toml
//! method = "lns"
//! dir-relative-paths = true
//! id-dir = "attachments"
//! id-to-path = ["ts-folder", "fallback"]
//! id-method = "timestamp"
//! use-inheritance = { selective = ["DIR", "ID"] }
//! sync-delete-empty-dir = "always"
//! auto-tag = ""
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::collab::Decision;
use crate::error::{AttachError, Result};
use crate::id::{IdResolver, IdStrategy};

/// How a source file is imported into an attachment directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum AttachMethod {
    /// Rename the source into place.
    Mv,
    /// Copy, recursing into directories.
    #[default]
    Cp,
    /// Hard link.
    Ln,
    /// Symbolic link.
    Lns,
}

impl AttachMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            AttachMethod::Mv => "mv",
            AttachMethod::Cp => "cp",
            AttachMethod::Ln => "ln",
            AttachMethod::Lns => "lns",
        }
    }
}

impl FromStr for AttachMethod {
    type Err = AttachError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mv" | "move" => Ok(AttachMethod::Mv),
            "cp" | "copy" => Ok(AttachMethod::Cp),
            "ln" | "hardlink" => Ok(AttachMethod::Ln),
            "lns" | "symlink" => Ok(AttachMethod::Lns),
            other => Err(AttachError::invalid_config("method", other)),
        }
    }
}

impl TryFrom<String> for AttachMethod {
    type Error = AttachError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// How a directory is assigned to a node that has neither `DIR` nor `ID`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum NewDirMethod {
    #[default]
    Id,
    Dir,
    Ask,
}

impl FromStr for NewDirMethod {
    type Err = AttachError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "id" => Ok(NewDirMethod::Id),
            "dir" => Ok(NewDirMethod::Dir),
            "ask" => Ok(NewDirMethod::Ask),
            other => Err(AttachError::invalid_config("preferred-new-method", other)),
        }
    }
}

impl TryFrom<String> for NewDirMethod {
    type Error = AttachError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// How fresh `ID` values are generated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum IdMethod {
    #[default]
    Uuid,
    /// Local time, `YYYYMMDDTHHMMSS.ffffff`. Pairs with the `ts-folder` strategy.
    Timestamp,
}

impl IdMethod {
    /// Generate a new identifier.
    pub fn mint(self) -> String {
        match self {
            IdMethod::Uuid => uuid::Uuid::new_v4().to_string(),
            IdMethod::Timestamp => chrono::Local::now()
                .format("%Y%m%dT%H%M%S%.6f")
                .to_string(),
        }
    }
}

impl FromStr for IdMethod {
    type Err = AttachError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "uuid" => Ok(IdMethod::Uuid),
            "timestamp" | "ts" => Ok(IdMethod::Timestamp),
            other => Err(AttachError::invalid_config("id-method", other)),
        }
    }
}

impl TryFrom<String> for IdMethod {
    type Error = AttachError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// Whether property lookups fall back to ancestors and the document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "InheritanceRepr")]
pub enum Inheritance {
    Always,
    Never,
    /// Only the named properties are inherited.
    Selective(Vec<String>),
}

impl Default for Inheritance {
    fn default() -> Self {
        Inheritance::Selective(Vec::new())
    }
}

impl Inheritance {
    /// Default `search_parents` for the property `name`.
    pub fn inherits(&self, name: &str) -> bool {
        match self {
            Inheritance::Always => true,
            Inheritance::Never => false,
            Inheritance::Selective(names) => names.iter().any(|n| n.eq_ignore_ascii_case(name)),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum InheritanceRepr {
    Flag(bool),
    Name(String),
    Names(Vec<String>),
    Selective { selective: Vec<String> },
}

impl TryFrom<InheritanceRepr> for Inheritance {
    type Error = AttachError;

    fn try_from(repr: InheritanceRepr) -> Result<Self> {
        match repr {
            InheritanceRepr::Flag(true) => Ok(Inheritance::Always),
            InheritanceRepr::Flag(false) => Ok(Inheritance::Never),
            InheritanceRepr::Name(name) => match name.as_str() {
                "always" => Ok(Inheritance::Always),
                "never" => Ok(Inheritance::Never),
                "selective" => Ok(Inheritance::default()),
                _ => Err(AttachError::invalid_config("use-inheritance", name)),
            },
            InheritanceRepr::Names(names) | InheritanceRepr::Selective { selective: names } => {
                Ok(Inheritance::Selective(names))
            }
        }
    }
}

/// Options of the attachment core.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AttachConfig {
    /// Default import strategy.
    pub method: AttachMethod,
    /// Store `DIR` relative to the document instead of absolute.
    pub dir_relative_paths: bool,
    /// Base of ID-derived directories, relative to the document's directory.
    pub id_dir: PathBuf,
    /// Secondary base searched when looking for existing ID directories.
    pub id_fallback_dir: Option<PathBuf>,
    pub id_to_path: Vec<IdStrategy>,
    pub id_method: IdMethod,
    pub use_inheritance: Inheritance,
    pub preferred_new_method: NewDirMethod,
    /// Reproduce a symlinked attachment directory as a link when copying it.
    pub copy_symlink_as_symlink: bool,
    pub sync_delete_empty_dir: Decision,
    /// Tag toggled on attach, delete and sync. Empty disables tagging.
    pub auto_tag: String,
    pub archive_delete: Decision,
    /// Files ending in this suffix don't count as attachments.
    pub litter_suffix: String,
    pub store_link: bool,
    /// Imports running at once in `attach_many`.
    pub max_concurrency: usize,
    pub await_timeout_secs: u64,
}

impl Default for AttachConfig {
    fn default() -> Self {
        Self {
            method: AttachMethod::default(),
            dir_relative_paths: false,
            id_dir: PathBuf::from("data"),
            id_fallback_dir: None,
            id_to_path: IdStrategy::defaults(),
            id_method: IdMethod::default(),
            use_inheritance: Inheritance::default(),
            preferred_new_method: NewDirMethod::default(),
            copy_symlink_as_symlink: false,
            sync_delete_empty_dir: Decision::Ask,
            auto_tag: "ATTACH".to_string(),
            archive_delete: Decision::Never,
            litter_suffix: "~".to_string(),
            store_link: true,
            max_concurrency: 32,
            await_timeout_secs: 86_400,
        }
    }
}

impl AttachConfig {
    /// Reject values that deserialize but can't be used.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            return Err(AttachError::invalid_config("max-concurrency", "0"));
        }
        if self.id_to_path.is_empty() {
            return Err(AttachError::invalid_config("id-to-path", "[]"));
        }
        Ok(())
    }

    pub fn auto_tag(&self) -> Option<&str> {
        Some(self.auto_tag.as_str()).filter(|tag| !tag.is_empty())
    }

    pub fn await_timeout(&self) -> Duration {
        Duration::from_secs(self.await_timeout_secs)
    }

    pub fn is_litter(&self, name: &str) -> bool {
        !self.litter_suffix.is_empty() && name.ends_with(&self.litter_suffix)
    }

    /// Build the ID resolver for a document living in `doc_dir`.
    ///
    /// The primary base is `id-dir` under the document's directory. The
    /// fallback base is `id-fallback-dir` if set, otherwise `id-dir` taken
    /// relative to the working directory, when that is a different place.
    pub fn id_resolver(&self, doc_dir: Option<&Path>) -> IdResolver {
        let base = match doc_dir {
            Some(dir) => dir.join(&self.id_dir),
            None => self.id_dir.clone(),
        };
        let fallback = match &self.id_fallback_dir {
            Some(dir) => Some(dir.clone()),
            None => std::path::absolute(&self.id_dir).ok(),
        };
        let resolver = IdResolver::new(base, self.id_to_path.clone());
        match fallback {
            Some(fallback) if fallback != resolver.base() => resolver.with_fallback_base(fallback),
            _ => resolver,
        }
    }
}
