//! Collaborator interfaces used by the orchestrator.
//!
//! The core never talks to a user interface or an event bus directly. Front
//! ends plug in implementations of [`EventSink`], [`Prompter`] and
//! [`LinkStore`]; the implementations in this module cover logging, tests and
//! non-interactive use.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{AttachError, Result};

// ==================== Events ====================

/// Notifications fired after attachment state changes.
///
/// `node` is the start position of the node (0 for a whole document).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachEvent {
    /// The contents of a node's attachment directory changed.
    Changed { node: usize, dir: Option<PathBuf> },
    /// An attachment (or the directory itself) was opened.
    Opened { node: usize, path: PathBuf },
}

/// Fire-and-forget receiver of [`AttachEvent`]s.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: AttachEvent);
}

/// Logs every event and drops it.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEvents;

impl EventSink for TracingEvents {
    fn emit(&self, event: AttachEvent) {
        match event {
            AttachEvent::Changed { node, dir } => {
                info!(node, dir = ?dir, "Attachments changed");
            }
            AttachEvent::Opened { node, path } => {
                info!(node, path = %path.display(), "Attachment opened");
            }
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingEvents {
    events: Mutex<Vec<AttachEvent>>,
}

impl RecordingEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events recorded so far.
    pub fn events(&self) -> Vec<AttachEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn changed_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, AttachEvent::Changed { .. }))
            .count()
    }
}

impl EventSink for RecordingEvents {
    fn emit(&self, event: AttachEvent) {
        debug!(?event, "Recording event");
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

// ==================== Prompts ====================

/// Interactive questions asked on behalf of the core.
///
/// Every method may fail with [`AttachError::UserCancelled`], which aborts the
/// operation that asked. Declining is a normal answer, not an error.
#[async_trait]
pub trait Prompter: Send + Sync {
    /// Yes/no question.
    async fn confirm(&self, question: &str) -> Result<bool>;

    /// Free-text input, with an optional pre-filled answer.
    async fn read_text(&self, prompt: &str, initial: Option<&str>) -> Result<String>;

    /// Pick one of `choices`, returning its index.
    async fn choose(&self, prompt: &str, choices: &[&str]) -> Result<usize>;
}

/// Answers every prompt the same way.
#[derive(Debug, Clone)]
pub struct FixedPrompter {
    answer: Option<bool>,
    text: Option<String>,
    choice: usize,
}

impl FixedPrompter {
    /// Says yes, picks the first choice and accepts pre-filled text.
    pub fn yes() -> Self {
        Self {
            answer: Some(true),
            text: None,
            choice: 0,
        }
    }

    /// Says no; text and choice prompts are cancelled.
    pub fn no() -> Self {
        Self {
            answer: Some(false),
            text: None,
            choice: 0,
        }
    }

    /// Cancels every prompt.
    pub fn cancel() -> Self {
        Self {
            answer: None,
            text: None,
            choice: 0,
        }
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    #[must_use]
    pub fn with_choice(mut self, choice: usize) -> Self {
        self.choice = choice;
        self
    }
}

#[async_trait]
impl Prompter for FixedPrompter {
    async fn confirm(&self, question: &str) -> Result<bool> {
        debug!(question, answer = ?self.answer, "Fixed answer");
        self.answer.ok_or(AttachError::UserCancelled)
    }

    async fn read_text(&self, _prompt: &str, initial: Option<&str>) -> Result<String> {
        match (&self.text, self.answer) {
            (Some(text), _) => Ok(text.clone()),
            (None, Some(true)) => initial
                .map(str::to_string)
                .ok_or(AttachError::UserCancelled),
            _ => Err(AttachError::UserCancelled),
        }
    }

    async fn choose(&self, _prompt: &str, choices: &[&str]) -> Result<usize> {
        if self.answer.is_some() && self.choice < choices.len() {
            Ok(self.choice)
        } else {
            Err(AttachError::UserCancelled)
        }
    }
}

/// A policy that is either fixed or asked at the point of use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum Decision {
    Always,
    Never,
    Ask,
}

impl Decision {
    /// Turn the policy into a yes/no answer, asking `prompter` if needed.
    pub async fn resolve(self, prompter: &dyn Prompter, question: &str) -> Result<bool> {
        match self {
            Decision::Always => Ok(true),
            Decision::Never => Ok(false),
            Decision::Ask => prompter.confirm(question).await,
        }
    }
}

impl From<bool> for Decision {
    fn from(value: bool) -> Self {
        if value { Decision::Always } else { Decision::Never }
    }
}

impl FromStr for Decision {
    type Err = AttachError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "always" | "yes" | "true" => Ok(Decision::Always),
            "never" | "no" | "false" => Ok(Decision::Never),
            "ask" => Ok(Decision::Ask),
            other => Err(AttachError::invalid_config("decision", other)),
        }
    }
}

impl TryFrom<String> for Decision {
    type Error = AttachError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

// ==================== Links ====================

/// Reverse link from an attachment back to where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredLink {
    /// Location of the attachment.
    pub path: PathBuf,
    /// Original source (file path or URL).
    pub source: String,
    pub description: String,
}

impl StoredLink {
    pub fn new(path: &Path, source: impl Into<String>) -> Self {
        let description = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path: path.to_path_buf(),
            source: source.into(),
            description,
        }
    }
}

/// Registry of reverse links.
pub trait LinkStore: Send + Sync {
    fn store(&self, link: StoredLink);
}

/// Link registry kept in memory.
#[derive(Debug, Default)]
pub struct MemoryLinks {
    links: Mutex<Vec<StoredLink>>,
}

impl MemoryLinks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn links(&self) -> Vec<StoredLink> {
        self.links
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl LinkStore for MemoryLinks {
    fn store(&self, link: StoredLink) {
        self.links
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(link);
    }
}
