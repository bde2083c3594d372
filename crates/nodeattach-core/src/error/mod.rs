//! Error types for the attachment core.
//!
//! Filesystem failures are reported by [`FsError`] (from the operations
//! layer) and remote fetch failures by [`DownloadError`]. Everything the
//! orchestrator can fail with is collected in [`AttachError`].

use thiserror::Error;

pub use crate::fs::download::DownloadError;
pub use crate::fs::ops::FsError;

/// Convenience alias used throughout the orchestrator.
pub type Result<T, E = AttachError> = std::result::Result<T, E>;

/// Errors raised by attachment operations.
#[derive(Error, Debug)]
pub enum AttachError {
    /// A filesystem primitive failed.
    #[error(transparent)]
    Fs(#[from] FsError),

    /// Fetching a remote attachment failed.
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Neither a `DIR` nor an `ID` property resolves to a directory.
    #[error("No attachment directory associated with {node}")]
    NoAttachmentDirectory { node: String },

    /// The source has no usable base name (e.g. it ends in a separator).
    #[error("Cannot determine an attachment name from '{source_name}'")]
    CannotDetermineName { source_name: String },

    /// No configured ID-to-path strategy produced a path.
    #[error("No ID-to-path strategy produced a directory for ID '{id}'")]
    IdPathResolutionFailed { id: String },

    /// An interactive prompt was aborted.
    ///
    /// This is distinct from answering "no": it aborts the whole pending
    /// operation and is not decorated as an error by front ends.
    #[error("Cancelled by user")]
    UserCancelled,

    /// A configuration value was not recognized.
    #[error("Invalid value '{value}' for option '{option}'")]
    InvalidConfiguration { option: &'static str, value: String },
}

impl AttachError {
    pub(crate) fn invalid_config(option: &'static str, value: impl Into<String>) -> Self {
        AttachError::InvalidConfiguration {
            option,
            value: value.into(),
        }
    }

    /// True when the error is a user cancellation rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AttachError::UserCancelled)
    }
}
