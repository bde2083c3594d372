//! Attachment directories for outline nodes.
//!
//! Every entry of an outline document (or the document as a whole) can own a
//! directory of attached files. The directory is either named explicitly by a
//! `DIR` property or derived from the node's `ID`. This crate resolves those
//! directories, creates and relocates them, and imports, deletes and syncs
//! the files inside, on top of an async filesystem layer.

pub mod attach;
pub mod collab;
pub mod config;
pub mod error;
pub mod fs;
pub mod id;
pub mod node;
pub mod transaction;

pub use attach::{AttachTally, Attacher, DirPolicy};
pub use collab::{AttachEvent, Decision};
pub use config::AttachConfig;
pub use error::AttachError;
pub use node::AttachNode;
