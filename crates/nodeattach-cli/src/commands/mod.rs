//! Subcommand implementations.
//!
//! Every command works on one node of one outline document, held by a
//! [`Session`] for the duration of the run.

pub mod attach;
pub mod dir;
pub mod ls;
pub mod open;
pub mod rm;
pub mod sync;

use nodeattach_core::Attacher;
use nodeattach_core::node::{AttachNode, MemoryOutline};

/// The loaded document, the attacher and the node selected on the command line.
pub struct Session {
    pub attacher: Attacher,
    pub outline: MemoryOutline,
    /// Position inside the document; `None` selects the document itself.
    pub at: Option<usize>,
    pub quiet: bool,
}

impl Session {
    pub fn new(attacher: Attacher, outline: MemoryOutline, at: Option<usize>, quiet: bool) -> Self {
        Self {
            attacher,
            outline,
            at,
            quiet,
        }
    }

    /// The attacher together with the selected node.
    pub fn node(&mut self) -> (&Attacher, AttachNode<'_>) {
        let node = match self.at {
            Some(position) => AttachNode::at(&mut self.outline, position),
            None => AttachNode::document(&mut self.outline),
        };
        (&self.attacher, node)
    }

    /// Print a status line unless running quietly.
    pub fn report(&self, message: impl std::fmt::Display) {
        if !self.quiet {
            eprintln!("{message}");
        }
    }
}
