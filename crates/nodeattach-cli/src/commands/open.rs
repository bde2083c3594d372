//! Open command - print the path of an attachment, or of the attachment
//! directory, for handing to another program.
//!
//! ```bash
//! xdg-open "$(nodeattach --doc notes.json --at 120 open report.pdf)"
//! cd "$(nodeattach --doc notes.json --at 120 open)"
//! ```

use anyhow::Result;
use clap::Args as ClapArgs;
use tracing::instrument;

use super::Session;

#[derive(ClapArgs)]
pub struct Args {
    /// Attachment to open; without it the directory is opened (and created)
    pub name: Option<String>,
}

#[instrument(level = "info", name = "cmd::open", skip_all)]
pub async fn execute(session: &mut Session, args: &Args) -> Result<()> {
    let (attacher, mut node) = session.node();
    let path = match &args.name {
        Some(name) => attacher.open(&mut node, name).await?,
        None => attacher.reveal(&mut node).await?,
    };
    println!("{}", path.display());
    Ok(())
}
