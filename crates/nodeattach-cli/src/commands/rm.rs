//! Remove commands - delete attachments, the whole directory, or apply the
//! archive policy.
//!
//! # Examples
//!
//! ```bash
//! nodeattach --doc notes.json --at 120 rm draft.txt old-figures
//! nodeattach --doc notes.json --at 120 rm --all --recursive always
//! ```

use anyhow::{Result, bail};
use clap::Args as ClapArgs;
use tracing::instrument;

use nodeattach_core::Decision;

use super::Session;
use super::dir::parse_decision;

#[derive(ClapArgs)]
pub struct Args {
    /// Attachments to delete
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    pub names: Vec<String>,

    /// Delete the whole attachment directory
    #[arg(short, long)]
    pub all: bool,

    /// Delete a non-empty directory (always, never, ask); defaults to ask
    #[arg(short, long, requires = "all", value_parser = parse_decision)]
    pub recursive: Option<Decision>,
}

#[instrument(level = "info", name = "cmd::rm", skip_all, fields(all = args.all))]
pub async fn execute(session: &mut Session, args: &Args) -> Result<()> {
    if args.all {
        let (attacher, mut node) = session.node();
        attacher.delete_all(&mut node, args.recursive).await?;
        session.report("Deleted attachment directory");
        return Ok(());
    }

    let mut failed = 0;
    for name in &args.names {
        let (attacher, mut node) = session.node();
        let result = attacher.delete_one(&mut node, name).await;
        match result {
            Ok(()) => session.report(format!("Deleted {name}")),
            Err(e) if e.is_cancelled() => return Err(e.into()),
            Err(e) => {
                eprintln!("Failed to delete {name}: {e}");
                failed += 1;
            }
        }
    }
    if failed > 0 {
        bail!("{failed} of {} deletions failed", args.names.len());
    }
    Ok(())
}

#[instrument(level = "info", name = "cmd::archive", skip_all)]
pub async fn archive(session: &mut Session) -> Result<()> {
    let (attacher, mut node) = session.node();
    let deleted = attacher.archive(&mut node).await?;
    if deleted {
        session.report("Deleted attachments of archived node");
    }
    Ok(())
}
