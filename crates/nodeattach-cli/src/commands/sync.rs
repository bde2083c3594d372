//! Sync command - reconcile tags with what is on disk.
//!
//! ```bash
//! # One node
//! nodeattach --doc notes.json --at 120 sync
//!
//! # Every node of the document, removing empty directories without asking
//! nodeattach --doc notes.json sync --all --delete-empty always
//! ```

use anyhow::Result;
use clap::Args as ClapArgs;
use tracing::instrument;

use nodeattach_core::Decision;
use nodeattach_core::node::Outline;

use super::Session;
use super::dir::parse_decision;

#[derive(ClapArgs)]
pub struct Args {
    /// Sync the document and every entry
    #[arg(short, long)]
    pub all: bool,

    /// Delete an empty attachment directory (always, never, ask);
    /// defaults to the configured policy
    #[arg(long, value_parser = parse_decision)]
    pub delete_empty: Option<Decision>,
}

#[instrument(level = "info", name = "cmd::sync", skip_all, fields(all = args.all))]
pub async fn execute(session: &mut Session, args: &Args) -> Result<()> {
    if args.all {
        let mut starts = session.outline.entry_starts();
        starts.push(0);
        let synced = session
            .attacher
            .sync_all(&mut session.outline, starts, args.delete_empty)
            .await?;
        session.report(format!("Synced {synced} nodes"));
        return Ok(());
    }

    let (attacher, mut node) = session.node();
    attacher.sync(&mut node, args.delete_empty).await?;
    Ok(())
}
