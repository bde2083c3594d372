//! Attach commands - import files, downloads and stdin into a node.
//!
//! # Examples
//!
//! ```bash
//! # Copy two files into the attachment directory of the heading at 120
//! nodeattach --doc notes.json --at 120 attach report.pdf figures/
//!
//! # Symlink instead of copying
//! nodeattach --doc notes.json --at 120 attach --method lns ~/big.iso
//!
//! # Download a file
//! nodeattach --doc notes.json --at 120 attach-url https://example.org/paper.pdf
//!
//! # Save clipboard contents
//! pbpaste | nodeattach --doc notes.json --at 120 attach-buffer snippet.txt
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args as ClapArgs;
use tokio::io::AsyncReadExt;
use tracing::instrument;

use nodeattach_core::config::AttachMethod;

use super::Session;

#[derive(ClapArgs)]
pub struct AttachArgs {
    /// Files or directories to attach
    #[arg(required = true)]
    pub sources: Vec<PathBuf>,

    /// Import method (mv, cp, ln, lns); defaults to the configured method
    #[arg(short, long, value_parser = parse_method)]
    pub method: Option<AttachMethod>,
}

#[derive(ClapArgs)]
pub struct AttachUrlArgs {
    /// URL to download (http, https or file)
    pub url: String,

    /// Attachment name; defaults to the last path segment of the URL
    #[arg(short, long)]
    pub name: Option<String>,
}

#[derive(ClapArgs)]
pub struct AttachBufferArgs {
    /// Name of the new attachment
    pub name: String,
}

#[derive(ClapArgs)]
pub struct NewArgs {
    /// Name of the new, empty attachment
    pub name: String,
}

fn parse_method(s: &str) -> Result<AttachMethod, String> {
    s.parse().map_err(|e: nodeattach_core::AttachError| e.to_string())
}

#[instrument(level = "info", name = "cmd::attach", skip_all, fields(count = args.sources.len()))]
pub async fn execute(session: &mut Session, args: &AttachArgs) -> Result<()> {
    if let [source] = args.sources.as_slice() {
        let (attacher, mut node) = session.node();
        let attached = attacher.attach(&mut node, source, args.method).await?;
        match attached {
            Some(name) => session.report(format!("Attached {name}")),
            None => session.report(format!("{} is already attached", source.display())),
        }
        return Ok(());
    }

    let (attacher, mut node) = session.node();
    let tally = attacher
        .attach_many(&mut node, &args.sources, args.method)
        .await?;
    for (source, error) in &tally.errors {
        eprintln!("Failed to attach {}: {error}", source.display());
    }
    session.report(format!(
        "Attached {} of {} files",
        tally.successes,
        args.sources.len()
    ));
    if tally.failures > 0 {
        bail!("{} of {} attachments failed", tally.failures, args.sources.len());
    }
    Ok(())
}

#[instrument(level = "info", name = "cmd::attach_url", skip_all, fields(url = %args.url))]
pub async fn url(session: &mut Session, args: &AttachUrlArgs) -> Result<()> {
    let (attacher, mut node) = session.node();
    let attached = attacher
        .attach_url(&mut node, &args.url, args.name.as_deref())
        .await?;
    if let Some(name) = attached {
        session.report(format!("Attached {name}"));
    }
    Ok(())
}

#[instrument(level = "info", name = "cmd::attach_buffer", skip_all, fields(name = %args.name))]
pub async fn buffer(session: &mut Session, args: &AttachBufferArgs) -> Result<()> {
    let mut contents = Vec::new();
    tokio::io::stdin()
        .read_to_end(&mut contents)
        .await
        .context("Failed to read attachment contents from stdin")?;

    let (attacher, mut node) = session.node();
    let name = attacher
        .attach_buffer(&mut node, &args.name, &contents)
        .await?;
    session.report(format!("Attached {name} ({} bytes)", contents.len()));
    Ok(())
}

#[instrument(level = "info", name = "cmd::new", skip_all, fields(name = %args.name))]
pub async fn new_file(session: &mut Session, args: &NewArgs) -> Result<()> {
    let (attacher, mut node) = session.node();
    let path = attacher.new_file(&mut node, &args.name).await?;
    println!("{}", path.display());
    Ok(())
}
