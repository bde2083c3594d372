//! List command - show the attachments of a node.
//!
//! # Examples
//!
//! ```bash
//! # Names only
//! nodeattach --doc notes.json --at 120 ls
//!
//! # With details
//! nodeattach --doc notes.json --at 120 ls -l
//!
//! # Output as JSON for scripting
//! nodeattach --doc notes.json --at 120 ls --json | jq '.entries[].name'
//! ```

use std::path::Path;

use anyhow::Result;
use clap::Args as ClapArgs;
use comfy_table::Cell;
use serde::Serialize;
use tracing::instrument;

use crate::output::{attachment_table, entry_marker, format_size};

use super::Session;

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Show detailed information
    #[arg(short, long)]
    pub long: bool,

    /// Output as JSON
    #[arg(long, conflicts_with = "long")]
    pub json: bool,
}

/// JSON output format for ls command
#[derive(Serialize)]
struct LsOutput {
    dir: String,
    entries: Vec<EntryInfo>,
}

#[derive(Serialize)]
struct EntryInfo {
    name: String,
    #[serde(rename = "type")]
    entry_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<String>,
}

impl EntryInfo {
    fn read(dir: &Path, name: String) -> Self {
        let path = dir.join(&name);
        let meta = std::fs::symlink_metadata(&path).ok();
        let file_type = meta.as_ref().map(std::fs::Metadata::file_type);
        let is_symlink = file_type.is_some_and(|t| t.is_symlink());
        let size = meta.as_ref().filter(|m| m.is_file()).map(std::fs::Metadata::len);
        let target = is_symlink
            .then(|| std::fs::read_link(&path).ok())
            .flatten()
            .map(|t| t.display().to_string());
        Self {
            name,
            entry_type: entry_marker(file_type),
            size,
            target,
        }
    }
}

#[instrument(level = "info", name = "cmd::ls", skip_all)]
pub async fn execute(session: &mut Session, args: &Args) -> Result<()> {
    let (attacher, mut node) = session.node();
    let dir = attacher.dir(&mut node, false).await?;
    let names = attacher.list(&mut node).await?;

    if !args.long && !args.json {
        for name in names {
            println!("{name}");
        }
        return Ok(());
    }

    let entries: Vec<EntryInfo> = names
        .into_iter()
        .map(|name| EntryInfo::read(&dir, name))
        .collect();

    if args.json {
        let output = LsOutput {
            dir: dir.display().to_string(),
            entries,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let mut table = attachment_table();
    for entry in entries {
        let name = match &entry.target {
            Some(target) => format!("{} -> {target}", entry.name),
            None => entry.name.clone(),
        };
        table.add_row(vec![
            Cell::new(entry.entry_type),
            Cell::new(entry.size.map(format_size).unwrap_or_default()),
            Cell::new(name),
        ]);
    }
    println!("{}", dir.display());
    println!("{table}");
    Ok(())
}
