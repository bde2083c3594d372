//! Directory commands: show, assign, relocate and drop a node's attachment
//! directory, and print its ID.
//!
//! # Examples
//!
//! ```bash
//! # Where do the attachments of the heading at position 3 live?
//! nodeattach --doc notes.json --at 3 dir
//!
//! # Create it if needed
//! nodeattach --doc notes.json --at 3 dir --create
//!
//! # Move the attachments somewhere else
//! nodeattach --doc notes.json --at 3 set-dir ~/papers/smith --copy always --delete always
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::Args as ClapArgs;
use tracing::instrument;

use nodeattach_core::config::NewDirMethod;
use nodeattach_core::{Decision, DirPolicy};

use super::Session;

#[derive(ClapArgs)]
pub struct DirArgs {
    /// Create the directory if it does not exist
    #[arg(short, long)]
    pub create: bool,

    /// How to assign a directory to a node without DIR or ID (id, dir, ask)
    #[arg(long, requires = "create", value_parser = parse_new_dir_method)]
    pub method: Option<NewDirMethod>,

    /// Directory to use with `--method dir`
    #[arg(long, requires = "create")]
    pub new_dir: Option<PathBuf>,

    /// Print the declared location even if it does not exist
    #[arg(long, conflicts_with = "create")]
    pub no_fs_check: bool,
}

#[derive(ClapArgs)]
pub struct SetDirArgs {
    /// New attachment directory
    pub path: PathBuf,

    /// Copy the old directory's contents (always, never, ask)
    #[arg(long, default_value = "ask", value_parser = parse_decision)]
    pub copy: Decision,

    /// Delete the old directory afterwards (always, never, ask)
    #[arg(long, default_value = "ask", value_parser = parse_decision)]
    pub delete: Decision,
}

#[derive(ClapArgs)]
pub struct UnsetDirArgs {
    /// Copy the contents into the fallback directory (always, never, ask)
    #[arg(long, default_value = "ask", value_parser = parse_decision)]
    pub copy: Decision,

    /// Delete the old directory afterwards (always, never, ask)
    #[arg(long, default_value = "ask", value_parser = parse_decision)]
    pub delete: Decision,
}

pub(crate) fn parse_decision(s: &str) -> Result<Decision, String> {
    s.parse().map_err(|e: nodeattach_core::AttachError| e.to_string())
}

fn parse_new_dir_method(s: &str) -> Result<NewDirMethod, String> {
    s.parse().map_err(|e: nodeattach_core::AttachError| e.to_string())
}

#[instrument(level = "info", name = "cmd::dir", skip_all, fields(create = args.create))]
pub async fn execute(session: &mut Session, args: &DirArgs) -> Result<()> {
    let (attacher, mut node) = session.node();
    let dir = if args.create {
        attacher
            .dir_or_create(&mut node, args.method, args.new_dir.as_deref())
            .await?
    } else {
        attacher.dir(&mut node, args.no_fs_check).await?
    };
    println!("{}", dir.display());
    Ok(())
}

#[instrument(level = "info", name = "cmd::set_dir", skip_all, fields(path = %args.path.display()))]
pub async fn set(session: &mut Session, args: &SetDirArgs) -> Result<()> {
    let (attacher, mut node) = session.node();
    let dir = attacher
        .set_directory(&mut node, &args.path, DirPolicy::new(args.copy, args.delete))
        .await?;
    println!("{}", dir.display());
    Ok(())
}

#[instrument(level = "info", name = "cmd::unset_dir", skip_all)]
pub async fn unset(session: &mut Session, args: &UnsetDirArgs) -> Result<()> {
    let (attacher, mut node) = session.node();
    let dir = attacher
        .unset_directory(&mut node, DirPolicy::new(args.copy, args.delete))
        .await?;
    if let Some(dir) = dir {
        println!("{}", dir.display());
    }
    Ok(())
}

/// Print the node's ID, creating one if it has none.
#[instrument(level = "info", name = "cmd::id", skip_all)]
pub fn id(session: &mut Session) -> Result<()> {
    let method = session.attacher.config().id_method;
    let (_, mut node) = session.node();
    println!("{}", node.id_get_or_create(method));
    Ok(())
}
