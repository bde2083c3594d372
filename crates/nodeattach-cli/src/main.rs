#![deny(unsafe_code)]

mod commands;
mod config;
mod exit_code;
mod output;
mod prompt;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use nodeattach_core::collab::{FixedPrompter, Prompter};
use nodeattach_core::fs::FsError;
use nodeattach_core::node::{MemoryOutline, OutlineError};
use nodeattach_core::{AttachError, Attacher};

use crate::commands::{Session, attach, dir, ls, open, rm, sync};
use crate::config::Config;
use crate::prompt::TerminalPrompter;

/// Attachment directories for outline documents
#[derive(Parser)]
#[command(name = "nodeattach")]
#[command(author, version)]
#[command(propagate_version = true)]
#[command(after_help = "EXAMPLES:
    # Attach a file to the heading at position 120
    nodeattach --doc notes.json --at 120 attach report.pdf

    # List the attachments of the whole document
    nodeattach --doc notes.json ls -l

    # Move a heading's attachments to a new directory
    nodeattach --doc notes.json --at 120 set-dir ~/papers --copy always --delete always

    # Sync tags of every heading, without prompting
    nodeattach --doc notes.json --yes sync --all
")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Outline document (JSON)
    #[arg(long, env = "NODEATTACH_DOC", global = true)]
    doc: Option<PathBuf>,

    /// Position of the entry to work on; omit for the document itself
    #[arg(long, global = true)]
    at: Option<usize>,

    /// Answer yes to every question
    #[arg(short, long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    // ============ Directory ============

    /// Print the attachment directory
    Dir(dir::DirArgs),

    /// Point the node at a new attachment directory
    SetDir(dir::SetDirArgs),

    /// Drop the explicit directory, falling back to an inherited or ID directory
    UnsetDir(dir::UnsetDirArgs),

    /// Print the node's ID, creating one if needed
    Id,

    // ============ Attachments ============

    /// Attach files or directories
    Attach(attach::AttachArgs),

    /// Download a URL as an attachment
    AttachUrl(attach::AttachUrlArgs),

    /// Attach the contents of stdin
    AttachBuffer(attach::AttachBufferArgs),

    /// Create an empty attachment
    New(attach::NewArgs),

    /// List attachments
    Ls(ls::Args),

    /// Print the path of an attachment or of the directory
    Open(open::Args),

    /// Delete attachments
    Rm(rm::Args),

    /// Apply the archive policy to the node
    Archive,

    /// Reconcile the attachment tag with the filesystem
    Sync(sync::Args),
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::from(exit_code::SUCCESS),
        Err(e) => {
            let code = categorize_error(&e);

            // Cancellation is a normal way out, not a failure worth reporting
            let args: Vec<String> = std::env::args().collect();
            let is_quiet = args.iter().any(|a| a == "-q" || a == "--quiet");
            if !is_quiet && code != exit_code::CANCELLED {
                eprintln!("Error: {e:#}");
            }

            ExitCode::from(code)
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;

    if !cli.quiet {
        let verbosity = cli.verbose.max(config.defaults.verbosity.unwrap_or(0));
        setup_tracing(verbosity);
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    runtime.block_on(execute(cli, config))
}

async fn execute(cli: Cli, config: Config) -> Result<()> {
    let doc = cli
        .doc
        .context("No outline document given (use --doc or NODEATTACH_DOC)")?;
    let outline = MemoryOutline::load(&doc)
        .with_context(|| format!("Failed to open outline {}", doc.display()))?;

    let prompter: Arc<dyn Prompter> = if cli.yes {
        Arc::new(FixedPrompter::yes())
    } else {
        Arc::new(TerminalPrompter)
    };
    let timeout = config.attach.await_timeout();
    let attacher = Attacher::new(config.attach).with_prompter(prompter);

    let snapshot = outline.clone();
    let mut session = Session::new(attacher, outline, cli.at, cli.quiet);

    let result = match tokio::time::timeout(timeout, dispatch(&mut session, &cli.command)).await {
        Ok(result) => result,
        Err(_) => Err(anyhow::anyhow!(
            "Operation timed out after {}s",
            timeout.as_secs()
        )),
    };

    // Files may already have moved even if the command failed later on
    if session.outline != snapshot {
        session
            .outline
            .save()
            .with_context(|| format!("Failed to save outline {}", doc.display()))?;
        tracing::debug!(doc = %doc.display(), "Saved outline");
    }
    result
}

async fn dispatch(session: &mut Session, command: &Commands) -> Result<()> {
    match command {
        Commands::Dir(args) => dir::execute(session, args).await,
        Commands::SetDir(args) => dir::set(session, args).await,
        Commands::UnsetDir(args) => dir::unset(session, args).await,
        Commands::Id => dir::id(session),
        Commands::Attach(args) => attach::execute(session, args).await,
        Commands::AttachUrl(args) => attach::url(session, args).await,
        Commands::AttachBuffer(args) => attach::buffer(session, args).await,
        Commands::New(args) => attach::new_file(session, args).await,
        Commands::Ls(args) => ls::execute(session, args).await,
        Commands::Open(args) => open::execute(session, args).await,
        Commands::Rm(args) => rm::execute(session, args).await,
        Commands::Archive => rm::archive(session).await,
        Commands::Sync(args) => sync::execute(session, args).await,
    }
}

/// Set up tracing/logging based on verbosity level
fn setup_tracing(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with_writer(io::stderr)
        .init();
}

/// Categorize an error into an exit code using typed error downcasting
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if let Some(attach_err) = cause.downcast_ref::<AttachError>() {
            match attach_err {
                AttachError::UserCancelled => return exit_code::CANCELLED,
                AttachError::NoAttachmentDirectory { .. } => return exit_code::NO_DIRECTORY,
                AttachError::CannotDetermineName { .. }
                | AttachError::InvalidConfiguration { .. } => return exit_code::USAGE_ERROR,
                // Transparent wrappers don't expose the inner error in the chain
                AttachError::Fs(fs_err) => {
                    if let Some(code) = fs_error_code(fs_err) {
                        return code;
                    }
                }
                _ => {}
            }
        }

        if let Some(fs_err) = cause.downcast_ref::<FsError>()
            && let Some(code) = fs_error_code(fs_err)
        {
            return code;
        }

        if let Some(outline_err) = cause.downcast_ref::<OutlineError>() {
            return match outline_err {
                OutlineError::Io { source, .. } if source.kind() == io::ErrorKind::NotFound => {
                    exit_code::NOT_FOUND
                }
                _ => exit_code::DOCUMENT_INVALID,
            };
        }

        // Generic I/O errors
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            match io_err.kind() {
                io::ErrorKind::PermissionDenied => return exit_code::PERMISSION_DENIED,
                io::ErrorKind::NotFound => return exit_code::NOT_FOUND,
                io::ErrorKind::Interrupted => return exit_code::CANCELLED,
                _ => {}
            }
        }
    }

    exit_code::GENERAL_ERROR
}

fn fs_error_code(err: &FsError) -> Option<u8> {
    match err {
        FsError::NotFound { .. } => Some(exit_code::NOT_FOUND),
        FsError::AlreadyExists { .. } => Some(exit_code::ALREADY_EXISTS),
        FsError::Io { source, .. } if source.kind() == io::ErrorKind::PermissionDenied => {
            Some(exit_code::PERMISSION_DENIED)
        }
        _ => None,
    }
}
