//! remsync: push prompt records into a Remote Settings collection.
//!
//! # Usage
//!
//! ```text
//! remsync [--config PATH] sync [--dry-run] [--source-dir DIR] [--batch-size N] [--json]
//! remsync [--config PATH] diff [--source-dir DIR]
//! remsync [--config PATH] whoami
//! ```
//!
//! Settings come from the config file (`~/.remsync/config.yaml` by default),
//! then environment variables (`SERVER`, `AUTHORIZATION`, `BUCKET`, ...),
//! then flags.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{diff::DiffArgs, sync::SyncArgs, whoami::WhoamiArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "remsync",
    version,
    about = "Reconcile prompt records into a Remote Settings collection",
    long_about = None,
)]
struct Cli {
    /// Config file (default: ~/.remsync/config.yaml).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply the source records to the collection and request review.
    Sync(SyncArgs),

    /// Show what sync would change, as unified diffs.
    Diff(DiffArgs),

    /// Check the configured credentials against the server.
    Whoami(WhoamiArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = cli.config.as_deref();
    match cli.command {
        Commands::Sync(args) => args.run(config),
        Commands::Diff(args) => args.run(config),
        Commands::Whoami(args) => args.run(config),
    }
}

/// Progress goes to stderr; stdout stays clean for `--json`.
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
