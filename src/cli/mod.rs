//! Command-line interface for qup.
//!
//! Each command lives in its own module with its own argument structure and
//! execution logic:
//!
//! - `check` - run one download round and report what changed
//! - `install` - download and copy the staged files into place
//! - `launch` - start the installed product
//! - `run` - keep a product updated on a schedule
//! - `favorite` - manage saved session configurations
//!
//! Commands resolve their session parameters either from explicit flags or
//! from a saved favorite; explicit flags win when both are given.
//!
//! # Global Options
//!
//! - `--verbose` - enable debug logging
//! - `--quiet` - suppress everything except errors
//! - `--home` - override the qup home directory (`~/.qup`)
//!
//! # Examples
//!
//! ```bash
//! # See what an update would change
//! qup check --product BiblioteQ --url https://example.org/biblioteq.txt \
//!     --dir ~/apps/biblioteq --platform debian_amd64
//!
//! # Save the parameters and use them from now on
//! qup favorite add BiblioteQ --url https://example.org/biblioteq.txt \
//!     --dir ~/apps/biblioteq --platform debian_amd64
//! qup install -f BiblioteQ
//!
//! # Keep it updated every 30 minutes
//! qup run -f BiblioteQ --every 30 --install
//! ```

pub mod common;

mod check;
mod favorite;
mod install;
mod launch;
mod run;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Top-level CLI structure.
///
/// Global flags are available to every subcommand; verbosity maps onto the
/// tracing filter, so `RUST_LOG` still wins when set explicitly.
#[derive(Parser)]
#[command(
    name = "qup",
    about = "Fetch, verify, and install product updates",
    version,
    author,
    long_about = "qup keeps locally installed products in sync with a remote \
                  distribution point described by an instructions document."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output.
    ///
    /// Shows per-file transfer details and internal state transitions.
    /// Mutually exclusive with `--quiet`.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors, for scripts and cron jobs.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Override the qup home directory where favorites are stored.
    ///
    /// Falls back to `~/.qup` when neither the flag nor `QUP_HOME` is set.
    #[arg(long, global = true, env = "QUP_HOME")]
    home: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Run one download round and report the staged/installed differences.
    ///
    /// Nothing outside the staging directory is touched; this is the
    /// dry-run half of `install`.
    Check(check::CheckCommand),

    /// Download the product and copy the staged files into place.
    Install(install::InstallCommand),

    /// Start the installed product, detached.
    Launch(launch::LaunchCommand),

    /// Keep a product updated on a schedule until interrupted.
    Run(run::RunCommand),

    /// Manage saved session configurations.
    Favorite(favorite::FavoriteCommand),
}

impl Cli {
    /// Initializes logging and dispatches to the selected command.
    pub async fn execute(self) -> Result<()> {
        self.init_logging();
        let home = self.home.as_deref();
        match self.command {
            Commands::Check(cmd) => cmd.execute(home, self.quiet).await,
            Commands::Install(cmd) => cmd.execute(home, self.quiet).await,
            Commands::Launch(cmd) => cmd.execute(home).await,
            Commands::Run(cmd) => cmd.execute(home, self.quiet).await,
            Commands::Favorite(cmd) => cmd.execute(home),
        }
    }

    /// Session progress is rendered from the event stream, so the tracing
    /// default stays at `warn` unless the user asks for more.
    fn init_logging(&self) {
        let default = if self.verbose {
            "qup=debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        };
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}
