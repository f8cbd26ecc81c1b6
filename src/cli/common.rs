//! Shared plumbing for CLI commands: target resolution and event rendering.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

use crate::config::FavoriteStore;
use crate::constants::FAVORITES_FILE;
use crate::platform::Platform;
use crate::session::{SessionEvent, SessionParams};

/// Where a command gets its session parameters from: a saved favorite, or
/// explicit flags, or a mix (explicit flags override the favorite's fields).
#[derive(Args, Debug)]
pub struct TargetArgs {
    /// Saved favorite whose parameters to use.
    #[arg(short, long)]
    pub favorite: Option<String>,

    /// Product name.
    #[arg(short, long)]
    pub product: Option<String>,

    /// URL or local path of the instructions document.
    #[arg(short, long)]
    pub url: Option<String>,

    /// Install destination directory.
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// Target platform, by label ("Debian AMD64") or token (debian_amd64).
    #[arg(long)]
    pub platform: Option<Platform>,
}

impl TargetArgs {
    /// Resolves the final session parameters.
    pub fn resolve(&self, home: Option<&Path>) -> Result<SessionParams> {
        let favorite = match &self.favorite {
            Some(name) => {
                let store = open_store(home)?;
                Some(
                    store
                        .get(name)
                        .cloned()
                        .with_context(|| format!("no favorite named '{name}'"))?,
                )
            }
            None => None,
        };

        let product = self
            .product
            .clone()
            .or_else(|| favorite.as_ref().map(|f| f.name.clone()));
        let Some(product) = product else {
            bail!("a product is required; pass --product or --favorite");
        };

        let url = self
            .url
            .clone()
            .or_else(|| favorite.as_ref().map(|f| f.url.clone()))
            .context("an instructions URL is required; pass --url or --favorite")?;

        let destination = self
            .dir
            .clone()
            .or_else(|| favorite.as_ref().map(|f| PathBuf::from(&f.local_directory)))
            .context("a destination directory is required; pass --dir or --favorite")?;

        let platform = match (self.platform, &favorite) {
            (Some(platform), _) => platform,
            (None, Some(favorite)) => favorite
                .platform()
                .with_context(|| format!("favorite '{}' has an invalid platform", favorite.name))?,
            (None, None) => bail!("a platform is required; pass --platform or --favorite"),
        };

        Ok(SessionParams { product, manifest_url: url, destination, platform })
    }
}

/// Opens the favorites store, honoring a `--home` override.
pub fn open_store(home: Option<&Path>) -> Result<FavoriteStore> {
    let store = match home {
        Some(dir) => FavoriteStore::open(dir.join(FAVORITES_FILE)),
        None => FavoriteStore::open_default(),
    };
    store.context("could not open the favorites store")
}

/// Spawns a task rendering session events to the terminal.
///
/// The task ends when the session drops its event sender; join the handle
/// before exiting so the last lines are flushed.
pub fn spawn_renderer(
    mut events: UnboundedReceiver<SessionEvent>,
    quiet: bool,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                SessionEvent::Log { timestamp, line } => {
                    if !quiet {
                        println!("{} {line}", timestamp.format("%H:%M:%S").to_string().dimmed());
                    }
                }
                SessionEvent::StateChanged(state) => {
                    if !quiet {
                        println!("{} {state}", "state".bold().blue());
                    }
                }
                SessionEvent::FilesDiffered(report) => {
                    if quiet {
                        continue;
                    }
                    let changed: Vec<_> =
                        report.records.iter().filter(|r| r.differs()).collect();
                    println!(
                        "{} {} of {} files differ",
                        "diff".bold().yellow(),
                        changed.len(),
                        report.records.len()
                    );
                    for record in changed {
                        let marker = if record.installed_digest.is_empty() {
                            "new".green()
                        } else {
                            "changed".yellow()
                        };
                        println!("  {marker} {}", record.installed_path.display());
                    }
                }
                SessionEvent::DestinationWritable(writable) => {
                    if !writable {
                        eprintln!(
                            "{} destination directory is not writable",
                            "warning:".yellow().bold()
                        );
                    }
                }
            }
        }
    })
}
