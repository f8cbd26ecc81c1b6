//! Manage saved session configurations.
//!
//! Favorites bundle a product's parameters under its name so the other
//! commands can be invoked as `qup install -f <name>`. They live in a TOML
//! file under the qup home directory.
//!
//! # Examples
//!
//! ```bash
//! qup favorite add BiblioteQ --url https://example.org/biblioteq.txt \
//!     --dir ~/apps/biblioteq --platform debian_amd64 --every 30 --auto-install
//! qup favorite list
//! qup favorite show BiblioteQ
//! qup favorite remove BiblioteQ
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use colored::Colorize;

use crate::cli::common::open_store;
use crate::config::Favorite;
use crate::platform::Platform;

/// Command group for favorites management.
#[derive(Args, Debug)]
pub struct FavoriteCommand {
    #[command(subcommand)]
    command: FavoriteSubcommand,
}

#[derive(Subcommand, Debug)]
enum FavoriteSubcommand {
    /// Add or replace a favorite.
    Add {
        /// Product name the favorite is stored under.
        name: String,

        /// URL or local path of the instructions document.
        #[arg(short, long)]
        url: String,

        /// Install destination directory.
        #[arg(short, long)]
        dir: PathBuf,

        /// Target platform, by label or token.
        #[arg(long)]
        platform: Platform,

        /// Minutes between download rounds in `qup run`.
        #[arg(long)]
        every: Option<u64>,

        /// Install automatically after each round in `qup run`.
        #[arg(long)]
        auto_install: bool,
    },

    /// Remove a favorite.
    Remove {
        /// Name of the favorite to remove.
        name: String,
    },

    /// List favorite names.
    List,

    /// Show one favorite's stored parameters.
    Show {
        /// Name of the favorite to show.
        name: String,
    },
}

impl FavoriteCommand {
    pub fn execute(self, home: Option<&Path>) -> Result<()> {
        match self.command {
            FavoriteSubcommand::Add { name, url, dir, platform, every, auto_install } => {
                let mut store = open_store(home)?;
                store.upsert(Favorite {
                    name: name.clone(),
                    local_directory: dir.display().to_string(),
                    url,
                    operating_system: platform.label().to_string(),
                    download_frequency: every,
                    install_automatically: auto_install,
                });
                store.save()?;
                println!("{} saved favorite '{name}'", "✓".green().bold());
                Ok(())
            }
            FavoriteSubcommand::Remove { name } => {
                let mut store = open_store(home)?;
                if !store.remove(&name) {
                    bail!("no favorite named '{name}'");
                }
                store.save()?;
                println!("{} removed favorite '{name}'", "✓".green().bold());
                Ok(())
            }
            FavoriteSubcommand::List => {
                let store = open_store(home)?;
                if store.is_empty() {
                    println!("no favorites saved yet");
                } else {
                    for name in store.names() {
                        println!("{name}");
                    }
                }
                Ok(())
            }
            FavoriteSubcommand::Show { name } => {
                let store = open_store(home)?;
                let Some(favorite) = store.get(&name) else {
                    bail!("no favorite named '{name}'");
                };
                println!("{}: {}", "name".bold(), favorite.name);
                println!("{}: {}", "url".bold(), favorite.url);
                println!("{}: {}", "directory".bold(), favorite.local_directory);
                println!("{}: {}", "platform".bold(), favorite.operating_system);
                if let Some(minutes) = favorite.download_frequency {
                    println!("{}: every {minutes} minutes", "frequency".bold());
                }
                println!(
                    "{}: {}",
                    "auto-install".bold(),
                    if favorite.install_automatically { "yes" } else { "no" }
                );
                Ok(())
            }
        }
    }
}
