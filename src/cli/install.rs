//! Download a product and copy the staged files into place.
//!
//! The default flow is a full round (fetch manifest, download, diff)
//! followed by the copy into the destination directory. `--skip-download`
//! installs whatever a previous `check` left in staging; `--launch` starts
//! the product once the copy finishes.
//!
//! # Examples
//!
//! ```bash
//! qup install -f BiblioteQ
//! qup install -f BiblioteQ --skip-download
//! qup install -f BiblioteQ --launch
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use crate::cli::common::{spawn_renderer, TargetArgs};
use crate::session::Session;

/// Command to download and install a product.
#[derive(Args, Debug)]
pub struct InstallCommand {
    #[command(flatten)]
    target: TargetArgs,

    /// Install the currently staged files without downloading first.
    #[arg(long)]
    skip_download: bool,

    /// Launch the product after a successful install.
    #[arg(long)]
    launch: bool,
}

impl InstallCommand {
    pub async fn execute(self, home: Option<&Path>, quiet: bool) -> Result<()> {
        let params = self.target.resolve(home)?;
        let destination = params.destination.clone();
        let (session, events) = Session::new(params).context("could not create session")?;
        let renderer = spawn_renderer(events, quiet);

        let outcome = async {
            if !self.skip_download {
                session.start().await.context("download round failed")?;
            }
            session.install().await.context("install failed")?;
            if self.launch {
                session.launch().context("launch failed")?;
            }
            Ok::<_, anyhow::Error>(())
        }
        .await;

        drop(session);
        let _ = renderer.await;
        outcome?;

        if !quiet {
            println!("{} installed into {}", "✓".green().bold(), destination.display());
        }
        Ok(())
    }
}
