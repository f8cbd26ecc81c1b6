//! Run one download round and report what an install would change.
//!
//! `check` is the read-only half of `install`: it fetches the instructions
//! document, downloads the described files into the per-product staging
//! directory, and prints the staged/installed diff. The destination
//! directory itself is never written. `--json` emits the diff report as a
//! machine-readable document instead of the human log.
//!
//! # Examples
//!
//! ```bash
//! qup check -f BiblioteQ
//! qup check -f BiblioteQ --json | jq '.records[] | .installed_path'
//! qup check --product Glitch --url https://example.org/glitch.txt \
//!     --dir ~/apps/glitch --platform pios_arm64
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use crate::cli::common::{spawn_renderer, TargetArgs};
use crate::session::{Session, SessionEvent};

/// Command to run one download round without installing.
#[derive(Args, Debug)]
pub struct CheckCommand {
    #[command(flatten)]
    target: TargetArgs,

    /// Print the diff report as JSON instead of the progress log.
    #[arg(long)]
    json: bool,
}

impl CheckCommand {
    pub async fn execute(self, home: Option<&Path>, quiet: bool) -> Result<()> {
        let params = self.target.resolve(home)?;
        let destination = params.destination.clone();
        let (session, mut events) = Session::new(params).context("could not create session")?;

        if self.json {
            let collector = tokio::spawn(async move {
                let mut last = None;
                while let Some(event) = events.recv().await {
                    if let SessionEvent::FilesDiffered(report) = event {
                        last = Some(report);
                    }
                }
                last
            });

            let outcome = session.start().await;
            drop(session);
            let report = collector.await.ok().flatten();
            outcome.context("download round failed")?;
            if let Some(report) = report {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                // Nothing changed since the previous pass.
                println!("null");
            }
            return Ok(());
        }

        let renderer = spawn_renderer(events, quiet);
        let outcome = session.start().await;
        drop(session);
        let _ = renderer.await;
        outcome.context("download round failed")?;

        if !quiet {
            println!(
                "{} staged files are ready; run `qup install` to copy them into {}",
                "✓".green().bold(),
                destination.display()
            );
        }
        Ok(())
    }
}
