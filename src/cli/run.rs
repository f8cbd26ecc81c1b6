//! Keep a product updated on a schedule until interrupted.
//!
//! `run` is the long-lived mode: an immediate download round, then one
//! round per interval, with an optional install after each successful
//! round. The destination directory's writability is polled in the
//! background and reported when it changes. Ctrl-C interrupts the running
//! operation cleanly and exits.
//!
//! The interval comes from `--every`, falling back to the favorite's saved
//! `download-frequency`, falling back to hourly. `--install` likewise
//! combines with the favorite's `install-automatically` setting; `--launch`
//! starts the product once the first round has installed.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use crate::cli::common::{open_store, spawn_renderer, TargetArgs};
use crate::session::Session;

const DEFAULT_INTERVAL_MINUTES: u64 = 60;

/// Command to keep a product updated on a schedule.
#[derive(Args, Debug)]
pub struct RunCommand {
    #[command(flatten)]
    target: TargetArgs,

    /// Minutes between download rounds.
    #[arg(long)]
    every: Option<u64>,

    /// Install after each successful round instead of only staging.
    #[arg(long)]
    install: bool,

    /// Launch the product once the first round has installed.
    ///
    /// Implies `--install` for the first round.
    #[arg(long)]
    launch: bool,
}

impl RunCommand {
    pub async fn execute(self, home: Option<&Path>, quiet: bool) -> Result<()> {
        // The favorite contributes scheduling defaults as well as targets.
        let favorite = match &self.target.favorite {
            Some(name) => open_store(home)?.get(name).cloned(),
            None => None,
        };
        let minutes = self
            .every
            .or_else(|| favorite.as_ref().and_then(|f| f.download_frequency))
            .unwrap_or(DEFAULT_INTERVAL_MINUTES)
            .max(1);
        let install_after =
            self.install || favorite.as_ref().is_some_and(|f| f.install_automatically);

        let params = self.target.resolve(home)?;
        let (session, events) = Session::new(params).context("could not create session")?;
        let renderer = spawn_renderer(events, quiet);
        let poll = session.spawn_writability_poll();

        if !quiet {
            println!(
                "{} checking every {minutes} minutes{}; press Ctrl-C to stop",
                "watching".bold().blue(),
                if install_after { ", installing automatically" } else { "" }
            );
        }

        // First round immediately, racing Ctrl-C so an interrupt during it
        // still unwinds cooperatively; the periodic loop takes over after.
        let runner = {
            let session = session.clone();
            let launch = self.launch;
            tokio::spawn(async move {
                match session.start().await {
                    Ok(()) if install_after || launch => session.install().await,
                    other => other,
                }
            })
        };
        let interrupted = tokio::select! {
            first = runner => {
                match first {
                    Ok(Ok(())) if self.launch => {
                        if let Err(e) = session.launch() {
                            tracing::warn!("could not launch: {e}");
                        }
                    }
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => tracing::warn!("initial round failed: {e}"),
                    Err(e) => tracing::warn!("initial round panicked: {e}"),
                }
                false
            }
            _ = tokio::signal::ctrl_c() => true,
        };

        if interrupted {
            session.interrupt().await;
        } else {
            let refresh = session
                .spawn_periodic_refresh(Duration::from_secs(minutes * 60), install_after);
            tokio::signal::ctrl_c().await.context("could not listen for Ctrl-C")?;
            refresh.abort();
            session.interrupt().await;
        }
        poll.abort();

        drop(session);
        let _ = renderer.await;
        if !quiet {
            println!("{} stopped", "✓".green().bold());
        }
        Ok(())
    }
}
