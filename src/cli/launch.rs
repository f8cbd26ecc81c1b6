//! Start an installed product, detached from the CLI process.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use crate::cli::common::TargetArgs;
use crate::launch::Launcher;

/// Command to launch the installed product.
#[derive(Args, Debug)]
pub struct LaunchCommand {
    #[command(flatten)]
    target: TargetArgs,
}

impl LaunchCommand {
    pub async fn execute(self, home: Option<&Path>) -> Result<()> {
        let params = self.target.resolve(home)?;
        Launcher::new(&params.product, params.platform)
            .launch(&params.destination)
            .context("could not launch the product")?;
        println!("{} launched {}", "✓".green().bold(), params.product);
        Ok(())
    }
}
