//! qup CLI entry point.
//!
//! Parses arguments, executes the selected command, and renders failures in
//! a consistent style before exiting non-zero.

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use qup_cli::cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // Enable ANSI colors on Windows consoles.
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red().bold());
            std::process::exit(1);
        }
    }
}
