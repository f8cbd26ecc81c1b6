//! Detached launching of the installed product.
//!
//! The launcher spawns and immediately returns; the product's lifetime is
//! never tied to ours. Standard streams are detached so the child cannot
//! block on our pipes. Naming follows the platform convention: an `.app`
//! bundle opened through `open` on macOS, a `.exe` on Windows, and the bare
//! product name elsewhere.

use std::path::Path;
use std::process::{Command, Stdio};

use crate::core::{QupError, Result};
use crate::platform::Platform;

/// Spawns the installed executable for one product.
pub struct Launcher {
    product: String,
    platform: Platform,
}

impl Launcher {
    pub fn new(product: impl Into<String>, platform: Platform) -> Self {
        Self { product: product.into(), platform }
    }

    /// Starts the installed product from `destination` and returns without
    /// waiting.
    ///
    /// The child runs with `destination` as its working directory so the
    /// product finds its own data files. A spawn failure (missing file,
    /// permission denied) is reported as a launch error; nothing after a
    /// successful spawn is observed.
    pub fn launch(&self, destination: &Path) -> Result<()> {
        let mut command = match self.platform {
            Platform::MacOs => {
                let mut command = Command::new("open");
                command.arg(destination.join(format!("{}.app", self.product)));
                command
            }
            _ => Command::new(
                destination.join(self.platform.executable_file_name(&self.product)),
            ),
        };

        command
            .current_dir(destination)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        tracing::info!(product = %self.product, directory = %destination.display(), "launching");
        command
            .spawn()
            .map(drop)
            .map_err(|e| QupError::Launch { product: self.product.clone(), reason: e.to_string() })
    }
}
