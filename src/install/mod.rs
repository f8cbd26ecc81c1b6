//! Sync/install engine: copies the staged tree into the destination.
//!
//! The copy is best-effort: a failure on one file is recorded and reported
//! but never aborts the remaining copies. Permission bits are propagated
//! from each staged file onto its installed counterpart after the copy.
//!
//! Two platform-conditioned special cases:
//! - desktop-entry descriptors (`.desktop`) are additionally copied into the
//!   user's desktop-entry location on Unix-family targets;
//! - the product's shell wrapper (`<product>.sh` / `<product>.bash`,
//!   case-insensitive) is rewritten through a temporary file: at the marker
//!   comment a stanza is injected that, at runtime, `exec`s the officially
//!   installed binary when it is present and executable. The temporary file
//!   atomically replaces the original and is marked executable.

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tokio_util::sync::CancellationToken;
use walkdir::WalkDir;

use crate::constants::{DESKTOP_ENTRY_EXTENSION, LAUNCH_STANZA_MARKER};
use crate::core::{QupError, Result};
use crate::platform::Platform;


/// Outcome of one install pass.
#[derive(Debug, Default)]
pub struct InstallReport {
    /// Files copied successfully.
    pub copied: usize,
    /// Per-file failures: destination path and reason. These did not abort
    /// the rest of the walk.
    pub failed: Vec<(PathBuf, String)>,
    /// Whether the walk stopped early on a cancellation request.
    pub cancelled: bool,
}

impl InstallReport {
    /// Whether the pass completed with no per-file failures.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && !self.cancelled
    }
}

/// Copies a staged tree into a destination tree for one product.
pub struct Installer {
    product: String,
    platform: Platform,
    /// Override for the desktop-entry duplication target. Defaults to the
    /// user's desktop directory; tests point it elsewhere.
    desktop_dir: Option<PathBuf>,
}

impl Installer {
    pub fn new(product: impl Into<String>, platform: Platform) -> Self {
        Self { product: product.into(), platform, desktop_dir: None }
    }

    /// Replaces the desktop-entry duplication target.
    pub fn with_desktop_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.desktop_dir = Some(dir.into());
        self
    }

    /// Copies every entry under `staged` into `destination`.
    ///
    /// Directories are created as needed and existing files overwritten.
    /// The cancellation token is checked once per visited entry; a cancelled
    /// walk returns the partial report with `cancelled` set rather than an
    /// error, so the caller still sees what was copied. `log` receives one
    /// human-readable line per per-file outcome.
    pub fn sync(
        &self,
        staged: &Path,
        destination: &Path,
        cancel: &CancellationToken,
        mut log: impl FnMut(String),
    ) -> Result<InstallReport> {
        if !staged.is_dir() {
            return Err(QupError::filesystem("read staged tree", staged.display().to_string()));
        }

        let mut report = InstallReport::default();

        for entry in WalkDir::new(staged).sort_by_file_name().follow_links(false) {
            if cancel.is_cancelled() {
                report.cancelled = true;
                log("Install cancelled.".to_string());
                break;
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    report.failed.push((staged.to_path_buf(), e.to_string()));
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry.path().strip_prefix(staged).unwrap_or(entry.path());
            let target = destination.join(relative);

            match self.install_one(entry.path(), &target) {
                Ok(()) => {
                    report.copied += 1;
                    log(format!("Copied {} to {}.", relative.display(), target.display()));
                }
                Err(e) => {
                    log(format!("Could not copy {}: {e}.", relative.display()));
                    report.failed.push((target, e.to_string()));
                }
            }
        }

        Ok(report)
    }

    /// Copies one file, propagates its permissions, and applies the
    /// desktop-entry and wrapper-script special cases.
    fn install_one(&self, staged: &Path, target: &Path) -> Result<()> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|_| {
                QupError::filesystem("create directory", parent.display().to_string())
            })?;
        }

        fs::copy(staged, target)
            .map_err(|_| QupError::filesystem("copy", target.display().to_string()))?;
        propagate_permissions(staged, target)?;

        if self.is_desktop_entry(staged) {
            self.duplicate_desktop_entry(staged)?;
        }

        if self.is_shell_wrapper(target) {
            let destination = target.parent().unwrap_or(Path::new("."));
            self.rewrite_wrapper(target, destination)?;
        }

        Ok(())
    }

    fn is_desktop_entry(&self, path: &Path) -> bool {
        self.platform.is_unix_family()
            && path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(DESKTOP_ENTRY_EXTENSION))
    }

    /// Copies a desktop-entry descriptor into the platform's standard
    /// desktop location.
    fn duplicate_desktop_entry(&self, staged: &Path) -> Result<()> {
        let desktop = match &self.desktop_dir {
            Some(dir) => dir.clone(),
            None => dirs::desktop_dir().ok_or_else(|| {
                QupError::filesystem("locate desktop directory", "<desktop>".to_string())
            })?,
        };
        let file_name = staged
            .file_name()
            .ok_or_else(|| QupError::filesystem("copy desktop entry", staged.display().to_string()))?;
        let target = desktop.join(file_name);
        fs::create_dir_all(&desktop)
            .map_err(|_| QupError::filesystem("create directory", desktop.display().to_string()))?;
        fs::copy(staged, &target)
            .map_err(|_| QupError::filesystem("copy desktop entry", target.display().to_string()))?;
        Ok(())
    }

    /// Whether `path` is the product's shell wrapper script.
    fn is_shell_wrapper(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        let name = name.to_ascii_lowercase();
        let product = self.product.to_ascii_lowercase();
        name == format!("{product}.sh") || name == format!("{product}.bash")
    }

    /// Rewrites the wrapper script through a temporary copy, injecting the
    /// launch stanza after the marker comment, then atomically replaces the
    /// original and marks it executable.
    fn rewrite_wrapper(&self, script: &Path, destination: &Path) -> Result<()> {
        let parent = script.parent().unwrap_or(Path::new("."));
        let source = fs::File::open(script)
            .map_err(|_| QupError::filesystem("open wrapper", script.display().to_string()))?;
        let mut temp = NamedTempFile::new_in(parent)
            .map_err(|_| QupError::filesystem("create temporary file", parent.display().to_string()))?;

        let executable =
            destination.join(self.platform.executable_file_name(&self.product));
        for line in BufReader::new(source).lines() {
            let line = line
                .map_err(|_| QupError::filesystem("read wrapper", script.display().to_string()))?;
            writeln!(temp, "{line}").map_err(QupError::Io)?;
            if line.trim_start().starts_with(LAUNCH_STANZA_MARKER) {
                write_stanza(&mut temp, destination, &executable)?;
            }
        }

        temp.flush().map_err(QupError::Io)?;
        temp.persist(script).map_err(|e| {
            QupError::filesystem(format!("replace wrapper: {}", e.error), script.display().to_string())
        })?;
        mark_executable(script)?;
        Ok(())
    }
}

/// The generated stanza: if the officially installed binary is present and
/// executable, change into the destination and exec it with the original
/// arguments; otherwise fall through to the script's own logic.
fn write_stanza(out: &mut impl Write, destination: &Path, executable: &Path) -> Result<()> {
    writeln!(
        out,
        "if [ -x \"{exe}\" ]; then\n    cd \"{dest}\" && exec \"{exe}\" \"$@\"\nfi",
        exe = executable.display(),
        dest = destination.display(),
    )
    .map_err(QupError::Io)
}

/// Copies the staged file's permission bits onto the installed file.
fn propagate_permissions(staged: &Path, target: &Path) -> Result<()> {
    let metadata = fs::metadata(staged)
        .map_err(|_| QupError::filesystem("stat", staged.display().to_string()))?;
    fs::set_permissions(target, metadata.permissions())
        .map_err(|_| QupError::filesystem("set permissions", target.display().to_string()))?;
    Ok(())
}

/// Marks a file executable by owner, group, and others.
pub fn mark_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let metadata = fs::metadata(path)
            .map_err(|_| QupError::filesystem("stat", path.display().to_string()))?;
        let mut permissions = metadata.permissions();
        permissions.set_mode(permissions.mode() | 0o755);
        fs::set_permissions(path, permissions)
            .map_err(|_| QupError::filesystem("set permissions", path.display().to_string()))?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}
