//! Content diff engine: per-file digest pairs and the aggregate tree digest.
//!
//! Staged files are re-downloaded into a fresh temp area each round, so
//! modification times carry no signal. Change detection therefore hashes
//! content: for every file under the staged root we compute a SHA-256 digest
//! of the staged bytes and of the corresponding installed path (empty when
//! the file is not installed yet), plus the permission bits of each side.
//! The per-file digests are folded, in deterministic traversal order, into a
//! single aggregate digest.
//!
//! If the aggregate equals the one from the previous pass, the walk reports
//! "no change" and the caller suppresses its update; an unchanged tree never
//! re-emits redundant events. The walk checks its cancellation token on
//! every entry, since trees may be large.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;
use walkdir::WalkDir;

use crate::core::{QupError, Result};


/// Digest string prefix; digests are `sha256:<lowercase hex>`.
const DIGEST_PREFIX: &str = "sha256:";

/// One file's comparison unit: the staged/installed digest pair and the
/// permission bits of both sides. Created fresh on each diff pass, never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    /// Absolute path of the staged copy.
    pub staged_path: PathBuf,
    /// Absolute path the file would occupy under the installed root.
    pub installed_path: PathBuf,
    /// Digest of the staged content.
    pub staged_digest: String,
    /// Digest of the installed content; empty if not installed.
    pub installed_digest: String,
    /// Permission bits of the staged file.
    pub staged_mode: u32,
    /// Permission bits of the installed file; 0 if not installed.
    pub installed_mode: u32,
}

impl FileRecord {
    /// Whether the staged and installed sides differ in content.
    pub fn differs(&self) -> bool {
        self.staged_digest != self.installed_digest
    }
}

/// Result of a diff pass that found a change since the previous pass.
#[derive(Debug, Clone, Serialize)]
pub struct DiffReport {
    /// Aggregate digest of the whole staged tree.
    pub aggregate: String,
    /// Per-file records, in traversal order.
    pub records: Vec<FileRecord>,
}

/// Walks `staged` and `installed` in lock-step and reports what changed.
///
/// Returns `Ok(None)` when the aggregate digest equals `previous_aggregate`
/// (nothing changed since the last pass), `Ok(Some(report))` otherwise, and
/// [`QupError::Cancelled`] as soon as `cancel` is observed.
///
/// This is a blocking walk; callers run it on a background task.
pub fn compare(
    staged: &Path,
    installed: &Path,
    previous_aggregate: Option<&str>,
    cancel: &CancellationToken,
) -> Result<Option<DiffReport>> {
    if !staged.is_dir() {
        return Err(QupError::filesystem("walk staged tree", staged.display().to_string()));
    }

    let mut aggregate = Sha256::new();
    let mut records = Vec::new();

    for entry in WalkDir::new(staged).sort_by_file_name().follow_links(false) {
        if cancel.is_cancelled() {
            return Err(QupError::Cancelled);
        }

        let entry = entry.map_err(|e| {
            QupError::filesystem("walk staged tree", format!("{}: {e}", staged.display()))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let staged_path = entry.path().to_path_buf();
        let relative = staged_path.strip_prefix(staged).unwrap_or(&staged_path).to_path_buf();
        let installed_path = installed.join(&relative);

        let staged_digest = digest_file(&staged_path)?;
        let staged_mode = mode_of(&staged_path).unwrap_or(0);
        let (installed_digest, installed_mode) = if installed_path.is_file() {
            (digest_file(&installed_path)?, mode_of(&installed_path).unwrap_or(0))
        } else {
            (String::new(), 0)
        };

        aggregate.update(relative.to_string_lossy().as_bytes());
        aggregate.update(staged_digest.as_bytes());
        aggregate.update(installed_digest.as_bytes());

        records.push(FileRecord {
            staged_path,
            installed_path,
            staged_digest,
            installed_digest,
            staged_mode,
            installed_mode,
        });
    }

    let aggregate = format!("{DIGEST_PREFIX}{}", hex::encode(aggregate.finalize()));
    if previous_aggregate == Some(aggregate.as_str()) {
        tracing::debug!("aggregate digest unchanged, suppressing report");
        return Ok(None);
    }

    Ok(Some(DiffReport { aggregate, records }))
}

/// SHA-256 digest of a file's content, in `sha256:<hex>` form.
pub fn digest_file(path: &Path) -> Result<String> {
    let content = fs::read(path)
        .map_err(|_| QupError::filesystem("read for digest", path.display().to_string()))?;
    let mut hasher = Sha256::new();
    hasher.update(&content);
    Ok(format!("{DIGEST_PREFIX}{}", hex::encode(hasher.finalize())))
}

/// Permission bits of `path`.
///
/// On Unix these are the low mode bits; elsewhere the read-only flag is
/// mapped onto a coarse octal equivalent so comparisons stay meaningful.
pub fn mode_of(path: &Path) -> Option<u32> {
    let metadata = fs::metadata(path).ok()?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        Some(metadata.permissions().mode() & 0o7777)
    }
    #[cfg(not(unix))]
    {
        Some(if metadata.permissions().readonly() { 0o444 } else { 0o666 })
    }
}
