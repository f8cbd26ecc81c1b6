//! Error handling for qup.
//!
//! The error system follows the pipeline's taxonomy: *validation* errors are
//! rejected before any I/O and leave the session idle; *transfer* errors mark
//! a download round as failed; *manifest* errors abort the parse step;
//! *filesystem* errors are reported per file without aborting a best-effort
//! install; *conflict* errors reject an operation that would overlap an
//! already-running background task.
//!
//! [`QupError`] is the strongly-typed error used across the crate;
//! `anyhow::Result` with `.context()` is used at CLI level where the extra
//! typing buys nothing.

use thiserror::Error;

/// The main error type for qup pipeline operations.
///
/// Each variant carries enough context (file name, path, reason) that a log
/// line built from it is actionable on its own. Variants map one-to-one onto
/// the pipeline's error taxonomy.
#[derive(Error, Debug)]
pub enum QupError {
    /// Session parameters failed validation before any I/O was attempted.
    ///
    /// The session stays idle; nothing was fetched or written.
    #[error("validation failed: {reason}")]
    Validation {
        /// Why the parameters were rejected (missing name, invalid URL, ...).
        reason: String,
    },

    /// A network fetch failed.
    ///
    /// The partially written staged file has been deleted and the round it
    /// belonged to will not install. Per-file transfer errors are not
    /// retried; files that did stage are kept for the next round.
    #[error("transfer failed for '{file}': {reason}")]
    Transfer {
        /// Remote file name of the failed job.
        file: String,
        /// Transport or HTTP status description.
        reason: String,
    },

    /// The instructions document could not be fetched, read, or understood.
    ///
    /// Fatal for the current pass; no files are dispatched.
    #[error("manifest error for {location}: {reason}")]
    Manifest {
        /// URL or local path of the offending document.
        location: String,
        /// Specific reason the document was rejected.
        reason: String,
    },

    /// A file system operation failed.
    ///
    /// During install these are accumulated and reported per file; they do
    /// not abort the remaining copies.
    #[error("file system error during {operation} on {path}")]
    FileSystem {
        /// The operation that failed (e.g. "create directory", "copy").
        operation: String,
        /// Path where the failure occurred.
        path: String,
    },

    /// An operation was rejected because a conflicting one is still running.
    ///
    /// Raised synchronously; the session state is unchanged. This is a
    /// reported rejection, never a silent no-op.
    #[error("'{requested}' rejected: {active} is still running")]
    Conflict {
        /// The operation that was requested.
        requested: String,
        /// The operation currently holding the session.
        active: String,
    },

    /// Launching the installed executable failed.
    #[error("could not launch '{product}': {reason}")]
    Launch {
        /// Product whose executable failed to start.
        product: String,
        /// Spawn error description.
        reason: String,
    },

    /// The operation observed its cancellation token and unwound.
    ///
    /// Not a failure: the session reports it and returns to idle.
    #[error("operation cancelled")]
    Cancelled,

    /// An unrecognized platform label was supplied.
    #[error("unknown platform: {label}")]
    UnknownPlatform {
        /// The label that did not match any known platform.
        label: String,
    },

    /// Standard I/O error with no more specific classification.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl QupError {
    /// Shorthand for a [`Validation`](Self::Validation) error.
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation { reason: reason.into() }
    }

    /// Shorthand for a [`FileSystem`](Self::FileSystem) error.
    pub fn filesystem(operation: impl Into<String>, path: impl Into<String>) -> Self {
        Self::FileSystem { operation: operation.into(), path: path.into() }
    }

    /// Whether this error was caused by cooperative cancellation.
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, QupError>;
