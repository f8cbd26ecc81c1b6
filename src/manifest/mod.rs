//! Manifest model and parser.
//!
//! A manifest (the remote "instructions" document) is a line-oriented text
//! file describing which files belong to a product on which platform:
//!
//! ```text
//! [General]
//! file=app.qup_instructions
//! file_destination=bin
//! url=https://example.test/dist
//!
//! [Unix]
//! executable:debian_amd64=tool
//! shell=tool.sh
//! local_executable=bin
//! url=https://example.test/dist
//! # End of file. Required comment.
//! ```
//!
//! Lines may end with `\` to continue on the next physical line; `#` starts
//! a trailing comment; blank and malformed lines are ignored. Each `url=`
//! directive *flushes* the files accumulated in the open section into one
//! [`Batch`], so a single document can describe several download rounds.
//!
//! Parsing is platform-aware: the `[Unix]` section only activates for
//! non-bundle Unix-like targets, and `executable` directives are filtered by
//! the platform's suffix convention (see [`crate::platform`]). Parsing a
//! text never fails (unrecognized content is skipped) but reading the
//! document from disk can.

use crate::constants::END_OF_MANIFEST;
use crate::platform::Platform;

mod parser;


/// One file to download, with destination and executable flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSpec {
    /// Remote relative name, appended to the batch base URL. May contain
    /// subdirectories, in which case it doubles as the local relative path.
    pub name: String,
    /// Destination subdirectory under the staging root, if any.
    pub destination: Option<String>,
    /// Whether the downloaded file must be marked executable.
    pub executable: bool,
}

impl FileSpec {
    /// Local path of this file relative to the staging (or install) root.
    pub fn relative_path(&self) -> String {
        match &self.destination {
            Some(dir) => format!("{dir}/{}", self.name),
            None => self.name.clone(),
        }
    }
}

/// The section scope a batch was parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    /// The `[General]` section, applicable to every platform.
    General,
    /// The `[Unix]` platform-family section.
    Unix,
}

impl SectionKind {
    /// Header line that opens this section.
    pub const fn header(self) -> &'static str {
        match self {
            Self::General => "[General]",
            Self::Unix => "[Unix]",
        }
    }
}

/// One flushed download round: the files accumulated in a section up to its
/// `url=` directive, plus the base URL they are fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Scope of the section that produced this batch.
    pub kind: SectionKind,
    /// Base URL; each file is fetched from `<base_url>/<name>`.
    pub base_url: String,
    /// Files to fetch, in registration order.
    pub files: Vec<FileSpec>,
}

/// A parsed instructions document: the ordered batches its `url=` directives
/// produced for the selected target platform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    /// Flushed batches, in document order.
    pub batches: Vec<Batch>,
}

impl Manifest {
    /// Parses the raw text of an instructions document for `platform`.
    ///
    /// Never fails: blank lines, comments, malformed lines, empty keys or
    /// values, and directives outside an active section are all no-ops.
    pub fn parse(text: &str, platform: Platform) -> Self {
        parser::parse(text, platform)
    }

    /// Whether `bytes` end (ignoring trailing whitespace) with the sentinel
    /// trailer that terminates a complete manifest document.
    ///
    /// The manifest fetch stage calls this after every received chunk; a
    /// missing trailer means the document is still in flight.
    pub fn is_complete(bytes: &[u8]) -> bool {
        let trimmed = bytes.trim_ascii_end();
        trimmed.ends_with(END_OF_MANIFEST.as_bytes())
    }

    /// Total number of files across every batch.
    pub fn file_count(&self) -> usize {
        self.batches.iter().map(|b| b.files.len()).sum()
    }
}
