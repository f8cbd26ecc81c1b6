//! Builder for instructions documents used across the integration tests.

use std::fmt::Write;

const TRAILER: &str = "# End of file. Required comment.";

/// Accumulates sections and directives and renders the final document,
/// with or without its required trailer.
#[derive(Debug, Default)]
pub struct ManifestBuilder {
    text: String,
}

impl ManifestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn general(mut self) -> Self {
        let _ = writeln!(self.text, "[General]");
        self
    }

    pub fn unix(mut self) -> Self {
        let _ = writeln!(self.text, "[Unix]");
        self
    }

    pub fn file(mut self, name: &str) -> Self {
        let _ = writeln!(self.text, "file={name}");
        self
    }

    pub fn destination(mut self, dir: &str) -> Self {
        let _ = writeln!(self.text, "file_destination={dir}");
        self
    }

    pub fn shell(mut self, name: &str) -> Self {
        let _ = writeln!(self.text, "shell={name}");
        self
    }

    pub fn executable(mut self, token: &str, name: &str) -> Self {
        let _ = writeln!(self.text, "executable:{token}={name}");
        self
    }

    /// Flushes the open section against a base URL.
    pub fn url(mut self, base: &str) -> Self {
        let _ = writeln!(self.text, "url={base}");
        self
    }

    pub fn raw_line(mut self, line: &str) -> Self {
        let _ = writeln!(self.text, "{line}");
        self
    }

    /// Renders the complete document, trailer included.
    pub fn build(mut self) -> String {
        let _ = writeln!(self.text, "{TRAILER}");
        self.text
    }

    /// Renders the document without its trailer, for truncation tests.
    pub fn build_truncated(self) -> String {
        self.text
    }
}
