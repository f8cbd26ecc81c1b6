//! Line-oriented parser for the instructions document.
//!
//! The parser runs in two stages: physical lines are first assembled into
//! logical lines (backslash continuation, comment truncation), then each
//! logical line is interpreted against the currently open section. Only one
//! section is open at a time; a `url=` directive flushes the accumulated
//! file set into a [`Batch`] and closes the section.

use crate::manifest::{Batch, FileSpec, Manifest, SectionKind};
use crate::platform::Platform;

/// Accumulation state for the currently open section.
struct OpenSection {
    kind: SectionKind,
    files: Vec<FileSpec>,
    destination: Option<String>,
}

impl OpenSection {
    fn new(kind: SectionKind) -> Self {
        Self { kind, files: Vec::new(), destination: None }
    }

    /// Registers a spec, replacing any earlier entry with the same name.
    fn register(&mut self, spec: FileSpec) {
        if let Some(existing) = self.files.iter_mut().find(|f| f.name == spec.name) {
            *existing = spec;
        } else {
            self.files.push(spec);
        }
    }
}

pub(super) fn parse(text: &str, platform: Platform) -> Manifest {
    let mut batches = Vec::new();
    let mut open: Option<OpenSection> = None;

    for line in logical_lines(text) {
        let line = strip_comment(&line);
        if line.is_empty() {
            continue;
        }

        // Section headers close whatever was open; un-flushed directives are
        // dropped, they never leak across a section boundary.
        if line == SectionKind::General.header() {
            open = Some(OpenSection::new(SectionKind::General));
            continue;
        }
        if line == SectionKind::Unix.header() {
            open = platform.is_unix_family().then(|| OpenSection::new(SectionKind::Unix));
            continue;
        }

        let Some((key, value)) = split_directive(line) else {
            continue;
        };

        // `url=` flushes and closes whatever is open; with nothing open
        // (including an inert [Unix] section) it is a no-op.
        if key == "url" {
            flush(&mut open, &mut batches, value);
            continue;
        }

        let Some(section) = open.as_mut() else {
            continue;
        };

        match section.kind {
            SectionKind::General => match key {
                "file" => register_file(section, value, platform),
                "file_destination" => section.destination = Some(value.to_string()),
                "executable" => {
                    if suffix_matches(value, platform) {
                        section.register(FileSpec {
                            name: value.to_string(),
                            destination: None,
                            executable: true,
                        });
                    }
                }
                _ => {}
            },
            SectionKind::Unix => match key {
                "file" => register_file(section, value, platform),
                "local_executable" => section.destination = Some(value.to_string()),
                "shell" => section.register(FileSpec {
                    name: value.to_string(),
                    destination: None,
                    executable: true,
                }),
                _ => {
                    if let Some(token) = key.strip_prefix("executable:") {
                        if token.trim() == platform.executable_token() {
                            section.register(FileSpec {
                                name: value.to_string(),
                                destination: None,
                                executable: true,
                            });
                        }
                    }
                }
            },
        }
    }

    Manifest { batches }
}

/// Registers a plain `file=` entry, skipping library extensions that are
/// irrelevant on the selected platform.
fn register_file(section: &mut OpenSection, value: &str, platform: Platform) {
    let excluded = std::path::Path::new(value)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            platform.excluded_library_extensions().iter().any(|x| ext.eq_ignore_ascii_case(x))
        });
    if excluded {
        return;
    }
    section.register(FileSpec { name: value.to_string(), destination: None, executable: false });
}

/// Flushes the open section into a batch against `base_url` and closes it.
///
/// The section destination is applied to every accumulated spec that has no
/// destination of its own; `.` and `./` mean the staging root.
fn flush(open: &mut Option<OpenSection>, batches: &mut Vec<Batch>, base_url: &str) {
    let Some(section) = open.take() else { return };
    let destination = section
        .destination
        .filter(|d| d != "." && d != "./")
        .map(|d| d.trim_end_matches('/').to_string());

    let files = section
        .files
        .into_iter()
        .map(|mut spec| {
            if spec.destination.is_none() {
                spec.destination = destination.clone();
            }
            spec
        })
        .collect();

    batches.push(Batch { kind: section.kind, base_url: base_url.to_string(), files });
}

/// Whether a plain `executable=` name matches the platform's suffix
/// convention. An empty suffix matches only unsuffixed names, so `.exe`
/// binaries never activate off Windows.
fn suffix_matches(name: &str, platform: Platform) -> bool {
    let suffix = platform.executable_suffix();
    if suffix.is_empty() {
        !name.to_ascii_lowercase().ends_with(".exe")
    } else {
        name.to_ascii_lowercase().ends_with(suffix)
    }
}

/// Splits a `key=value` directive on the first `=`, trimming both sides.
///
/// Returns `None` for lines without `=` or with an empty key or value;
/// those are no-ops, not errors.
fn split_directive(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    let (key, value) = (key.trim(), value.trim());
    if key.is_empty() || value.is_empty() {
        return None;
    }
    Some((key, value))
}

/// Truncates `line` at its first `#` and trims the remainder.
fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(pos) => line[..pos].trim(),
        None => line.trim(),
    }
}

/// Assembles physical lines into logical lines: a trailing backslash means
/// the next physical line is appended (backslash stripped) before the line
/// is interpreted.
fn logical_lines(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut pending = String::new();

    for raw in text.lines() {
        let line = raw.trim();
        if let Some(stripped) = line.strip_suffix('\\') {
            pending.push_str(stripped.trim_end());
            pending.push(' ');
            continue;
        }
        pending.push_str(line);
        lines.push(std::mem::take(&mut pending));
    }
    if !pending.is_empty() {
        lines.push(pending);
    }
    lines
}
