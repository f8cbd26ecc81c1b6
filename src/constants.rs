//! Global constants used throughout the qup codebase.
//!
//! Timer intervals, protocol markers, and naming conventions that are
//! shared across modules. Defining them centrally keeps magic values
//! discoverable and consistent between the pipeline and its tests.

use std::time::Duration;

/// Sentinel trailer that terminates a well-formed manifest document.
///
/// The manifest fetch stage keeps accumulating response bytes until this
/// line is observed at the (trimmed) end of the buffer. Its absence means
/// "still downloading", not an error, until the transfer itself finishes.
pub const END_OF_MANIFEST: &str = "# End of file. Required comment.";

/// Prefix for per-product staging directories under the system temp path.
///
/// The full staging path is `<tmp>/qup-<product>`, so re-running a session
/// for the same product reuses the same staging area.
pub const STAGING_PREFIX: &str = "qup-";

/// Marker comment inside a product's shell wrapper script.
///
/// During install, the sync engine injects the launch stanza immediately
/// after the line containing this marker.
pub const LAUNCH_STANZA_MARKER: &str = "# qup launch stanza";

/// File extension identifying desktop-entry descriptors.
pub const DESKTOP_ENTRY_EXTENSION: &str = "desktop";

/// User agent sent with every HTTP request.
pub const USER_AGENT: &str = concat!("qup/", env!("CARGO_PKG_VERSION"));

/// Settle delay applied after the in-flight download set drains.
///
/// A burst of near-simultaneous completions is coalesced into a single
/// "batch finished" decision instead of one decision per file.
pub const SETTLE_DELAY: Duration = Duration::from_millis(250);

/// Interval of the destination-directory writability poll (1.5 seconds).
pub const WRITABLE_POLL_INTERVAL: Duration = Duration::from_millis(1500);

/// Environment variable overriding the qup home directory (`~/.qup`).
pub const HOME_ENV: &str = "QUP_HOME";

/// File name of the favorites store inside the qup home directory.
pub const FAVORITES_FILE: &str = "favorites.toml";
