//! qup - keep installed products in sync with a remote distribution point.
//!
//! A product publisher maintains a line-oriented "instructions" document
//! describing the files a product consists of per platform. qup fetches that
//! document, downloads the described files into a per-product staging
//! directory, computes a content diff against the installed tree, and copies
//! the staged files into place, preserving permissions and patching the
//! product's launch script along the way.
//!
//! # Pipeline
//!
//! One update round moves through these stages, driven by a [`session::Session`]:
//!
//! 1. **Fetch** - download the instructions document; it must end with its
//!    sentinel trailer or the round is rejected ([`download`])
//! 2. **Parse** - interpret the document for the target platform ([`manifest`])
//! 3. **Download** - stream every described file into staging, concurrently
//! 4. **Diff** - hash staged against installed content ([`digest`])
//! 5. **Install** - best-effort copy into the destination ([`install`])
//! 6. **Launch** - optionally start the product, detached ([`launch`])
//!
//! Every long-running stage observes a cancellation token, and only one
//! operation holds a session at a time; a conflicting request is rejected
//! synchronously, never queued.
//!
//! # Core Modules
//!
//! - [`cli`] - command-line interface
//! - [`config`] - persisted favorites under `~/.qup`
//! - [`core`] - the [`core::QupError`] taxonomy and result alias
//! - [`digest`] - content-hash diff engine
//! - [`download`] - concurrent download orchestration
//! - [`install`] - permission-preserving sync engine
//! - [`launch`] - detached process launcher
//! - [`manifest`] - instructions document model and parser
//! - [`platform`] - target-platform resolution
//! - [`session`] - the per-product state machine tying it all together

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod digest;
pub mod download;
pub mod install;
pub mod launch;
pub mod manifest;
pub mod platform;
pub mod session;

pub use crate::core::{QupError, Result};
