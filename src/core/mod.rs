//! Core types shared across the pipeline.
//!
//! This module hosts the error taxonomy ([`QupError`]) and the crate-wide
//! [`Result`] alias. Heavier domain types live with the component that owns
//! them (manifest model in [`crate::manifest`], file records in
//! [`crate::digest`], and so on); `core` stays dependency-free so every
//! module can use it without cycles.

pub mod error;

pub use error::{QupError, Result};
