//! Integration test suite for qup
//!
//! End-to-end tests that exercise complete update rounds against a local
//! fixture HTTP server, both through the library API and through the
//! compiled `qup` binary.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! Tests are organized by functionality area:
//! - **pipeline**: full fetch/parse/download/diff/install rounds
//! - **cli_pipeline**: the same flows through the `qup` binary
//! - **cli_favorites**: favorites management through the binary

// Shared test utilities (from parent tests/ directory)
#[path = "../common/mod.rs"]
mod common;

mod cli_favorites;
mod cli_pipeline;
mod pipeline;
