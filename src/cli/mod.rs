//! cli
//!
//! Command-line interface layer for Trailmark.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Merge flags with configuration
//! - Delegate to command handlers and render their results
//!
//! # Architecture
//!
//! The CLI layer is thin. Range resolution, payload assembly and delivery
//! live in [`crate::core`] and [`crate::ledger`]; handlers wire them
//! together and turn outcomes into text.

pub mod args;
pub mod commands;
pub mod context;

pub use args::{Cli, Shell};
pub use context::{Context, Globals};

use anyhow::Result;

/// Run a parsed command line.
///
/// This is the main entry point called from `main.rs`.
pub fn run(cli: Cli) -> Result<()> {
    let globals = Globals::from_cli(&cli);
    commands::dispatch(cli.command, globals)
}
