//! ui
//!
//! User-facing output.
//!
//! # Modules
//!
//! - [`output`] - Output formatting and display
//!
//! # Design
//!
//! All user-facing text goes through this module so quiet mode and the
//! stdout/stderr split are applied consistently.

pub mod output;
