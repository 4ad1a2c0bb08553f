//! Command-line interface
//!
//! clap definitions for the probe binary and the table/JSON renderers its
//! commands print through.

pub mod args;
pub mod output;

pub use args::{Cli, Commands, OutputFormat};
