//! Command-line interface for `pinboot-cache`

pub mod args;
pub mod commands;

pub use args::{Cli, Commands, OutputFormat};
