//! CLI argument definitions for `pinboot-cache` using clap derive
//!
//! The bootstrapper binary itself parses no arguments; everything after the
//! program name belongs to the launched application.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// pinboot-cache - Inspect and maintain the pinboot artifact cache
///
/// Artifacts are stored by SHA-256 under the cache root and re-verified
/// before every launch.
#[derive(Parser, Debug)]
#[command(name = "pinboot-cache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Cache root (defaults to $XDG_CACHE_HOME/pinboot or ~/.cache/pinboot)
    #[arg(long, global = true, env = "PINBOOT_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the cache root
    Path,

    /// List cached artifacts
    List {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Re-digest cached artifacts and report mismatches
    Verify {
        /// Only verify these hashes (default: everything)
        hashes: Vec<String>,
    },

    /// Download and verify a manifest's requirements without launching
    Warm {
        /// Manifest file (default: PINBOOT_MANIFEST or the embedded manifest)
        #[arg(short, long)]
        manifest: Option<PathBuf>,
    },

    /// Remove leftover partial downloads
    Prune {
        /// Only remove partial files older than this many minutes
        #[arg(long, default_value = "60", value_parser = clap::value_parser!(u64).range(..=u64::MAX / 60))]
        older_than: u64,
    },

    /// Remove cached artifacts
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Output format for list command
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}
