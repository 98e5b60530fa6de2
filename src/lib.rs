//! pinboot - Self-contained application bootstrapper
//!
//! Reads a pinned requirement list from the embedded manifest, makes sure
//! every artifact is present and SHA-256 verified in a local cache, then
//! hands control to a registered entry point.

pub mod bootstrap;
pub mod cache;
pub mod cli;
pub mod config;
pub mod digest;
pub mod error;
pub mod fetch;
pub mod launch;
pub mod resolve;
pub mod ui;

pub use error::{BootError, BootResult};
