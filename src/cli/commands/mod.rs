//! CLI command implementations

pub mod cache;

pub use cache::execute as cache;
