//! Persistent artifact cache
//!
//! Provides content-addressed storage keyed by the SHA-256 of each artifact.
//! Entries are immutable once committed.
//!
//! # Trust Model
//!
//! - The file name is the digest the manifest pinned, never a URL
//! - Every cached file is re-digested before it is handed to the launcher
//! - A mismatch is fatal; the store never repairs an entry behind your back
//! - Interrupted downloads leave only `.partial` files, never final entries
//!
//! # Entry States
//!
//! | State | Location | Description |
//! |-------|----------|-------------|
//! | Absent | none | Not downloaded yet |
//! | Partial | `.pinboot-*.partial` | Download in progress or crashed |
//! | Committed | `<sha256>.artifact` | Verified, read-only |

pub mod store;

pub use store::{CacheEntry, CacheStore, ARTIFACT_EXT, PARTIAL_SUFFIX};
