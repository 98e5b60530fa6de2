//! Configuration for pinboot
//!
//! The bootstrap manifest is compiled into the binary. `PINBOOT_MANIFEST`
//! points at a file to use instead.

pub mod manifest;

pub use manifest::{Configuration, Manifest, Requirement, Verbosity};

use crate::error::{BootError, BootResult};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name used for the cache directory
pub const APP_NAME: &str = "pinboot";

/// Manifest compiled into the binary
pub const EMBEDDED_MANIFEST: &str = include_str!("../../pinboot.toml");

/// Environment variable naming a manifest file to use instead of the embedded one
pub const MANIFEST_ENV: &str = "PINBOOT_MANIFEST";

/// Environment variable naming the cache root directly
pub const CACHE_DIR_ENV: &str = "PINBOOT_CACHE_DIR";

/// Where the manifest text comes from
#[derive(Debug, Clone)]
enum ManifestSource {
    Embedded(&'static str),
    File(PathBuf),
}

/// Reads the bootstrap manifest
pub struct ConfigSource {
    source: ManifestSource,
}

impl ConfigSource {
    /// Use `PINBOOT_MANIFEST` when set, the embedded manifest otherwise
    pub fn new() -> Self {
        match std::env::var_os(MANIFEST_ENV).filter(|v| !v.is_empty()) {
            Some(path) => Self::with_path(PathBuf::from(path)),
            None => Self::embedded(EMBEDDED_MANIFEST),
        }
    }

    /// Read the given manifest text
    pub fn embedded(text: &'static str) -> Self {
        Self {
            source: ManifestSource::Embedded(text),
        }
    }

    /// Read a manifest file
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            source: ManifestSource::File(path),
        }
    }

    /// Raw manifest text
    pub fn read(&self) -> BootResult<String> {
        match &self.source {
            ManifestSource::Embedded(text) => Ok((*text).to_string()),
            ManifestSource::File(path) => {
                debug!("Reading manifest from {}", path.display());
                std::fs::read_to_string(path).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::NotFound {
                        BootError::ManifestMissing(path.display().to_string())
                    } else {
                        BootError::io(format!("reading manifest {}", path.display()), e)
                    }
                })
            }
        }
    }

    /// Parse the manifest syntax without validating values
    pub fn manifest(&self) -> BootResult<Manifest> {
        Manifest::parse(&self.read()?)
    }

    /// Load and validate the configuration
    pub fn load(&self) -> BootResult<Configuration> {
        self.manifest()?.into_configuration()
    }

    /// Cache root from the process environment
    pub fn cache_root() -> BootResult<PathBuf> {
        cache_root_from(
            std::env::var_os(CACHE_DIR_ENV),
            std::env::var_os("XDG_CACHE_HOME"),
            dirs::home_dir(),
        )
    }
}

impl Default for ConfigSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve the cache root from explicit inputs
///
/// Precedence:
/// 1. `PINBOOT_CACHE_DIR`, used as is.
/// 2. `$XDG_CACHE_HOME/pinboot`
/// 3. `<home>/.cache/pinboot`
///
/// Empty values count as unset.
pub fn cache_root_from(
    override_dir: Option<OsString>,
    xdg_cache_home: Option<OsString>,
    home: Option<PathBuf>,
) -> BootResult<PathBuf> {
    if let Some(dir) = override_dir.filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    if let Some(xdg) = xdg_cache_home.filter(|d| !d.is_empty()) {
        return Ok(Path::new(&xdg).join(APP_NAME));
    }
    match home.filter(|h| !h.as_os_str().is_empty()) {
        Some(home) => Ok(home.join(".cache").join(APP_NAME)),
        None => Err(BootError::CacheRootUnavailable),
    }
}
