//! Bootstrap manifest parsing
//!
//! The manifest is a small TOML document naming the verbosity, the entry
//! point and the pinned requirements. Parsing happens in two steps so the
//! verbosity can be honored even when the rest of the manifest is invalid.

use crate::digest::{ArtifactHash, HASH_HEX_LEN};
use crate::error::{BootError, BootResult};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Characters accepted between the hash and the URL of a requirement token
const SEPARATORS: [char; 2] = ['@', '='];

/// Diagnostic level for the bootstrapper's own output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Silent,
    #[default]
    Error,
    Info,
    Debug,
}

impl Verbosity {
    /// `EnvFilter` directive for the bootstrapper's log target
    pub fn filter_directive(&self) -> &'static str {
        match self {
            Self::Silent => "off",
            Self::Error => "pinboot=error",
            Self::Info => "pinboot=info",
            Self::Debug => "pinboot=debug",
        }
    }

    /// Whether progress bars and informational output are wanted
    pub fn shows_progress(&self) -> bool {
        *self >= Self::Info
    }
}

impl FromStr for Verbosity {
    type Err = BootError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "silent" => Ok(Self::Silent),
            "error" => Ok(Self::Error),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            other => Err(BootError::VerbosityInvalid(other.to_string())),
        }
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Silent => "silent",
            Self::Error => "error",
            Self::Info => "info",
            Self::Debug => "debug",
        };
        f.write_str(name)
    }
}

/// A pinned artifact: its expected digest and where to download it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub hash: ArtifactHash,
    pub url: Url,
}

impl FromStr for Requirement {
    type Err = BootError;

    /// Parse `<64 hex chars><separator><url>`
    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let hash_part = token
            .get(..HASH_HEX_LEN)
            .ok_or_else(|| BootError::requirement(token, "token is shorter than a SHA-256 hash"))?;
        let hash: ArtifactHash = hash_part
            .parse()
            .map_err(|reason: String| BootError::requirement(token, reason))?;

        let rest = &token[HASH_HEX_LEN..];
        let mut chars = rest.chars();
        match chars.next() {
            Some(c) if SEPARATORS.contains(&c) => {}
            Some(c) => {
                return Err(BootError::requirement(
                    token,
                    format!("expected '@' or '=' after the hash, found '{}'", c),
                ))
            }
            None => return Err(BootError::requirement(token, "missing source URL")),
        }

        let location = chars.as_str();
        if location.is_empty() {
            return Err(BootError::requirement(token, "missing source URL"));
        }
        let url = Url::parse(location).map_err(|e| BootError::requirement(token, e.to_string()))?;
        match url.scheme() {
            "http" | "https" | "file" => {}
            other => {
                return Err(BootError::requirement(
                    token,
                    format!("unsupported URL scheme '{}'", other),
                ))
            }
        }

        Ok(Self { hash, url })
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.hash, self.url)
    }
}

/// Fully validated bootstrap configuration
#[derive(Debug, Clone)]
pub struct Configuration {
    pub verbosity: Verbosity,
    /// Qualified name of the entry point to invoke
    pub entry: String,
    /// Per-fetch timeout, if any
    pub timeout: Option<Duration>,
    /// Requirements in classpath order
    pub requirements: Vec<Requirement>,
}

impl Configuration {
    /// Parse and validate a manifest in one go
    pub fn parse(text: &str) -> BootResult<Self> {
        Manifest::parse(text)?.into_configuration()
    }
}

/// Requirement list as written: one string of tokens or an array of them
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RequireList {
    Text(String),
    Items(Vec<String>),
}

impl Default for RequireList {
    fn default() -> Self {
        Self::Items(Vec::new())
    }
}

impl RequireList {
    fn tokens(&self) -> Vec<&str> {
        match self {
            Self::Text(text) => text.split_whitespace().collect(),
            Self::Items(items) => items.iter().flat_map(|i| i.split_whitespace()).collect(),
        }
    }
}

/// Syntactically valid manifest whose values are not checked yet
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    verbosity: Option<String>,
    entry: Option<String>,
    timeout_secs: Option<u64>,
    #[serde(default)]
    requires: RequireList,
}

impl Manifest {
    /// Parse the TOML layer only
    pub fn parse(text: &str) -> BootResult<Self> {
        if text.trim().is_empty() {
            return Err(BootError::ManifestMissing("manifest is empty".to_string()));
        }
        toml::from_str(text).map_err(|e| BootError::ManifestInvalid {
            reason: e.to_string(),
        })
    }

    /// Requested verbosity, `error` when absent
    pub fn verbosity(&self) -> BootResult<Verbosity> {
        match self.verbosity.as_deref() {
            Some(level) => level.parse(),
            None => Ok(Verbosity::default()),
        }
    }

    /// Validate every value and build the configuration
    pub fn into_configuration(self) -> BootResult<Configuration> {
        let verbosity = self.verbosity()?;

        let entry = self
            .entry
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or(BootError::EntryMissing)?
            .to_string();
        if !is_qualified_name(&entry) {
            return Err(BootError::EntryNameInvalid(entry));
        }

        let requirements = self
            .requires
            .tokens()
            .into_iter()
            .map(str::parse)
            .collect::<BootResult<Vec<Requirement>>>()?;

        Ok(Configuration {
            verbosity,
            entry,
            timeout: self.timeout_secs.map(Duration::from_secs),
            requirements,
        })
    }
}

/// Dot-separated identifiers, e.g. `app.cli.main`
fn is_qualified_name(name: &str) -> bool {
    name.split('.').all(|segment| {
        let mut chars = segment.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            }
            _ => false,
        }
    })
}
