//! Error types for pinboot
//!
//! All modules use `BootResult<T>` as their return type. Every error maps to
//! one of two non-zero process exit codes through [`BootError::exit_code`].

use thiserror::Error;

/// Result type alias for pinboot operations
pub type BootResult<T> = Result<T, BootError>;

/// Exit code for a bad manifest, a failed fetch, an integrity mismatch or a
/// missing entry point.
pub const EXIT_REQUIREMENT: u8 = 1;

/// Exit code for failures nobody asked for: I/O outside a fetch, a panic, or
/// an entry point that failed while running.
pub const EXIT_INTERNAL: u8 = 2;

/// Broad classification of a [`BootError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Fetch,
    Integrity,
    Launch,
    Entry,
    Internal,
}

/// All errors that can occur while bootstrapping
#[derive(Error, Debug)]
pub enum BootError {
    // Configuration errors
    #[error("No bootstrap manifest found: {0}")]
    ManifestMissing(String),

    #[error("Invalid bootstrap manifest: {reason}")]
    ManifestInvalid { reason: String },

    #[error("Invalid verbosity level '{0}'. Valid values are silent, error, info, debug")]
    VerbosityInvalid(String),

    #[error("The entry point has not been specified")]
    EntryMissing,

    #[error("Invalid entry point name '{0}'")]
    EntryNameInvalid(String),

    #[error("Invalid requirement '{token}': {reason}")]
    RequirementInvalid { token: String, reason: String },

    #[error("Invalid argument {arg}: {reason}")]
    ArgumentInvalid { arg: String, reason: String },

    #[error("Cannot determine cache directory: neither XDG_CACHE_HOME nor a home directory is available")]
    CacheRootUnavailable,

    // Fetch errors
    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    // Integrity errors
    #[error("SHA-256 checksum of {location} does not match expected value ({expected}), got {actual}")]
    Integrity {
        expected: String,
        actual: String,
        location: String,
    },

    // Launch errors
    #[error("Entry point not found: {0}")]
    EntryNotFound(String),

    #[error("Cannot launch {entry}: {reason}")]
    Launch { entry: String, reason: String },

    #[error("Entry point {entry} failed: {reason}")]
    EntryFailed { entry: String, reason: String },

    // IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BootError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a fetch error for `url`
    pub fn fetch(url: impl ToString, reason: impl ToString) -> Self {
        Self::Fetch {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a requirement parse error naming the offending token
    pub fn requirement(token: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::RequirementInvalid {
            token: token.into(),
            reason: reason.into(),
        }
    }

    /// Create an error for a bad command-line argument
    pub fn argument(arg: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ArgumentInvalid {
            arg: arg.into(),
            reason: reason.into(),
        }
    }

    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ManifestMissing(_)
            | Self::ManifestInvalid { .. }
            | Self::VerbosityInvalid(_)
            | Self::EntryMissing
            | Self::EntryNameInvalid(_)
            | Self::RequirementInvalid { .. }
            | Self::ArgumentInvalid { .. }
            | Self::CacheRootUnavailable => ErrorKind::Config,
            Self::Fetch { .. } => ErrorKind::Fetch,
            Self::Integrity { .. } => ErrorKind::Integrity,
            Self::EntryNotFound(_) | Self::Launch { .. } => ErrorKind::Launch,
            Self::EntryFailed { .. } => ErrorKind::Entry,
            Self::Io { .. } | Self::Json(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> u8 {
        match self.kind() {
            ErrorKind::Config | ErrorKind::Fetch | ErrorKind::Integrity | ErrorKind::Launch => {
                EXIT_REQUIREMENT
            }
            ErrorKind::Entry | ErrorKind::Internal => EXIT_INTERNAL,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Integrity { .. } => Some(
                "The artifact differs from its pinned hash. Inspect it, then run: pinboot-cache verify",
            ),
            Self::CacheRootUnavailable => Some("Set XDG_CACHE_HOME or PINBOOT_CACHE_DIR"),
            Self::EntryMissing => Some("Add an `entry = \"...\"` line to the bootstrap manifest"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = BootError::EntryMissing;
        assert!(err.to_string().contains("entry point has not been specified"));
    }

    #[test]
    fn error_hint() {
        let err = BootError::CacheRootUnavailable;
        assert_eq!(err.hint(), Some("Set XDG_CACHE_HOME or PINBOOT_CACHE_DIR"));
        assert_eq!(BootError::EntryNotFound("a.b".into()).hint(), None);
    }

    #[test]
    fn requirement_errors_share_exit_code() {
        let errors = [
            BootError::EntryMissing,
            BootError::fetch("http://example.invalid/a", "connection refused"),
            BootError::Integrity {
                expected: "a".repeat(64),
                actual: "b".repeat(64),
                location: "http://example.invalid/a".into(),
            },
            BootError::EntryNotFound("app.main".into()),
        ];
        for err in errors {
            assert_eq!(err.exit_code(), EXIT_REQUIREMENT, "{err}");
        }
    }

    #[test]
    fn internal_errors_use_distinct_code() {
        let err = BootError::io("writing", std::io::Error::other("disk full"));
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.exit_code(), EXIT_INTERNAL);
        assert_ne!(EXIT_INTERNAL, EXIT_REQUIREMENT);

        let failed = BootError::EntryFailed {
            entry: "app.main".into(),
            reason: "panicked".into(),
        };
        assert_eq!(failed.exit_code(), EXIT_INTERNAL);
    }

    #[test]
    fn argument_error_wording() {
        let err = BootError::argument("'xyz'", "hash must be 64 hex characters");
        assert_eq!(
            err.to_string(),
            "Invalid argument 'xyz': hash must be 64 hex characters"
        );
        assert_eq!(err.exit_code(), EXIT_REQUIREMENT);
    }

    #[test]
    fn requirement_error_names_token() {
        let err = BootError::requirement("abc@http://x", "hash must be 64 hex characters");
        assert!(err.to_string().contains("abc@http://x"));
    }
}
