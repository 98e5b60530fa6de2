//! Entry-point launch
//!
//! Entry points are registered by name in an [`EntryRegistry`] ahead of time
//! and looked up once the requirements are resolved. The selected entry sees
//! only the [`ExecutionContext`] it is handed: the bootstrapper itself
//! followed by the resolved artifacts, plus the untouched argument vector.

mod exec;

pub use exec::ExecEntry;

use crate::error::{BootError, BootResult};
use std::any::Any;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Built-in entry that does nothing and exits 0
pub const NOOP_ENTRY: &str = "pinboot.noop";

/// Built-in entry that executes the first resolved requirement
pub const EXEC_ENTRY: &str = "pinboot.exec";

/// Everything an entry point may see
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    entry: String,
    /// Self artifact first, then requirements in manifest order
    artifacts: Vec<PathBuf>,
    args: Vec<OsString>,
}

impl ExecutionContext {
    pub fn new(
        entry: impl Into<String>,
        self_artifact: PathBuf,
        resolved: Vec<PathBuf>,
        args: Vec<OsString>,
    ) -> Self {
        let mut artifacts = Vec::with_capacity(resolved.len() + 1);
        artifacts.push(self_artifact);
        artifacts.extend(resolved);
        Self {
            entry: entry.into(),
            artifacts,
            args,
        }
    }

    pub fn entry(&self) -> &str {
        &self.entry
    }

    /// The full ordered artifact set
    pub fn artifacts(&self) -> &[PathBuf] {
        &self.artifacts
    }

    pub fn self_artifact(&self) -> &Path {
        &self.artifacts[0]
    }

    /// Resolved requirements only, in manifest order
    pub fn requirements(&self) -> &[PathBuf] {
        &self.artifacts[1..]
    }

    /// Original process arguments, without the program name
    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// Artifact set joined with the platform path separator
    pub fn artifact_path_list(&self) -> Result<OsString, EntryFailure> {
        std::env::join_paths(&self.artifacts)
            .map_err(|e| EntryFailure::Unlaunchable(format!("artifact path list: {}", e)))
    }
}

/// Why an entry point did not complete normally
#[derive(Error, Debug)]
pub enum EntryFailure {
    /// The entry cannot run in this context at all
    #[error("{0}")]
    Unlaunchable(String),

    /// The entry ran and failed
    #[error("{0}")]
    Failed(String),
}

/// A callable the bootstrapper can hand control to
pub trait EntryPoint {
    /// Run to completion and return the process exit code
    fn run(&self, ctx: &ExecutionContext) -> Result<u8, EntryFailure>;
}

impl<F> EntryPoint for F
where
    F: Fn(&ExecutionContext) -> Result<u8, EntryFailure>,
{
    fn run(&self, ctx: &ExecutionContext) -> Result<u8, EntryFailure> {
        self(ctx)
    }
}

/// Entry that returns immediately
pub struct NoopEntry;

impl EntryPoint for NoopEntry {
    fn run(&self, ctx: &ExecutionContext) -> Result<u8, EntryFailure> {
        debug!("No-op entry called with {} argument(s)", ctx.args().len());
        Ok(0)
    }
}

/// Entry points addressable by qualified name
#[derive(Default)]
pub struct EntryRegistry {
    entries: BTreeMap<String, Box<dyn EntryPoint>>,
}

impl EntryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding `pinboot.noop` and `pinboot.exec`
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry
            .register(NOOP_ENTRY, NoopEntry)
            .register(EXEC_ENTRY, ExecEntry::default());
        registry
    }

    /// Register `entry` under `name`, replacing any previous one
    pub fn register(&mut self, name: impl Into<String>, entry: impl EntryPoint + 'static) -> &mut Self {
        self.entries.insert(name.into(), Box::new(entry));
        self
    }

    pub fn get(&self, name: &str) -> Option<&dyn EntryPoint> {
        self.entries.get(name).map(|e| e.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }
}

/// Invoke the context's entry point exactly once
///
/// Returns the entry's exit code. A panic inside the entry is caught and
/// reported as `EntryFailed`.
pub fn launch(registry: &EntryRegistry, ctx: &ExecutionContext) -> BootResult<u8> {
    let entry = registry
        .get(ctx.entry())
        .ok_or_else(|| BootError::EntryNotFound(ctx.entry().to_string()))?;

    info!(
        "Launching {} with {} artifact(s)",
        ctx.entry(),
        ctx.artifacts().len()
    );
    for (i, path) in ctx.artifacts().iter().enumerate() {
        debug!("  [{}] {}", i, path.display());
    }

    match panic::catch_unwind(AssertUnwindSafe(|| entry.run(ctx))) {
        Ok(Ok(code)) => {
            debug!("{} exited with {}", ctx.entry(), code);
            Ok(code)
        }
        Ok(Err(EntryFailure::Unlaunchable(reason))) => Err(BootError::Launch {
            entry: ctx.entry().to_string(),
            reason,
        }),
        Ok(Err(EntryFailure::Failed(reason))) => Err(BootError::EntryFailed {
            entry: ctx.entry().to_string(),
            reason,
        }),
        Err(payload) => Err(BootError::EntryFailed {
            entry: ctx.entry().to_string(),
            reason: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}
