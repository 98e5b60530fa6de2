//! Launch a resolved artifact as a child process

use super::{EntryFailure, EntryPoint, ExecutionContext};
use std::io;
use std::path::Path;
use std::process::{Command, ExitStatus};
use tracing::debug;

/// Variables a child may inherit; everything else is dropped
pub const INHERITED_ENV: &[&str] = &["HOME", "USER", "LANG", "LC_ALL", "TERM", "TZ", "PATH"];

/// Ordered artifact set handed to the child
pub const ARTIFACTS_ENV: &str = "PINBOOT_ARTIFACTS";

/// Path of the bootstrapper binary handed to the child
pub const SELF_ENV: &str = "PINBOOT_SELF";

/// Executes the first resolved requirement with the original arguments
#[derive(Debug, Clone)]
pub struct ExecEntry {
    inherited: Vec<String>,
}

impl Default for ExecEntry {
    fn default() -> Self {
        Self {
            inherited: INHERITED_ENV.iter().map(|v| v.to_string()).collect(),
        }
    }
}

impl ExecEntry {
    /// Inherit only the named variables
    pub fn with_inherited(inherited: Vec<String>) -> Self {
        Self { inherited }
    }

    fn command(&self, program: &Path, ctx: &ExecutionContext) -> Result<Command, EntryFailure> {
        let mut cmd = Command::new(program);
        cmd.args(ctx.args()).env_clear();
        for key in &self.inherited {
            if let Some(value) = std::env::var_os(key) {
                cmd.env(key, value);
            }
        }
        cmd.env(ARTIFACTS_ENV, ctx.artifact_path_list()?)
            .env(SELF_ENV, ctx.self_artifact());
        Ok(cmd)
    }
}

impl EntryPoint for ExecEntry {
    fn run(&self, ctx: &ExecutionContext) -> Result<u8, EntryFailure> {
        let program = ctx.requirements().first().ok_or_else(|| {
            EntryFailure::Unlaunchable("no requirement artifact to execute".to_string())
        })?;

        ensure_executable(program)?;
        debug!("Executing {}", program.display());

        let status = self
            .command(program, ctx)?
            .status()
            .map_err(|e| spawn_failure(program, e))?;
        Ok(exit_code(status))
    }
}

fn spawn_failure(program: &Path, err: io::Error) -> EntryFailure {
    let reason = format!("cannot execute {}: {}", program.display(), err);
    match err.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
            EntryFailure::Unlaunchable(reason)
        }
        // ENOEXEC and friends: the artifact is not a program for this platform
        _ if err.raw_os_error().is_some() => EntryFailure::Unlaunchable(reason),
        _ => EntryFailure::Failed(reason),
    }
}

/// Committed artifacts are read-only; add execute bits without touching content
#[cfg(unix)]
fn ensure_executable(program: &Path) -> Result<(), EntryFailure> {
    use std::os::unix::fs::PermissionsExt;

    let meta = std::fs::metadata(program).map_err(|e| {
        EntryFailure::Unlaunchable(format!("cannot stat {}: {}", program.display(), e))
    })?;
    let mode = meta.permissions().mode();
    if mode & 0o111 == 0o111 {
        return Ok(());
    }
    std::fs::set_permissions(program, std::fs::Permissions::from_mode(mode | 0o555)).map_err(
        |e| EntryFailure::Unlaunchable(format!("cannot mark {} executable: {}", program.display(), e)),
    )
}

#[cfg(not(unix))]
fn ensure_executable(program: &Path) -> Result<(), EntryFailure> {
    if program.is_file() {
        Ok(())
    } else {
        Err(EntryFailure::Unlaunchable(format!(
            "{} does not exist",
            program.display()
        )))
    }
}

/// Forward the child's status; death by signal maps to 128 + signal
fn exit_code(status: ExitStatus) -> u8 {
    if let Some(code) = status.code() {
        return (code & 0xff) as u8;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128u8.wrapping_add(signal as u8);
        }
    }
    crate::error::EXIT_INTERNAL
}
