//! pinboot - verify-and-cache application bootstrapper
//!
//! Reads the bootstrap manifest, resolves every pinned artifact through the
//! local cache and hands control to the configured entry point. All
//! arguments after the program name are passed through untouched.

use console::style;
use pinboot::bootstrap::Bootstrap;
use pinboot::cache::CacheStore;
use pinboot::config::{ConfigSource, Verbosity};
use pinboot::error::{BootError, BootResult, EXIT_INTERNAL};
use pinboot::fetch::UrlFetcher;
use pinboot::launch::EntryRegistry;
use pinboot::ui::UiContext;
use std::cell::Cell;
use std::ffi::OsString;
use std::panic::{self, AssertUnwindSafe};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let args: Vec<OsString> = std::env::args_os().skip(1).collect();
    let verbosity = Cell::new(Verbosity::default());

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| run(args, &verbosity)));
    let silent = verbosity.get() == Verbosity::Silent;

    match outcome {
        Ok(Ok(code)) => ExitCode::from(code),
        Ok(Err(e)) => {
            if !silent {
                eprintln!("{} {}", style("Error:").red().bold().for_stderr(), e);
                if let Some(hint) = e.hint() {
                    eprintln!("{} {}", style("Hint:").yellow().for_stderr(), hint);
                }
            }
            ExitCode::from(e.exit_code())
        }
        Err(_) => ExitCode::from(EXIT_INTERNAL),
    }
}

fn run(args: Vec<OsString>, verbosity: &Cell<Verbosity>) -> BootResult<u8> {
    let source = ConfigSource::new();
    let manifest = source.manifest()?;

    // Honor the requested level before any value is validated
    let level = manifest.verbosity()?;
    verbosity.set(level);
    init_logging(level);

    let config = manifest.into_configuration()?;
    debug!(
        "Loaded manifest: entry={} requirements={}",
        config.entry,
        config.requirements.len()
    );

    let store = CacheStore::new(ConfigSource::cache_root()?);
    debug!("Cache root: {}", store.root().display());
    let fetcher = UrlFetcher::new(config.timeout);
    let registry = EntryRegistry::with_builtins();

    let self_artifact = std::env::current_exe()
        .map_err(|e| BootError::io("locating the bootstrapper binary", e))?;

    let ui = if level.shows_progress() {
        UiContext::detect()
    } else {
        UiContext::non_interactive()
    };

    Bootstrap::new(&registry, &store, &fetcher)
        .with_ui(ui)
        .run(&config, self_artifact, args)
}

fn init_logging(level: Verbosity) {
    if level == Verbosity::Silent {
        // Panics still map to the internal exit code, just without a message
        panic::set_hook(Box::new(|_| {}));
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(level.filter_directive()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}
