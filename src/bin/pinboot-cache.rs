//! pinboot-cache - inspect and maintain the pinboot artifact cache

use clap::Parser;
use console::style;
use pinboot::cache::CacheStore;
use pinboot::cli::Cli;
use pinboot::config::ConfigSource;
use pinboot::error::BootResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold().for_stderr(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow().for_stderr(), hint);
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn run() -> BootResult<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_directive(cli.verbose)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let root = match cli.cache_dir {
        Some(dir) => dir,
        None => ConfigSource::cache_root()?,
    };
    debug!("Cache root: {}", root.display());

    pinboot::cli::commands::cache(cli.command, &CacheStore::new(root))
}

/// Filter for the library and this binary: 0 = warn, 1 = info, 2+ = debug
fn log_directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "pinboot=warn,pinboot_cache=warn",
        1 => "pinboot=info,pinboot_cache=info",
        _ => "pinboot=debug,pinboot_cache=debug",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_covers_binary_target() {
        assert_eq!(module_path!(), "pinboot_cache::tests");
        for verbose in 0..3 {
            let directive = log_directive(verbose);
            assert!(directive.contains("pinboot="), "{directive}");
            assert!(directive.contains("pinboot_cache="), "{directive}");
        }
        assert!(log_directive(2).ends_with("pinboot_cache=debug"));
    }
}
