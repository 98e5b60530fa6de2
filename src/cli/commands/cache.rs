//! Cache commands - inspect and maintain the artifact cache

use crate::cache::{CacheEntry, CacheStore};
use crate::cli::args::{Commands, OutputFormat};
use crate::config::ConfigSource;
use crate::digest::ArtifactHash;
use crate::error::{BootError, BootResult};
use crate::fetch::UrlFetcher;
use crate::resolve::Resolver;
use crate::ui::{self, UiContext};
use bytesize::ByteSize;
use console::style;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Execute a cache command against `store`
pub fn execute(command: Commands, store: &CacheStore) -> BootResult<()> {
    let ctx = UiContext::detect();
    match command {
        Commands::Path => {
            println!("{}", store.root().display());
            Ok(())
        }
        Commands::List { format } => list_entries(store, format),
        Commands::Verify { hashes } => verify_entries(&ctx, store, &hashes),
        Commands::Warm { manifest } => warm(&ctx, store, manifest),
        Commands::Prune { older_than } => prune(store, older_than),
        Commands::Clear { yes } => clear(store, yes),
    }
}

/// List committed artifacts
fn list_entries(store: &CacheStore, format: OutputFormat) -> BootResult<()> {
    let entries = store.entries()?;

    match format {
        OutputFormat::Table => print_table(&entries),
        OutputFormat::Json => print_json(&entries)?,
        OutputFormat::Plain => print_plain(&entries),
    }

    Ok(())
}

fn print_table(entries: &[CacheEntry]) {
    if entries.is_empty() {
        println!("No cached artifacts.");
        return;
    }

    println!("{:<64}  {:>10}  {:<16}", "SHA256", "SIZE", "MODIFIED");
    println!("{}", "-".repeat(94));

    for entry in entries {
        let modified = entry
            .modified
            .map(|m| m.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<64}  {:>10}  {:<16}",
            entry.hash,
            ByteSize(entry.size).to_string(),
            modified
        );
    }

    println!();
    let total: u64 = entries.iter().map(|e| e.size).sum();
    println!("Total: {} artifact(s), {}", entries.len(), ByteSize(total));
}

fn print_json(entries: &[CacheEntry]) -> BootResult<()> {
    println!("{}", serde_json::to_string_pretty(entries)?);
    Ok(())
}

fn print_plain(entries: &[CacheEntry]) {
    for entry in entries {
        println!("{}", entry.path.display());
    }
}

/// Re-digest artifacts, reporting every mismatch before failing
fn verify_entries(ctx: &UiContext, store: &CacheStore, hashes: &[String]) -> BootResult<()> {
    let targets: Vec<ArtifactHash> = if hashes.is_empty() {
        store.entries()?.into_iter().map(|e| e.hash).collect()
    } else {
        hashes
            .iter()
            .map(|h| {
                h.parse::<ArtifactHash>()
                    .map_err(|reason: String| BootError::argument(format!("'{}'", h), reason))
            })
            .collect::<BootResult<_>>()?
    };

    if targets.is_empty() {
        println!("No cached artifacts to verify.");
        return Ok(());
    }

    ui::section(ctx, "Verifying cached artifacts");
    let mut first_failure = None;
    for hash in &targets {
        if !store.exists(hash) {
            ui::step_warn(ctx, &format!("{} not cached", hash));
            continue;
        }
        match store.verify(hash) {
            Ok(_) => ui::step_ok(ctx, hash.as_str()),
            Err(e) => {
                ui::step_error_detail(ctx, hash.as_str(), &e.to_string());
                if first_failure.is_none() {
                    first_failure = Some(e);
                }
            }
        }
    }

    match first_failure {
        Some(e) => {
            ui::remark(ctx, "Remove corrupt entries with: pinboot-cache clear");
            Err(e)
        }
        None => Ok(()),
    }
}

/// Resolve a manifest's requirements into the cache without launching
fn warm(ctx: &UiContext, store: &CacheStore, manifest: Option<PathBuf>) -> BootResult<()> {
    let source = match manifest {
        Some(path) => ConfigSource::with_path(path),
        None => ConfigSource::new(),
    };
    let config = source.load()?;
    let fetcher = UrlFetcher::new(config.timeout);
    let resolver = Resolver::new(store, &fetcher).with_ui(ctx.clone());

    ui::section(ctx, "Warming cache");
    ui::key_value(ctx, "root", &store.root().display().to_string());
    for requirement in &config.requirements {
        let path = resolver.resolve_one(requirement)?;
        ui::step_ok(ctx, &format!("{} -> {}", requirement.url, path.display()));
    }
    if config.requirements.is_empty() {
        ui::remark(ctx, "Manifest has no requirements");
    }
    Ok(())
}

/// Remove stale partial downloads
fn prune(store: &CacheStore, older_than_mins: u64) -> BootResult<()> {
    let secs = older_than_mins
        .checked_mul(60)
        .ok_or_else(|| BootError::argument("--older-than", "minute count is too large"))?;
    let removed = store.prune_partials(Duration::from_secs(secs))?;
    println!(
        "{} removed {} partial download(s)",
        style("✓").green(),
        removed
    );
    Ok(())
}

/// Remove every cached artifact
fn clear(store: &CacheStore, skip_confirm: bool) -> BootResult<()> {
    let entries = store.entries()?;

    if entries.is_empty() {
        println!("No cached artifacts to clear.");
        return Ok(());
    }

    println!("This will remove {} artifact(s):", entries.len());
    for entry in &entries {
        println!("  {} {}", style("•").red(), entry.hash);
    }
    println!();

    if !skip_confirm {
        print!("Are you sure? [y/N] ");
        let _ = io::stdout().flush();

        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_err() {
            println!("Failed to read input, aborting.");
            return Ok(());
        }

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    debug!("Clearing cache at {}", store.root().display());
    let removed = store.clear()?;
    println!("{} cleared {} artifact(s)", style("✓").green(), removed);

    Ok(())
}
