//! Requirement resolution
//!
//! Turns the requirement list into verified local paths, strictly in list
//! order. The first failure aborts the whole resolution: there is no partial
//! result and no automatic re-download of a corrupt cache entry.

use crate::cache::CacheStore;
use crate::config::Requirement;
use crate::error::BootResult;
use crate::fetch::Fetcher;
use crate::ui::{DownloadProgress, UiContext};
use std::path::PathBuf;
use tracing::{debug, info};

/// Coordinates the cache and the fetcher for each requirement
pub struct Resolver<'a> {
    store: &'a CacheStore,
    fetcher: &'a dyn Fetcher,
    ui: UiContext,
}

impl<'a> Resolver<'a> {
    pub fn new(store: &'a CacheStore, fetcher: &'a dyn Fetcher) -> Self {
        Self {
            store,
            fetcher,
            ui: UiContext::non_interactive(),
        }
    }

    /// Show download progress according to `ui`
    pub fn with_ui(mut self, ui: UiContext) -> Self {
        self.ui = ui;
        self
    }

    /// Resolve every requirement, preserving order
    pub fn resolve(&self, requirements: &[Requirement]) -> BootResult<Vec<PathBuf>> {
        requirements.iter().map(|r| self.resolve_one(r)).collect()
    }

    /// Guarantee a verified local copy of one requirement
    pub fn resolve_one(&self, requirement: &Requirement) -> BootResult<PathBuf> {
        let hash = &requirement.hash;
        debug!("Application requires {}", requirement.url);

        if self.store.exists(hash) {
            debug!(
                "Artifact exists locally at {}",
                self.store.path_for(hash).display()
            );
            return self.store.verify(hash);
        }

        debug!("Artifact {} is not cached", hash);
        info!("Downloading {}", requirement.url);

        let source = self.fetcher.open(&requirement.url)?;
        let progress = DownloadProgress::new(&self.ui, &display_name(requirement));
        let mut reader = progress.wrap(source);
        let result = self.store.commit(hash, &mut reader, &requirement.url);
        progress.finish();

        let path = result?;
        debug!("Committed {} to {}", requirement.url, path.display());
        Ok(path)
    }
}

/// Last path segment of the URL, for progress labels
fn display_name(requirement: &Requirement) -> String {
    requirement
        .url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| requirement.url.to_string())
}
