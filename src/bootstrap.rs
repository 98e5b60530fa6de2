//! Bootstrap pipeline
//!
//! Drives a loaded configuration through resolution and launch:
//!
//! ```text
//! Init -> ConfigLoaded -> Resolving(0..n) -> Ready -> Launched
//!   \___________\______________\______________\____-> Failed
//! ```
//!
//! `Failed` and `Launched` are terminal.

use crate::cache::CacheStore;
use crate::config::Configuration;
use crate::error::{BootError, BootResult};
use crate::fetch::Fetcher;
use crate::launch::{self, EntryRegistry, ExecutionContext};
use crate::resolve::Resolver;
use crate::ui::UiContext;
use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;
use tracing::debug;

/// Where the bootstrap currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    ConfigLoaded,
    /// Resolving the requirement at this index
    Resolving(usize),
    Ready,
    Launched,
    /// Failed while in the given stage
    Failed(FailedIn),
}

/// Stage a failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailedIn {
    Config,
    Resolving(usize),
    Launch,
}

impl Stage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Launched | Self::Failed(_))
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => write!(f, "init"),
            Self::ConfigLoaded => write!(f, "config-loaded"),
            Self::Resolving(i) => write!(f, "resolving[{}]", i),
            Self::Ready => write!(f, "ready"),
            Self::Launched => write!(f, "launched"),
            Self::Failed(FailedIn::Config) => write!(f, "failed(config)"),
            Self::Failed(FailedIn::Resolving(i)) => write!(f, "failed(resolving[{}])", i),
            Self::Failed(FailedIn::Launch) => write!(f, "failed(launch)"),
        }
    }
}

/// One bootstrap run
pub struct Bootstrap<'a> {
    registry: &'a EntryRegistry,
    store: &'a CacheStore,
    fetcher: &'a dyn Fetcher,
    ui: UiContext,
    stage: Stage,
}

impl<'a> Bootstrap<'a> {
    pub fn new(registry: &'a EntryRegistry, store: &'a CacheStore, fetcher: &'a dyn Fetcher) -> Self {
        Self {
            registry,
            store,
            fetcher,
            ui: UiContext::non_interactive(),
            stage: Stage::Init,
        }
    }

    /// Show download progress according to `ui`
    pub fn with_ui(mut self, ui: UiContext) -> Self {
        self.ui = ui;
        self
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Resolve every requirement of `config`, then invoke its entry point
    ///
    /// Returns the entry point's exit code. Any error leaves the bootstrap in
    /// `Failed`; nothing is launched with a partial artifact set.
    pub fn run(
        &mut self,
        config: &Configuration,
        self_artifact: PathBuf,
        args: Vec<OsString>,
    ) -> BootResult<u8> {
        if self.stage.is_terminal() {
            return Err(BootError::Internal(format!(
                "bootstrap already finished ({})",
                self.stage
            )));
        }
        self.advance(Stage::ConfigLoaded);

        // Unknown entry points fail before anything is downloaded
        if !self.registry.contains(&config.entry) {
            self.advance(Stage::Failed(FailedIn::Config));
            return Err(BootError::EntryNotFound(config.entry.clone()));
        }

        let resolver = Resolver::new(self.store, self.fetcher).with_ui(self.ui.clone());
        let mut resolved = Vec::with_capacity(config.requirements.len());
        for (i, requirement) in config.requirements.iter().enumerate() {
            self.advance(Stage::Resolving(i));
            match resolver.resolve_one(requirement) {
                Ok(path) => resolved.push(path),
                Err(e) => {
                    self.advance(Stage::Failed(FailedIn::Resolving(i)));
                    return Err(e);
                }
            }
        }
        self.advance(Stage::Ready);

        let ctx = ExecutionContext::new(config.entry.clone(), self_artifact, resolved, args);
        match launch::launch(self.registry, &ctx) {
            Ok(code) => {
                self.advance(Stage::Launched);
                Ok(code)
            }
            Err(e) => {
                self.advance(Stage::Failed(FailedIn::Launch));
                Err(e)
            }
        }
    }

    fn advance(&mut self, next: Stage) {
        debug!("Bootstrap {} -> {}", self.stage, next);
        self.stage = next;
    }
}
