//! Download progress with CI fallback

use super::context::UiContext;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::Read;
use std::time::Duration;

/// Byte counter for a streaming download.
///
/// Draws an indicatif bar on stderr in interactive mode and stays silent
/// otherwise; the caller's log lines cover the plain case.
pub struct DownloadProgress {
    bar: Option<ProgressBar>,
}

impl DownloadProgress {
    /// Create a progress indicator for `label`
    pub fn new(ctx: &UiContext, label: &str) -> Self {
        let bar = ctx.use_fancy_output().then(|| {
            let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
            let style = ProgressStyle::default_spinner()
                .template("  {spinner:.cyan} {prefix}  {bytes:.dim} {binary_bytes_per_sec:.dim}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ");
            bar.set_style(style);
            bar.set_prefix(label.to_string());
            bar.enable_steady_tick(Duration::from_millis(120));
            bar
        });
        Self { bar }
    }

    /// Wrap `reader` so bytes pulled through it advance the bar
    pub fn wrap<'a, R: Read + 'a>(&self, reader: R) -> Box<dyn Read + 'a> {
        match self.bar {
            Some(ref bar) => Box::new(bar.wrap_read(reader)),
            None => Box::new(reader),
        }
    }

    /// Finish and clear the progress bar
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }
}

impl Drop for DownloadProgress {
    fn drop(&mut self) {
        self.finish();
    }
}
