//! UI module for progress and CLI output
//!
//! Progress is drawn on stderr only when it is an interactive terminal.
//! The maintenance CLI prints its report lines through the `output` helpers,
//! which fall back to plain bracketed prefixes in CI.

mod context;
mod output;
mod progress;

pub use context::UiContext;
pub use output::{key_value, remark, section, step_error_detail, step_ok, step_warn};
pub use progress::DownloadProgress;
