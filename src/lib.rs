//! gmdl - Telegram group media downloader
//!
//! Walks a group's history one calendar day at a time and saves the media
//! it finds into a dated folder tree, either straight into each day folder
//! or grouped under the caption that describes a run of photos.
//!
//! # Modules
//!
//! - [`session`] - Message source abstraction
//! - [`export`] - Session over a Telegram Desktop JSON export
//! - [`window`] - Per-day message window with early stop
//! - [`classifier`] - Caption-driven photo grouping
//! - [`scan`] - Per-day scans for both download modes
//! - [`run`] - Run orchestration over a date range
//! - [`restrictions`] - Caption restriction list
//! - [`presets`] - Saved run parameters
//! - [`layout`] - Output folder layout
//! - [`error`] - Custom error types with rich context

pub mod classifier;
pub mod cli;
pub mod config;
pub mod date_parser;
pub mod error;
pub mod export;
pub mod layout;
pub mod logging;
pub mod model;
pub mod presets;
pub mod restrictions;
pub mod run;
pub mod save;
pub mod scan;
pub mod session;
pub mod window;

#[cfg(test)]
mod test_support;

pub use error::{GmdlError, Result, ResultExt};
pub use export::ExportSession;
pub use model::{DisqualifiedCaption, DownloadMode, Entity, Media, MediaKind, MediaPolicy, Message};
pub use run::{DownloadRequest, RunSettings, RunSummary, run_download, run_with_session};
pub use session::{MessageStream, Session};

/// Format a count with thousands separators.
#[must_use]
pub fn format_number(value: usize) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (idx, ch) in digits.chars().rev().enumerate() {
        if idx > 0 && idx % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    out.chars().rev().collect()
}
