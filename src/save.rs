//! Single-message media save.
//!
//! This is where per-message failures stop: a failed download is logged
//! and counted as zero, and the day scan carries on.

use std::path::{Path, PathBuf};
use tracing::{debug, error};

use crate::model::{MediaPolicy, Message};
use crate::session::Session;

/// A message paired with the folder its media goes to.
#[derive(Debug, Clone)]
pub struct DownloadTarget<'m> {
    pub directory: PathBuf,
    pub message: &'m Message,
}

impl<'m> DownloadTarget<'m> {
    pub fn new(directory: impl Into<PathBuf>, message: &'m Message) -> Self {
        Self {
            directory: directory.into(),
            message,
        }
    }
}

/// Download the media of one message into `directory`.
///
/// Returns 1 on a completed download, 0 when the media does not qualify
/// or the download failed.
pub async fn save_media<S: Session>(
    session: &S,
    message: &Message,
    directory: &Path,
    policy: MediaPolicy,
) -> usize {
    if !policy.accepts(message) {
        return 0;
    }
    debug!(id = message.id, path = %directory.display(), "Trying download");
    match session.download_media(message, directory).await {
        Ok(bytes) => {
            debug!(id = message.id, bytes, "Downloaded");
            1
        }
        Err(e) => {
            error!(id = message.id, error = %e, "Error downloading media");
            0
        }
    }
}

/// Save every target in order, returning the number of completed downloads.
pub async fn save_targets<S: Session>(
    session: &S,
    targets: &[DownloadTarget<'_>],
    policy: MediaPolicy,
) -> usize {
    let mut saved = 0;
    for target in targets {
        saved += save_media(session, target.message, &target.directory, policy).await;
    }
    saved
}
