//! Per-day scans for both download modes.

use std::path::Path;
use tracing::{debug, error, info};

use crate::classifier::{GroupStep, ThemeGroupingClassifier};
use crate::error::Result;
use crate::layout::ensure_dir;
use crate::model::{DisqualifiedCaption, Entity, MediaPolicy};
use crate::restrictions::RestrictionSet;
use crate::save::{DownloadTarget, save_media, save_targets};
use crate::session::Session;
use crate::window::{DayWindow, DayWindowIter};

/// Settings shared by every day of a run.
#[derive(Debug, Clone, Copy)]
pub struct ScanOptions<'r> {
    pub policy: MediaPolicy,
    pub on_disqualified: DisqualifiedCaption,
    pub restrictions: &'r RestrictionSet,
}

/// Mode A: save every qualifying media of the day straight into `day_dir`.
///
/// # Errors
/// Propagates transport errors raised while reading messages.
pub async fn scan_ungrouped_day<S: Session>(
    session: &S,
    entity: &Entity,
    window: DayWindow,
    day_dir: &Path,
    policy: MediaPolicy,
) -> Result<usize> {
    let stream = session.iter_messages(entity, window.lower())?;
    let mut messages = DayWindowIter::new(stream, window);
    let mut day_count = 0;

    while let Some(message) = messages.next().await? {
        debug!(
            id = message.id,
            date = %message.date,
            media = ?message.media_kind(),
            "Message"
        );
        day_count += save_media(session, &message, day_dir, policy).await;
    }

    Ok(day_count)
}

/// Mode B: group media under the caption that describes it.
///
/// Each completed group is written to `"<day_label> <caption>"` inside
/// `day_dir` as soon as its completing message is read.
///
/// # Errors
/// Propagates transport errors raised while reading messages. A group
/// whose folder cannot be created is logged and counts as zero.
pub async fn scan_grouped_day<S: Session>(
    session: &S,
    entity: &Entity,
    window: DayWindow,
    day_dir: &Path,
    day_label: &str,
    options: ScanOptions<'_>,
) -> Result<usize> {
    let stream = session.iter_messages(entity, window.lower())?;
    let mut messages = DayWindowIter::new(stream, window);
    let mut classifier =
        ThemeGroupingClassifier::new(options.restrictions, options.policy, options.on_disqualified);
    let mut day_count = 0;

    while let Some(message) = messages.next().await? {
        debug!(
            id = message.id,
            date = %message.date,
            media = ?message.media_kind(),
            "Message"
        );
        let GroupStep::Flushed(group) = classifier.step(message) else {
            continue;
        };

        let group_dir = day_dir.join(group.folder_name(day_label));
        if let Err(e) = ensure_dir(&group_dir) {
            error!(error = %e, photos = group.media.len(), "Skipping group, folder not created");
            continue;
        }
        info!(folder = %group_dir.display(), photos = group.media.len(), "Saving group");

        let targets: Vec<DownloadTarget<'_>> = group
            .media
            .iter()
            .map(|message| DownloadTarget::new(&group_dir, message))
            .collect();
        day_count += save_targets(session, &targets, options.policy).await;
    }

    classifier.finish();
    Ok(day_count)
}
