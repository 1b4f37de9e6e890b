//! Theme grouping: single-pass classification of a day's messages.
//!
//! Media messages accumulate in a [`PhotoGroup`] until a caption that is
//! not disqualified by the [`RestrictionSet`] arrives, either on one of
//! the media messages or on a following text-only message. At that point
//! the group is complete and handed back to the caller for saving. Media
//! still waiting for a caption when the day ends is discarded.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::model::{DisqualifiedCaption, MediaPolicy, Message};
use crate::restrictions::RestrictionSet;

static INVALID_FOLDER_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[<>:"/\\|?*]"#).expect("folder character class is valid"));

/// Replace characters that are invalid in folder names with `_` and trim.
#[must_use]
pub fn sanitize_folder_name(name: &str) -> String {
    INVALID_FOLDER_CHARS
        .replace_all(name, "_")
        .trim()
        .to_string()
}

/// Media collected so far plus the caption that will name it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhotoGroup {
    media: Vec<Message>,
    pending_description: Option<String>,
}

impl PhotoGroup {
    #[must_use]
    pub fn media(&self) -> &[Message] {
        &self.media
    }

    #[must_use]
    pub fn pending_description(&self) -> Option<&str> {
        self.pending_description.as_deref()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.media.is_empty()
    }

    fn is_complete(&self) -> bool {
        self.pending_description.is_some() && !self.media.is_empty()
    }
}

/// A completed group ready to be written to its own folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeGroup {
    pub description: String,
    pub media: Vec<Message>,
}

impl ThemeGroup {
    /// Folder name inside the day folder: `"<dd-mm-yyyy> <description>"`.
    #[must_use]
    pub fn folder_name(&self, day_label: &str) -> String {
        format!("{day_label} {}", sanitize_folder_name(&self.description))
    }
}

/// Outcome of feeding one message to the classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupStep {
    /// The group is still waiting for media or a description.
    Open,
    /// Media with a disqualified caption was dropped; state unchanged.
    Dropped,
    /// The message completed a group, which has been reset.
    Flushed(ThemeGroup),
}

/// Stateful grouping over one day's ordered messages.
#[derive(Debug)]
pub struct ThemeGroupingClassifier<'r> {
    restrictions: &'r RestrictionSet,
    policy: MediaPolicy,
    on_disqualified: DisqualifiedCaption,
    group: PhotoGroup,
}

impl<'r> ThemeGroupingClassifier<'r> {
    #[must_use]
    pub fn new(
        restrictions: &'r RestrictionSet,
        policy: MediaPolicy,
        on_disqualified: DisqualifiedCaption,
    ) -> Self {
        Self {
            restrictions,
            policy,
            on_disqualified,
            group: PhotoGroup::default(),
        }
    }

    /// The in-flight group.
    #[must_use]
    pub const fn group(&self) -> &PhotoGroup {
        &self.group
    }

    /// Apply one message, in chronological order.
    pub fn step(&mut self, message: Message) -> GroupStep {
        if self.policy.accepts(&message) {
            match message.caption().map(str::to_owned) {
                None => {
                    debug!(id = message.id, "Add media to group");
                    self.group.media.push(message);
                }
                Some(caption) if self.restrictions.is_description(&caption) => {
                    debug!(id = message.id, "Add media to group with description");
                    self.group.media.push(message);
                    self.group.pending_description = Some(caption);
                }
                Some(_) => match self.on_disqualified {
                    DisqualifiedCaption::DropMessage => {
                        debug!(id = message.id, "Drop media with restricted caption");
                        return GroupStep::Dropped;
                    }
                    DisqualifiedCaption::KeepMedia => {
                        debug!(id = message.id, "Add media to group, caption restricted");
                        self.group.media.push(message);
                    }
                },
            }
        } else if message.media.is_none() && !self.group.is_empty() {
            if let Some(caption) = message
                .caption()
                .filter(|caption| self.restrictions.is_description(caption))
            {
                debug!(id = message.id, "Found description of group");
                self.group.pending_description = Some(caption.to_owned());
            }
        }

        self.flush_if_complete()
    }

    fn flush_if_complete(&mut self) -> GroupStep {
        if !self.group.is_complete() {
            return GroupStep::Open;
        }
        let PhotoGroup {
            media,
            pending_description,
        } = std::mem::take(&mut self.group);
        let description = pending_description.unwrap_or_default();
        debug!(description = %description, media = media.len(), "Group complete");
        GroupStep::Flushed(ThemeGroup { description, media })
    }

    /// End the day. Media still waiting for a description is discarded;
    /// returns how many items were dropped.
    pub fn finish(self) -> usize {
        let dangling = self.group.media.len();
        if dangling > 0 {
            debug!(dangling, "Discarding media without description at end of day");
        }
        dangling
    }
}
