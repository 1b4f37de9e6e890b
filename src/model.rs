//! Data models for messages read from a group history.
//!
//! These structures are the normalized form every session hands to the
//! scanner, independent of where the messages came from.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of media attached to a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
    /// GIF-style animation.
    Animation,
    /// Any other file (documents, audio, stickers).
    Document,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Photo => "photo",
            Self::Video => "video",
            Self::Animation => "animation",
            Self::Document => "document",
        };
        f.write_str(name)
    }
}

/// Media payload of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    pub kind: MediaKind,
    /// Opaque handle the session resolves when downloading.
    pub location: String,
}

/// A single message from a group history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    /// Timezone-naive timestamp; compared as-is against day windows.
    pub date: NaiveDateTime,
    pub caption: Option<String>,
    pub media: Option<Media>,
}

impl Message {
    /// Caption text, treating an empty string as absent.
    #[must_use]
    pub fn caption(&self) -> Option<&str> {
        self.caption.as_deref().filter(|text| !text.is_empty())
    }

    #[must_use]
    pub fn media_kind(&self) -> Option<MediaKind> {
        self.media.as_ref().map(|media| media.kind)
    }
}

/// A resolved group or channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: i64,
    pub title: String,
}

/// Which media kinds count as downloadable.
///
/// Photos always qualify; videos and animations are opt-in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaPolicy {
    pub include_video: bool,
    pub include_animation: bool,
}

impl MediaPolicy {
    /// Photos only.
    #[must_use]
    pub const fn photos_only() -> Self {
        Self {
            include_video: false,
            include_animation: false,
        }
    }

    #[must_use]
    pub const fn qualifies(self, kind: MediaKind) -> bool {
        match kind {
            MediaKind::Photo => true,
            MediaKind::Video => self.include_video,
            MediaKind::Animation => self.include_animation,
            MediaKind::Document => false,
        }
    }

    /// Whether the message carries media this policy downloads.
    #[must_use]
    pub fn accepts(self, message: &Message) -> bool {
        message.media_kind().is_some_and(|kind| self.qualifies(kind))
    }
}

/// What happens to a media message whose caption hits a restriction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DisqualifiedCaption {
    /// Drop the whole message: no media, no description.
    #[default]
    DropMessage,
    /// Keep the media in the group but ignore the caption.
    KeepMedia,
}

/// How a day's media is laid out on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadMode {
    /// Every qualifying media lands directly in the day folder.
    Ungrouped,
    /// Media is grouped under the caption that describes it.
    Grouped,
}

impl DownloadMode {
    #[must_use]
    pub const fn needs_restrictions(self) -> bool {
        matches!(self, Self::Grouped)
    }
}

impl fmt::Display for DownloadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ungrouped => f.write_str("general"),
            Self::Grouped => f.write_str("grouped by theme"),
        }
    }
}
