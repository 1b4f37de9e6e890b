//! Messaging session abstraction.
//!
//! A session owns the single connection used for both message iteration
//! and media download. The scanner only depends on these traits, so the
//! message source can be swapped without touching the grouping logic.

#![allow(async_fn_in_trait)]

use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::model::{Entity, Message};

/// Lazy ascending sequence of messages.
pub trait MessageStream {
    /// Pull the next message, or `None` when the history is exhausted.
    ///
    /// # Errors
    /// Returns a transport error if the message cannot be retrieved.
    async fn next_message(&mut self) -> Result<Option<Message>>;
}

/// Connection to a message history.
pub trait Session {
    type Stream<'a>: MessageStream
    where
        Self: 'a;

    /// # Errors
    /// Returns an error if the session cannot be established.
    async fn connect(&mut self) -> Result<()>;

    /// Release the connection. Must be safe to call after a failed run.
    ///
    /// # Errors
    /// Returns an error if the transport reports a failure while closing.
    async fn disconnect(&mut self) -> Result<()>;

    /// Resolve a group or channel by name or numeric id.
    ///
    /// # Errors
    /// Returns `EntityNotFound` when nothing matches.
    async fn resolve_entity(&self, name_or_id: &str) -> Result<Entity>;

    /// Messages of `entity` in ascending date order, starting at the first
    /// message dated at or after `offset_date`.
    ///
    /// # Errors
    /// Returns `NotConnected` or a transport error.
    fn iter_messages<'a>(
        &'a self,
        entity: &Entity,
        offset_date: NaiveDateTime,
    ) -> Result<Self::Stream<'a>>;

    /// Download the media of `message` into `destination` (an existing
    /// directory). Returns the number of bytes written.
    ///
    /// # Errors
    /// Returns a transport error when the download fails.
    async fn download_media(&self, message: &Message, destination: &Path) -> Result<u64>;
}

/// Pick a file name inside `dir` that does not exist yet.
///
/// `photo.jpg` becomes `photo (1).jpg`, `photo (2).jpg`, ... on collision.
#[must_use]
pub fn unique_destination(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }

    let path = Path::new(file_name);
    let stem = path
        .file_stem()
        .map_or_else(|| file_name.to_string(), |s| s.to_string_lossy().into_owned());
    let extension = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut counter = 1u32;
    loop {
        let candidate = dir.join(format!("{stem} ({counter}){extension}"));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}
