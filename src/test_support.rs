//! In-memory session used by unit tests.

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{GmdlError, Result};
use crate::model::{Entity, Media, MediaKind, Message};
use crate::session::{MessageStream, Session};

/// Stream over a fixed list that counts how many messages were pulled.
pub struct VecStream {
    items: VecDeque<Result<Message>>,
    pub pulled: usize,
}

impl VecStream {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            items: messages.into_iter().map(Ok).collect(),
            pulled: 0,
        }
    }

    pub fn failing_after(messages: Vec<Message>) -> Self {
        let mut stream = Self::new(messages);
        stream
            .items
            .push_back(Err(GmdlError::transport("connection reset")));
        stream
    }
}

impl MessageStream for VecStream {
    async fn next_message(&mut self) -> Result<Option<Message>> {
        self.pulled += 1;
        self.items.pop_front().transpose()
    }
}

impl MessageStream for &mut VecStream {
    async fn next_message(&mut self) -> Result<Option<Message>> {
        VecStream::next_message(self).await
    }
}

/// Session over an in-memory history. Downloads write `<id>.bin` files.
#[derive(Default)]
pub struct MemorySession {
    pub entity: Option<Entity>,
    pub messages: Vec<Message>,
    pub failing: HashSet<i64>,
    pub connected: bool,
    pub disconnects: usize,
    pub downloads: Mutex<Vec<(i64, PathBuf)>>,
}

impl MemorySession {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            entity: Some(Entity {
                id: 42,
                title: "Family".to_string(),
            }),
            messages,
            ..Self::default()
        }
    }

    pub fn downloaded_ids(&self) -> Vec<i64> {
        self.downloads
            .lock()
            .map(|d| d.iter().map(|(id, _)| *id).collect())
            .unwrap_or_default()
    }
}

impl Session for MemorySession {
    type Stream<'a>
        = VecStream
    where
        Self: 'a;

    async fn connect(&mut self) -> Result<()> {
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.connected = false;
        self.disconnects += 1;
        Ok(())
    }

    async fn resolve_entity(&self, name_or_id: &str) -> Result<Entity> {
        self.entity
            .clone()
            .filter(|e| e.title == name_or_id || e.id.to_string() == name_or_id)
            .ok_or_else(|| GmdlError::entity_not_found(name_or_id, None))
    }

    fn iter_messages<'a>(
        &'a self,
        _entity: &Entity,
        offset_date: NaiveDateTime,
    ) -> Result<Self::Stream<'a>> {
        Ok(VecStream::new(
            self.messages
                .iter()
                .filter(|m| m.date >= offset_date)
                .cloned()
                .collect(),
        ))
    }

    async fn download_media(&self, message: &Message, destination: &Path) -> Result<u64> {
        if self.failing.contains(&message.id) {
            return Err(GmdlError::transport(format!("download of {} failed", message.id)));
        }
        let path = destination.join(format!("{}.bin", message.id));
        std::fs::write(&path, b"media")?;
        if let Ok(mut downloads) = self.downloads.lock() {
            downloads.push((message.id, destination.to_path_buf()));
        }
        Ok(5)
    }
}

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
}

pub fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
    day(d).and_hms_opt(h, m, 0).unwrap()
}

pub fn photo(id: i64, date: NaiveDateTime, caption: Option<&str>) -> Message {
    media(id, date, MediaKind::Photo, caption)
}

pub fn media(id: i64, date: NaiveDateTime, kind: MediaKind, caption: Option<&str>) -> Message {
    Message {
        id,
        date,
        caption: caption.map(String::from),
        media: Some(Media {
            kind,
            location: format!("media/{id}"),
        }),
    }
}

pub fn text(id: i64, date: NaiveDateTime, caption: &str) -> Message {
    Message {
        id,
        date,
        caption: Some(caption.to_string()),
        media: None,
    }
}
