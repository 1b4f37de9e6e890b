//! Session backed by a Telegram Desktop JSON export.
//!
//! The export directory holds `result.json` plus the media folders it
//! references (`photos/`, `video_files/`, `files/`, ...). Both single-chat
//! exports and full-account exports (`chats.list`) are understood.
//!
//! "Downloading" copies the referenced file out of the export.

use chrono::NaiveDateTime;
use serde::Deserialize;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{GmdlError, Result, find_closest_match};
use crate::model::{Entity, Media, MediaKind, Message};
use crate::session::{MessageStream, Session, unique_destination};

/// File name Telegram Desktop gives the JSON export.
pub const EXPORT_FILE: &str = "result.json";

const EXPORT_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const NOT_INCLUDED_PREFIX: &str = "(File not included";

#[derive(Debug, Deserialize)]
struct RawExport {
    name: Option<String>,
    id: Option<i64>,
    #[serde(default)]
    messages: Vec<RawMessage>,
    chats: Option<RawChatList>,
}

#[derive(Debug, Deserialize)]
struct RawChatList {
    #[serde(default)]
    list: Vec<RawChat>,
}

#[derive(Debug, Deserialize)]
struct RawChat {
    name: Option<String>,
    id: i64,
    #[serde(default)]
    messages: Vec<RawMessage>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    id: i64,
    #[serde(rename = "type", default)]
    kind: String,
    date: String,
    #[serde(default)]
    text: RawText,
    photo: Option<String>,
    file: Option<String>,
    media_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawText {
    Plain(String),
    Parts(Vec<RawTextPart>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTextPart {
    Plain(String),
    Entity { text: String },
}

impl Default for RawText {
    fn default() -> Self {
        Self::Plain(String::new())
    }
}

impl RawText {
    fn flatten(self) -> String {
        match self {
            Self::Plain(text) => text,
            Self::Parts(parts) => parts
                .into_iter()
                .map(|part| match part {
                    RawTextPart::Plain(text) | RawTextPart::Entity { text } => text,
                })
                .collect(),
        }
    }
}

fn media_kind(media_type: Option<&str>) -> MediaKind {
    match media_type {
        Some("video_file" | "video_message") => MediaKind::Video,
        Some("animation") => MediaKind::Animation,
        _ => MediaKind::Document,
    }
}

impl RawMessage {
    fn into_message(self) -> Option<Message> {
        if self.kind == "service" {
            return None;
        }
        let date = match NaiveDateTime::parse_from_str(&self.date, EXPORT_DATE_FORMAT) {
            Ok(date) => date,
            Err(e) => {
                warn!(id = self.id, date = %self.date, error = %e, "Skipping message with bad date");
                return None;
            }
        };
        let media = match (self.photo, self.file) {
            (Some(location), _) => Some(Media {
                kind: MediaKind::Photo,
                location,
            }),
            (None, Some(location)) => Some(Media {
                kind: media_kind(self.media_type.as_deref()),
                location,
            }),
            (None, None) => None,
        };
        let caption = Some(self.text.flatten()).filter(|text| !text.is_empty());
        Some(Message {
            id: self.id,
            date,
            caption,
            media,
        })
    }
}

#[derive(Debug, Clone)]
struct ExportChat {
    entity: Entity,
    messages: Vec<Message>,
}

fn to_chat(name: Option<String>, id: i64, raw: Vec<RawMessage>) -> ExportChat {
    let mut messages: Vec<Message> = raw.into_iter().filter_map(RawMessage::into_message).collect();
    messages.sort_by_key(|m| m.date);
    ExportChat {
        entity: Entity {
            id,
            title: name.unwrap_or_default(),
        },
        messages,
    }
}

/// Parse the contents of `result.json` into chats.
fn parse_export(content: &str, file: &str) -> Result<Vec<ExportChat>> {
    let raw: RawExport =
        serde_json::from_str(content).map_err(|e| GmdlError::parse_error(file, e.to_string()))?;

    let mut chats = Vec::new();
    if let Some(list) = raw.chats {
        chats.extend(
            list.list
                .into_iter()
                .map(|chat| to_chat(chat.name, chat.id, chat.messages)),
        );
    }
    if let Some(id) = raw.id {
        chats.push(to_chat(raw.name, id, raw.messages));
    }
    Ok(chats)
}

/// Find `result.json` at `dir` or one level below it.
fn locate_export(dir: &Path) -> Option<PathBuf> {
    WalkDir::new(dir)
        .max_depth(2)
        .sort_by_file_name()
        .into_iter()
        .filter_map(std::result::Result::ok)
        .find(|entry| entry.file_type().is_file() && entry.file_name() == EXPORT_FILE)
        .map(walkdir::DirEntry::into_path)
}

/// Media locations must be relative and may not climb out with `..`.
fn stays_inside_export(location: &Path) -> bool {
    location
        .components()
        .all(|part| matches!(part, Component::Normal(_) | Component::CurDir))
}

/// Ascending cursor over one chat's messages.
pub struct ExportStream<'a> {
    messages: std::slice::Iter<'a, Message>,
}

impl MessageStream for ExportStream<'_> {
    async fn next_message(&mut self) -> Result<Option<Message>> {
        Ok(self.messages.next().cloned())
    }
}

/// Message source reading a chat export from disk.
#[derive(Debug)]
pub struct ExportSession {
    dir: PathBuf,
    root: Option<PathBuf>,
    chats: Vec<ExportChat>,
}

impl ExportSession {
    /// Session over the export at `dir`; nothing is read until `connect`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            root: None,
            chats: Vec::new(),
        }
    }

    fn root(&self) -> Result<&Path> {
        self.root.as_deref().ok_or(GmdlError::NotConnected)
    }

    fn chat(&self, entity: &Entity) -> Result<&ExportChat> {
        self.chats
            .iter()
            .find(|chat| chat.entity.id == entity.id)
            .ok_or_else(|| GmdlError::entity_not_found(&entity.title, None))
    }

    /// Titles of every chat in the export.
    #[must_use]
    pub fn chat_titles(&self) -> Vec<&str> {
        self.chats.iter().map(|c| c.entity.title.as_str()).collect()
    }
}

impl Session for ExportSession {
    type Stream<'a>
        = ExportStream<'a>
    where
        Self: 'a;

    async fn connect(&mut self) -> Result<()> {
        let path = locate_export(&self.dir).ok_or_else(|| GmdlError::ExportNotFound {
            path: self.dir.clone(),
        })?;
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| GmdlError::path_error("read", &path, e))?;
        self.chats = parse_export(&content, &path.display().to_string())?;
        self.root = path.parent().map(Path::to_path_buf);
        info!(
            path = %path.display(),
            chats = self.chats.len(),
            "Opened chat export"
        );
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if self.root.take().is_some() {
            debug!(path = %self.dir.display(), "Closed chat export");
        }
        self.chats.clear();
        Ok(())
    }

    async fn resolve_entity(&self, name_or_id: &str) -> Result<Entity> {
        self.root()?;
        let wanted = name_or_id.trim();
        let by_id = wanted.parse::<i64>().ok();
        if let Some(chat) = self
            .chats
            .iter()
            .find(|chat| chat.entity.title == wanted || Some(chat.entity.id) == by_id)
        {
            return Ok(chat.entity.clone());
        }
        let titles = self.chat_titles();
        let suggestion = find_closest_match(wanted, &titles, None).map(String::from);
        Err(GmdlError::entity_not_found(wanted, suggestion))
    }

    fn iter_messages<'a>(
        &'a self,
        entity: &Entity,
        offset_date: NaiveDateTime,
    ) -> Result<Self::Stream<'a>> {
        self.root()?;
        let messages = &self.chat(entity)?.messages;
        let start = messages.partition_point(|m| m.date < offset_date);
        Ok(ExportStream {
            messages: messages[start..].iter(),
        })
    }

    async fn download_media(&self, message: &Message, destination: &Path) -> Result<u64> {
        let media = message
            .media
            .as_ref()
            .ok_or_else(|| GmdlError::transport(format!("message {} has no media", message.id)))?;
        if media.location.starts_with(NOT_INCLUDED_PREFIX) {
            return Err(GmdlError::transport(format!(
                "media of message {} was not included in the export",
                message.id
            )));
        }

        let location = Path::new(&media.location);
        if !stays_inside_export(location) {
            return Err(GmdlError::transport(format!(
                "media of message {} points outside the export: {}",
                message.id, media.location
            )));
        }
        let source = self.root()?.join(location);
        let file_name = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("{}", message.id));
        let target = unique_destination(destination, &file_name);

        let bytes = tokio::fs::copy(&source, &target).await.map_err(|e| {
            GmdlError::transport(format!("copy {} failed: {e}", source.display()))
        })?;
        debug!(id = message.id, target = %target.display(), bytes, "Copied media");
        Ok(bytes)
    }
}
