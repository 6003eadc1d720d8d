//! Messages as seen by callers.

use crate::error::CoreResult;
use crate::log::MessageLog;
use crate::types::{CharacterId, Language, MessageFlags, MessageId, Position};
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

/// The stored fields of one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageRecord {
    /// Stable message id.
    pub id: MessageId,
    /// Character the message was spoken as, if any.
    pub character_id: Option<CharacterId>,
    /// Unix seconds.
    pub timestamp: u32,
    /// Language the message is spoken in.
    pub language: Language,
    /// Flag bits.
    #[serde(skip)]
    pub flags: MessageFlags,
    /// Display name of the speaker.
    pub speaker: String,
    /// Message body.
    pub content: String,
}

/// Input to [`MessageLog::create`].
///
/// Id and timestamp default to a fresh random id and the current time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDraft {
    id: Option<MessageId>,
    character_id: Option<CharacterId>,
    timestamp: Option<u32>,
    language: Language,
    speaker: String,
    content: String,
}

impl MessageDraft {
    /// Creates a draft in the common language with no character.
    pub fn new(speaker: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: None,
            character_id: None,
            timestamp: None,
            language: Language::COMMON,
            speaker: speaker.into(),
            content: content.into(),
        }
    }

    /// Uses a caller-supplied id.
    #[must_use]
    pub fn id(mut self, id: MessageId) -> Self {
        self.id = Some(id);
        self
    }

    /// Attributes the message to a character.
    #[must_use]
    pub fn character(mut self, character_id: CharacterId) -> Self {
        self.character_id = Some(character_id);
        self
    }

    /// Sets an explicit timestamp in unix seconds.
    #[must_use]
    pub fn timestamp(mut self, timestamp: u32) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Sets the language.
    #[must_use]
    pub fn language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub(crate) fn into_record(self) -> MessageRecord {
        MessageRecord {
            id: self.id.unwrap_or_else(MessageId::generate),
            character_id: self.character_id,
            timestamp: self.timestamp.unwrap_or_else(unix_now),
            language: self.language,
            flags: MessageFlags::NONE,
            speaker: self.speaker,
            content: self.content,
        }
    }
}

fn unix_now() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u32::try_from(d.as_secs()).unwrap_or(u32::MAX))
}

/// A message and where it lives.
///
/// Mutations write through the [`MessageLog`] that owns the message's page and
/// update this value to match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    #[serde(flatten)]
    pub(crate) record: MessageRecord,
    #[serde(flatten)]
    pub(crate) position: Position,
}

impl Message {
    pub(crate) fn new(record: MessageRecord, position: Position) -> Self {
        Self { record, position }
    }

    /// Returns the message id.
    #[must_use]
    pub fn id(&self) -> MessageId {
        self.record.id
    }

    /// Returns the character id, if any.
    #[must_use]
    pub fn character_id(&self) -> Option<CharacterId> {
        self.record.character_id
    }

    /// Returns the timestamp in unix seconds.
    #[must_use]
    pub fn timestamp(&self) -> u32 {
        self.record.timestamp
    }

    /// Returns the language.
    #[must_use]
    pub fn language(&self) -> Language {
        self.record.language
    }

    /// Returns the flag bits.
    #[must_use]
    pub fn flags(&self) -> MessageFlags {
        self.record.flags
    }

    /// Returns the speaker name.
    #[must_use]
    pub fn speaker(&self) -> &str {
        &self.record.speaker
    }

    /// Returns the content.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.record.content
    }

    /// Returns the page and slot the message occupies.
    #[must_use]
    pub fn position(&self) -> Position {
        self.position
    }

    /// Returns the stored record.
    #[must_use]
    pub fn record(&self) -> &MessageRecord {
        &self.record
    }

    /// Returns whether the message was soft-deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.record.flags.is_deleted()
    }

    /// Returns the redacted view for readers who may not see the content.
    #[must_use]
    pub fn foreign_view(&self) -> ForeignMessage {
        ForeignMessage {
            id: self.record.id,
            character_id: self.record.character_id,
            timestamp: self.record.timestamp,
            language: self.record.language,
            speaker: self.record.speaker.clone(),
            page: self.position.page,
            index: self.position.index,
            length: self.record.content.chars().count(),
        }
    }

    /// Replaces the content.
    ///
    /// Content that fits in the old bytes is overwritten in place; longer
    /// content is appended to the page and the slot repointed. The old bytes
    /// are not reclaimed.
    ///
    /// # Errors
    ///
    /// Returns an error if the content is too large, the message is no longer
    /// at its recorded position, or the page cannot be written.
    pub fn edit(&mut self, log: &MessageLog, content: impl Into<String>) -> CoreResult<()> {
        log.edit_message(self, content.into())
    }

    /// Marks the message deleted. Its bytes stay on disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the message is no longer at its recorded position
    /// or the page cannot be written.
    pub fn delete(&mut self, log: &MessageLog) -> CoreResult<()> {
        log.delete_message(self)
    }

    /// Exchanges positions with `other`.
    ///
    /// # Errors
    ///
    /// Returns an error if either message is no longer at its recorded
    /// position or a page cannot be written.
    pub fn swap(&mut self, log: &MessageLog, other: &mut Message) -> CoreResult<()> {
        log.swap_messages(self, other)
    }
}

/// A message with its content withheld.
///
/// Carries every field except the content, plus the content length in
/// characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForeignMessage {
    /// Message id.
    pub id: MessageId,
    /// Character id, if any.
    pub character_id: Option<CharacterId>,
    /// Unix seconds.
    pub timestamp: u32,
    /// Language.
    pub language: Language,
    /// Speaker name.
    pub speaker: String,
    /// Page number.
    pub page: u32,
    /// Slot index.
    pub index: u16,
    /// Content length in characters.
    pub length: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(content: &str) -> Message {
        let record = MessageDraft::new("Bard", content)
            .id(MessageId::parse("aaaaaaaaaaaaaaaa").unwrap())
            .timestamp(42)
            .language(Language::new(2))
            .into_record();
        Message::new(record, Position::new(3, 9))
    }

    #[test]
    fn draft_defaults() {
        let record = MessageDraft::new("Alice", "hi").into_record();
        assert_eq!(record.language, Language::COMMON);
        assert_eq!(record.character_id, None);
        assert_eq!(record.flags, MessageFlags::NONE);
        assert!(record.timestamp > 0);
    }

    #[test]
    fn foreign_view_withholds_content() {
        let msg = message("the password is swordfish");
        let view = msg.foreign_view();

        assert_eq!(view.length, 25);
        assert_eq!(view.page, 3);
        assert_eq!(view.index, 9);
        assert_eq!(view.speaker, "Bard");

        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("swordfish"));
        assert!(!json.contains("content"));
    }

    #[test]
    fn foreign_view_counts_characters() {
        assert_eq!(message("héllo").foreign_view().length, 5);
    }

    #[test]
    fn message_serializes_flat() {
        let json = serde_json::to_value(message("hello")).unwrap();
        assert_eq!(json["id"], "aaaaaaaaaaaaaaaa");
        assert_eq!(json["content"], "hello");
        assert_eq!(json["page"], 3);
        assert_eq!(json["index"], 9);
        assert_eq!(json["language"], 2);
        assert!(json["character_id"].is_null());
        assert!(json.get("flags").is_none());
    }
}
