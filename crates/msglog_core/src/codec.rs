//! Page and slot codec.
//!
//! All byte-offset arithmetic for the page format lives here. The rest of the
//! engine works with [`Slot`] values and asks this module where things go.
//!
//! ## Page Layout
//!
//! ```text
//! | version (4) | message_count (4) | slot[0] (52) | ... | slot[127] (52) | strings ... |
//! ```
//!
//! ## Slot Layout
//!
//! ```text
//! | id (16) | character_id (16) | timestamp (4) | speaker_offset (4) | content_offset (4) |
//! | speaker_length (2) | content_length (2) | language (2) | flags (2) |
//! ```
//!
//! All integers are big-endian. A `character_id` whose first byte is zero means
//! the message has no character.

use crate::error::{CoreError, CoreResult};
use crate::message::MessageRecord;
use crate::types::{CharacterId, Language, MessageFlags, MessageId, TOKEN_LEN};

/// Page format version written by this engine.
pub const FORMAT_VERSION: u32 = 1;

/// Size of the page header (version + message count).
pub const PAGE_HEADER_SIZE: u64 = 8;

/// Size of one header slot.
pub const SLOT_SIZE: usize = 52;

/// Number of slots in a page.
pub const PAGE_CAPACITY: u16 = 128;

/// Offset of the strings area; the slot table is reserved in full.
pub const STRINGS_START: u64 = PAGE_HEADER_SIZE + SLOT_SIZE as u64 * PAGE_CAPACITY as u64;

/// Offset of the message count in the page header.
pub const COUNT_OFFSET: u64 = 4;

/// Largest string a slot can describe.
pub const MAX_STRING_LEN: usize = u16::MAX as usize;

/// Largest page offset a slot can point at.
pub const MAX_STRING_OFFSET: u64 = u32::MAX as u64;

const ID_AT: usize = 0;
const CHARACTER_AT: usize = 16;
const TIMESTAMP_AT: usize = 32;
const SPEAKER_OFFSET_AT: usize = 36;
const CONTENT_OFFSET_AT: usize = 40;
const SPEAKER_LENGTH_AT: usize = 44;
const CONTENT_LENGTH_AT: usize = 46;
const LANGUAGE_AT: usize = 48;
const FLAGS_AT: usize = 50;

/// Slot fields that are rewritten in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotField {
    /// Length of the content string.
    ContentLength,
    /// Flag bitfield.
    Flags,
}

impl SlotField {
    const fn position(self) -> usize {
        match self {
            Self::ContentLength => CONTENT_LENGTH_AT,
            Self::Flags => FLAGS_AT,
        }
    }
}

/// Returns the page offset of slot `index`.
#[must_use]
pub const fn slot_offset(index: u16) -> u64 {
    PAGE_HEADER_SIZE + SLOT_SIZE as u64 * index as u64
}

/// Returns the page offset of `field` within slot `index`.
#[must_use]
pub const fn field_offset(index: u16, field: SlotField) -> u64 {
    slot_offset(index) + field.position() as u64
}

/// Encodes the page header.
#[must_use]
pub fn encode_header(version: u32, message_count: u32) -> [u8; PAGE_HEADER_SIZE as usize] {
    let mut buf = [0u8; PAGE_HEADER_SIZE as usize];
    buf[0..4].copy_from_slice(&version.to_be_bytes());
    buf[4..8].copy_from_slice(&message_count.to_be_bytes());
    buf
}

/// Reads a big-endian u32 from the first four bytes of `data`.
pub fn decode_u32(data: &[u8]) -> CoreResult<u32> {
    match data {
        [a, b, c, d, ..] => Ok(u32::from_be_bytes([*a, *b, *c, *d])),
        _ => Err(CoreError::invalid_format("truncated u32 field")),
    }
}

/// Checks that a string fits a slot length field.
pub fn string_len(field: &'static str, len: usize) -> CoreResult<u16> {
    u16::try_from(len).map_err(|_| CoreError::FieldTooLarge {
        field,
        len,
        max: MAX_STRING_LEN,
    })
}

/// One fixed-width header slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    /// Message id.
    pub id: [u8; TOKEN_LEN],
    /// Character id, or all zeros when absent.
    pub character_id: [u8; TOKEN_LEN],
    /// Unix seconds.
    pub timestamp: u32,
    /// Page offset of the speaker string.
    pub speaker_offset: u32,
    /// Page offset of the content string.
    pub content_offset: u32,
    /// Speaker string length in bytes.
    pub speaker_length: u16,
    /// Content string length in bytes.
    pub content_length: u16,
    /// Raw language value.
    pub language: u16,
    /// Raw flag bits.
    pub flags: u16,
}

impl Slot {
    /// Encodes the slot to its 52-byte form.
    #[must_use]
    pub fn encode(&self) -> [u8; SLOT_SIZE] {
        let mut buf = [0u8; SLOT_SIZE];
        buf[ID_AT..CHARACTER_AT].copy_from_slice(&self.id);
        buf[CHARACTER_AT..TIMESTAMP_AT].copy_from_slice(&self.character_id);
        buf[TIMESTAMP_AT..SPEAKER_OFFSET_AT].copy_from_slice(&self.timestamp.to_be_bytes());
        buf[SPEAKER_OFFSET_AT..CONTENT_OFFSET_AT]
            .copy_from_slice(&self.speaker_offset.to_be_bytes());
        buf[CONTENT_OFFSET_AT..SPEAKER_LENGTH_AT]
            .copy_from_slice(&self.content_offset.to_be_bytes());
        buf[SPEAKER_LENGTH_AT..CONTENT_LENGTH_AT]
            .copy_from_slice(&self.speaker_length.to_be_bytes());
        buf[CONTENT_LENGTH_AT..LANGUAGE_AT].copy_from_slice(&self.content_length.to_be_bytes());
        buf[LANGUAGE_AT..FLAGS_AT].copy_from_slice(&self.language.to_be_bytes());
        buf[FLAGS_AT..SLOT_SIZE].copy_from_slice(&self.flags.to_be_bytes());
        buf
    }

    /// Decodes a slot from its 52-byte form.
    pub fn decode(data: &[u8]) -> CoreResult<Self> {
        if data.len() != SLOT_SIZE {
            return Err(CoreError::invalid_format(format!(
                "slot must be {SLOT_SIZE} bytes, got {}",
                data.len()
            )));
        }

        let u16_at = |at: usize| u16::from_be_bytes([data[at], data[at + 1]]);
        let u32_at =
            |at: usize| u32::from_be_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]]);

        let mut id = [0u8; TOKEN_LEN];
        id.copy_from_slice(&data[ID_AT..CHARACTER_AT]);
        let mut character_id = [0u8; TOKEN_LEN];
        character_id.copy_from_slice(&data[CHARACTER_AT..TIMESTAMP_AT]);

        Ok(Self {
            id,
            character_id,
            timestamp: u32_at(TIMESTAMP_AT),
            speaker_offset: u32_at(SPEAKER_OFFSET_AT),
            content_offset: u32_at(CONTENT_OFFSET_AT),
            speaker_length: u16_at(SPEAKER_LENGTH_AT),
            content_length: u16_at(CONTENT_LENGTH_AT),
            language: u16_at(LANGUAGE_AT),
            flags: u16_at(FLAGS_AT),
        })
    }

    /// Returns the slot's flags.
    #[must_use]
    pub const fn flags(&self) -> MessageFlags {
        MessageFlags::from_bits(self.flags)
    }
}

/// A record split into its slot and the strings the writer still has to place.
///
/// The slot's offsets are zero until the writer decides where the strings go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedRecord {
    /// Slot with lengths filled in and offsets unset.
    pub slot: Slot,
    /// UTF-8 speaker bytes.
    pub speaker: Vec<u8>,
    /// UTF-8 content bytes.
    pub content: Vec<u8>,
}

/// Encodes a record.
///
/// # Errors
///
/// Returns [`CoreError::FieldTooLarge`] if speaker or content exceed 65535
/// bytes.
pub fn encode(record: &MessageRecord) -> CoreResult<EncodedRecord> {
    let speaker = record.speaker.as_bytes().to_vec();
    let content = record.content.as_bytes().to_vec();

    let slot = Slot {
        id: *record.id.as_bytes(),
        character_id: record
            .character_id
            .map_or([0u8; TOKEN_LEN], |c| *c.as_bytes()),
        timestamp: record.timestamp,
        speaker_offset: 0,
        content_offset: 0,
        speaker_length: string_len("speaker", speaker.len())?,
        content_length: string_len("content", content.len())?,
        language: record.language.as_u16(),
        flags: record.flags.bits(),
    };

    Ok(EncodedRecord {
        slot,
        speaker,
        content,
    })
}

/// Decodes a record from its slot and the strings the slot points at.
///
/// # Errors
///
/// Returns [`CoreError::InvalidFormat`] if the id is not ASCII or a string is
/// not UTF-8.
pub fn decode(slot: &Slot, speaker: Vec<u8>, content: Vec<u8>) -> CoreResult<MessageRecord> {
    let id = MessageId::from_bytes(&slot.id)
        .map_err(|e| CoreError::invalid_format(format!("bad message id: {e}")))?;

    let character_id = if slot.character_id[0] == 0 {
        None
    } else {
        Some(
            CharacterId::from_bytes(&slot.character_id)
                .map_err(|e| CoreError::invalid_format(format!("bad character id: {e}")))?,
        )
    };

    let speaker = String::from_utf8(speaker)
        .map_err(|_| CoreError::invalid_format(format!("speaker of {id} is not UTF-8")))?;
    let content = String::from_utf8(content)
        .map_err(|_| CoreError::invalid_format(format!("content of {id} is not UTF-8")))?;

    Ok(MessageRecord {
        id,
        character_id,
        timestamp: slot.timestamp,
        language: Language::new(slot.language),
        flags: slot.flags(),
        speaker,
        content,
    })
}
