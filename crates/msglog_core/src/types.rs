//! Core type definitions for MsgLog.

use crate::error::{CoreError, CoreResult};
use serde::{Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

/// Width of message and character id tokens, in bytes.
pub const TOKEN_LEN: usize = 16;

fn parse_token(bytes: &[u8], kind: &str) -> CoreResult<[u8; TOKEN_LEN]> {
    if bytes.len() != TOKEN_LEN {
        return Err(CoreError::invalid_token(format!(
            "{kind} must be {TOKEN_LEN} bytes, got {}",
            bytes.len()
        )));
    }
    if let Some(b) = bytes.iter().find(|b| !b.is_ascii() || **b == 0) {
        return Err(CoreError::invalid_token(format!(
            "{kind} contains byte {b:#04x}, expected printable ASCII"
        )));
    }
    let mut token = [0u8; TOKEN_LEN];
    token.copy_from_slice(bytes);
    Ok(token)
}

fn token_str(token: &[u8; TOKEN_LEN]) -> &str {
    // Tokens are validated ASCII on construction.
    std::str::from_utf8(token).unwrap_or_default()
}

/// Unique identifier for a message.
///
/// A 16-byte ASCII token. Ids are supplied by the caller (or generated with
/// [`MessageId::generate`]) and stay with the message across edits, deletes
/// and swaps.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId([u8; TOKEN_LEN]);

impl MessageId {
    /// Generates a random id of 16 lowercase hex characters.
    #[must_use]
    pub fn generate() -> Self {
        let hex = Uuid::new_v4().simple().to_string();
        let mut token = [0u8; TOKEN_LEN];
        token.copy_from_slice(&hex.as_bytes()[..TOKEN_LEN]);
        Self(token)
    }

    /// Creates an id from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidToken`] unless `bytes` is exactly 16
    /// non-NUL ASCII bytes.
    pub fn from_bytes(bytes: &[u8]) -> CoreResult<Self> {
        parse_token(bytes, "message id").map(Self)
    }

    /// Creates an id from a string.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidToken`] unless `s` is 16 ASCII characters.
    pub fn parse(s: &str) -> CoreResult<Self> {
        Self::from_bytes(s.as_bytes())
    }

    /// Returns the raw bytes.
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; TOKEN_LEN] {
        &self.0
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        token_str(&self.0)
    }
}

impl fmt::Debug for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageId({})", self.as_str())
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for MessageId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Identifier of the character a message was spoken as.
///
/// Same 16-byte ASCII shape as [`MessageId`]. On disk, an absent character is
/// written as sixteen zero bytes, which is why a token may not contain NUL.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CharacterId([u8; TOKEN_LEN]);

impl CharacterId {
    /// Creates a character id from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidToken`] unless `bytes` is exactly 16
    /// non-NUL ASCII bytes.
    pub fn from_bytes(bytes: &[u8]) -> CoreResult<Self> {
        parse_token(bytes, "character id").map(Self)
    }

    /// Creates a character id from a string.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidToken`] unless `s` is 16 ASCII characters.
    pub fn parse(s: &str) -> CoreResult<Self> {
        Self::from_bytes(s.as_bytes())
    }

    /// Returns the raw bytes.
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; TOKEN_LEN] {
        &self.0
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        token_str(&self.0)
    }
}

impl fmt::Debug for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CharacterId({})", self.as_str())
    }
}

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CharacterId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Language a message is spoken in.
///
/// Stored as a raw u16 so values defined by newer campaign data round-trip
/// unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Language(pub u16);

impl Language {
    /// The common tongue, understood by everyone.
    pub const COMMON: Self = Self(0);

    /// Creates a language from its raw value.
    #[must_use]
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

/// Flags for message records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MessageFlags(u16);

impl MessageFlags {
    /// No flags set.
    pub const NONE: Self = Self(0);
    /// Message was soft-deleted.
    pub const DELETED: Self = Self(0x0001);

    /// Creates flags from the raw bitfield.
    #[must_use]
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    /// Returns the raw bitfield.
    #[must_use]
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Checks if the deleted flag is set.
    #[must_use]
    pub const fn is_deleted(self) -> bool {
        self.0 & Self::DELETED.0 != 0
    }

    /// Sets the deleted flag, keeping all other bits.
    #[must_use]
    pub const fn with_deleted(self) -> Self {
        Self(self.0 | Self::DELETED.0)
    }
}

/// Physical address of a message's header slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Position {
    /// Page number.
    pub page: u32,
    /// Slot index within the page.
    pub index: u16,
}

impl Position {
    /// Creates a position.
    #[must_use]
    pub const fn new(page: u32, index: u16) -> Self {
        Self { page, index }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}:{}", self.page, self.index)
    }
}
