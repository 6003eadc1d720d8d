//! Page files.
//!
//! A page is one backend holding the header, the slot table and the strings
//! area. `PageFile` turns slot and string access into structured calls; it
//! does not decide where strings go or which page is live.

use crate::codec::{
    self, field_offset, slot_offset, Slot, SlotField, COUNT_OFFSET, FORMAT_VERSION,
    MAX_STRING_OFFSET, PAGE_CAPACITY, PAGE_HEADER_SIZE, SLOT_SIZE, STRINGS_START,
};
use crate::error::{CoreError, CoreResult};
use crate::message::MessageRecord;
use crate::types::MessageFlags;
use msglog_storage::StorageBackend;

/// One page of the message log.
pub struct PageFile {
    number: u32,
    backend: Box<dyn StorageBackend>,
}

impl PageFile {
    /// Opens a page, writing a fresh header if the backend is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing header is invalid or unsupported.
    pub fn open_or_create(number: u32, mut backend: Box<dyn StorageBackend>) -> CoreResult<Self> {
        if backend.size()? == 0 {
            backend.write_at(0, &codec::encode_header(FORMAT_VERSION, 0))?;
            backend.flush()?;
        }
        Self::open(number, backend)
    }

    /// Opens an existing page and validates its header.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnsupportedVersion`] if the page was written by
    /// another format version, or [`CoreError::InvalidFormat`] if the header
    /// is truncated or the count exceeds the page capacity.
    pub fn open(number: u32, backend: Box<dyn StorageBackend>) -> CoreResult<Self> {
        let size = backend.size()?;
        if size < PAGE_HEADER_SIZE {
            return Err(CoreError::invalid_format(format!(
                "page {number:08x} is {size} bytes, shorter than its header"
            )));
        }

        let page = Self { number, backend };
        let version = page.version()?;
        if version != FORMAT_VERSION {
            return Err(CoreError::UnsupportedVersion {
                page: number,
                found: version,
                expected: FORMAT_VERSION,
            });
        }
        page.message_count()?;

        Ok(page)
    }

    /// Returns the page number.
    #[must_use]
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Returns the format version from the header.
    pub fn version(&self) -> CoreResult<u32> {
        codec::decode_u32(&self.backend.read_at(0, 4)?)
    }

    /// Returns the number of committed messages.
    pub fn message_count(&self) -> CoreResult<u16> {
        let count = codec::decode_u32(&self.backend.read_at(COUNT_OFFSET, 4)?)?;
        match u16::try_from(count) {
            Ok(count) if count <= PAGE_CAPACITY => Ok(count),
            _ => Err(CoreError::invalid_format(format!(
                "page {:08x} claims {count} messages, capacity is {PAGE_CAPACITY}",
                self.number
            ))),
        }
    }

    /// Overwrites the committed message count.
    pub fn set_message_count(&mut self, count: u16) -> CoreResult<()> {
        self.backend
            .write_at(COUNT_OFFSET, &u32::from(count).to_be_bytes())?;
        Ok(())
    }

    /// Returns the file size in bytes.
    pub fn size(&self) -> CoreResult<u64> {
        Ok(self.backend.size()?)
    }

    /// Returns where the next appended string will land.
    pub fn strings_end(&self) -> CoreResult<u64> {
        Ok(self.backend.size()?.max(STRINGS_START))
    }

    fn check_index(&self, index: u16) -> CoreResult<()> {
        if index >= PAGE_CAPACITY {
            return Err(CoreError::not_found(self.number, index));
        }
        Ok(())
    }

    /// Reads the slot at `index`.
    pub fn read_slot(&self, index: u16) -> CoreResult<Slot> {
        self.check_index(index)?;
        let data = self.backend.read_at(slot_offset(index), SLOT_SIZE)?;
        Slot::decode(&data)
    }

    /// Writes the whole slot at `index`.
    pub fn write_slot(&mut self, index: u16, slot: &Slot) -> CoreResult<()> {
        self.check_index(index)?;
        self.backend.write_at(slot_offset(index), &slot.encode())?;
        Ok(())
    }

    /// Rewrites the content length of slot `index`.
    pub fn write_content_length(&mut self, index: u16, len: u16) -> CoreResult<()> {
        self.check_index(index)?;
        self.backend
            .write_at(field_offset(index, SlotField::ContentLength), &len.to_be_bytes())?;
        Ok(())
    }

    /// Rewrites the flags of slot `index`.
    pub fn write_flags(&mut self, index: u16, flags: MessageFlags) -> CoreResult<()> {
        self.check_index(index)?;
        self.backend
            .write_at(field_offset(index, SlotField::Flags), &flags.bits().to_be_bytes())?;
        Ok(())
    }

    /// Reads `len` string bytes at `offset`.
    pub fn read_string(&self, offset: u32, len: u16) -> CoreResult<Vec<u8>> {
        if len == 0 {
            return Ok(Vec::new());
        }
        if u64::from(offset) < STRINGS_START {
            return Err(CoreError::invalid_format(format!(
                "string offset {offset} in page {:08x} points into the slot table",
                self.number
            )));
        }
        Ok(self.backend.read_at(u64::from(offset), usize::from(len))?)
    }

    /// Appends string bytes to the strings area and returns their offset.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::FieldTooLarge`] if the page would grow past what a
    /// u32 offset can address.
    pub fn append_string(&mut self, bytes: &[u8]) -> CoreResult<u32> {
        let offset = self.strings_end()?;
        let end = offset + bytes.len() as u64;
        if end > MAX_STRING_OFFSET {
            return Err(CoreError::FieldTooLarge {
                field: "page",
                len: usize::try_from(end).unwrap_or(usize::MAX),
                max: MAX_STRING_OFFSET as usize,
            });
        }
        self.backend.write_at(offset, bytes)?;
        // Checked against MAX_STRING_OFFSET above.
        Ok(offset as u32)
    }

    /// Overwrites string bytes at `offset`.
    pub fn write_string_at(&mut self, offset: u32, bytes: &[u8]) -> CoreResult<()> {
        if u64::from(offset) < STRINGS_START {
            return Err(CoreError::invalid_format(format!(
                "refusing to write string into slot table of page {:08x}",
                self.number
            )));
        }
        self.backend.write_at(u64::from(offset), bytes)?;
        Ok(())
    }

    /// Decodes the message in slot `index`.
    ///
    /// The caller decides whether `index` is committed; this reads whatever the
    /// slot holds.
    pub fn decode(&self, index: u16) -> CoreResult<MessageRecord> {
        let slot = self.read_slot(index)?;
        self.decode_slot(&slot)
    }

    /// Decodes a message from an already-read slot.
    pub fn decode_slot(&self, slot: &Slot) -> CoreResult<MessageRecord> {
        let speaker = self.read_string(slot.speaker_offset, slot.speaker_length)?;
        let content = self.read_string(slot.content_offset, slot.content_length)?;
        codec::decode(slot, speaker, content)
    }

    /// Decodes every committed message, in slot order.
    pub fn decode_all(&self) -> CoreResult<Vec<MessageRecord>> {
        let count = self.message_count()?;
        (0..count).map(|index| self.decode(index)).collect()
    }

    /// Flushes written bytes to the OS.
    pub fn flush(&mut self) -> CoreResult<()> {
        self.backend.flush()?;
        Ok(())
    }

    /// Syncs written bytes to disk.
    pub fn sync(&mut self) -> CoreResult<()> {
        self.backend.sync()?;
        Ok(())
    }
}

impl std::fmt::Debug for PageFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageFile")
            .field("number", &self.number)
            .finish_non_exhaustive()
    }
}
