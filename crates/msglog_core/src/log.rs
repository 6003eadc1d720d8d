//! The message log engine.
//!
//! `MessageLog` is the only writer of page files. It owns the live page, the
//! write cursor, the recent-message buffer and the speaker cache of the live
//! page. Everything mutable sits behind one mutex, so a file mutation and the
//! matching buffer update always happen together.
//!
//! ## Page Lifecycle
//!
//! ```text
//! EMPTY -> OPEN (header written) -> ... -> FULL (count == 128) -> SEALED
//! ```
//!
//! A page is sealed once the engine rolls past it. Sealed pages are read through
//! transient handles and only rewritten by explicit edit/delete/swap calls.
//!
//! ## Commit Point
//!
//! `create` writes the strings, then the slot, flushes, and only then advances
//! `message_count`. Readers trust `message_count`, so an interrupted create
//! leaves at most an uncounted slot that the next create overwrites.

use crate::codec::{self, EncodedRecord, Slot, PAGE_CAPACITY};
use crate::config::Config;
use crate::dir::PageDir;
use crate::error::{CoreError, CoreResult};
use crate::message::{Message, MessageDraft};
use crate::page::PageFile;
use crate::types::{MessageId, Position};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use tracing::{debug, info, warn};

type SpeakerCache = HashMap<String, u32>;

struct WriterState {
    page: PageFile,
    index: u16,
    recent: VecDeque<Message>,
    speaker_cache: SpeakerCache,
}

impl WriterState {
    fn push_recent(&mut self, message: Message, capacity: usize) {
        self.recent.push_back(message);
        while self.recent.len() > capacity {
            self.recent.pop_front();
        }
    }

    fn refresh_recent(&mut self, message: &Message) {
        if let Some(cached) = self.recent.iter_mut().find(|m| m.id() == message.id()) {
            *cached = message.clone();
        }
    }
}

/// The paged message store.
///
/// Construct one per root directory with [`MessageLog::load`] and share it
/// (for example as `Arc<MessageLog>`). All operations take `&self`.
pub struct MessageLog {
    dir: PageDir,
    recent_capacity: usize,
    sync_on_write: bool,
    state: Mutex<WriterState>,
}

impl MessageLog {
    /// Opens the message log, replaying the pages left by a previous run.
    ///
    /// The page before the last is decoded into the recent buffer, the last
    /// page becomes the live page and writing continues after its last
    /// committed message. An empty directory starts at page 0.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Locked`] if another engine owns the directory, a
    /// format error if a replayed page cannot be decoded, or an I/O error.
    pub fn load(config: Config) -> CoreResult<Self> {
        let dir = PageDir::open(&config.root, config.create_if_missing)?;
        let pages = dir.list_pages()?;
        let mut recent = VecDeque::new();

        if let [.., previous, _] = pages.as_slice() {
            if let Some(page) = dir.open_page_read_only(*previous)? {
                for index in 0..page.message_count()? {
                    let record = page.decode(index)?;
                    recent.push_back(Message::new(record, Position::new(*previous, index)));
                }
            }
        }

        let live = pages.last().copied().unwrap_or(0);
        let page = dir.create_page(live)?;
        let index = page.message_count()?;

        // Speakers already written to the live page stay shareable.
        let mut speaker_cache = SpeakerCache::new();
        for i in 0..index {
            let slot = page.read_slot(i)?;
            let record = page.decode_slot(&slot)?;
            speaker_cache
                .entry(record.speaker.clone())
                .or_insert(slot.speaker_offset);
            recent.push_back(Message::new(record, Position::new(live, i)));
        }

        while recent.len() > config.recent_capacity {
            recent.pop_front();
        }

        info!(
            root = %dir.path().display(),
            pages = pages.len(),
            page = live,
            index,
            recent = recent.len(),
            "message log loaded"
        );

        Ok(Self {
            dir,
            recent_capacity: config.recent_capacity.max(1),
            sync_on_write: config.sync_on_write,
            state: Mutex::new(WriterState {
                page,
                index,
                recent,
                speaker_cache,
            }),
        })
    }

    /// Appends a new message to the live page.
    ///
    /// Rolls over to a new page first if the live page is full. The call either
    /// commits the message (its page's `message_count` covers it) or fails.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::FieldTooLarge`] for strings over 65535 bytes, or
    /// an I/O error. A failed rollover leaves the write cursor unchanged.
    pub fn create(&self, draft: MessageDraft) -> CoreResult<Message> {
        let record = draft.into_record();
        let encoded = codec::encode(&record)?;

        let mut state = self.state.lock();
        while state.index >= PAGE_CAPACITY {
            self.roll_over(&mut state)?;
        }

        let position = Position::new(state.page.number(), state.index);
        let WriterState {
            page,
            speaker_cache,
            ..
        } = &mut *state;

        let written = place_record(
            page,
            position.index,
            encoded,
            &record.speaker,
            Some(speaker_cache),
        )
        .and_then(|()| self.commit(page, position.index + 1));
        if let Err(err) = written {
            warn!(%position, error = %err, "message create failed before commit");
            return Err(err);
        }

        state.index += 1;
        let message = Message::new(record, position);
        state.push_recent(message.clone(), self.recent_capacity);
        Ok(message)
    }

    /// Looks up the message at `(page, index)`.
    ///
    /// Recent messages are served from memory; older ones are decoded from
    /// their page.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if no committed message is there.
    pub fn get(&self, page: u32, index: u16) -> CoreResult<Message> {
        let position = Position::new(page, index);
        let state = self.state.lock();

        if let Some(message) = state.recent.iter().find(|m| m.position() == position) {
            return Ok(message.clone());
        }

        let live = state.page.number();
        if page == live {
            if index < state.index {
                return Ok(Message::new(state.page.decode(index)?, position));
            }
        } else if page < live && index < PAGE_CAPACITY {
            let sealed = self.dir.open_page_read_only(page).inspect_err(|err| {
                if err.is_format_error() {
                    warn!(page, error = %err, "sealed page is unreadable");
                }
            })?;
            if let Some(sealed) = sealed {
                if index < sealed.message_count()? {
                    return Ok(Message::new(sealed.decode(index)?, position));
                }
            }
        }

        Err(CoreError::not_found(page, index))
    }

    /// Returns the recent buffer, oldest first.
    pub fn recent(&self) -> Vec<Message> {
        self.state.lock().recent.iter().cloned().collect()
    }

    /// Decodes every committed message of one page.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if the page does not exist.
    pub fn read_page(&self, page: u32) -> CoreResult<Vec<Message>> {
        let state = self.state.lock();

        let decode = |file: &PageFile, count: u16| -> CoreResult<Vec<Message>> {
            (0..count)
                .map(|index| Ok(Message::new(file.decode(index)?, Position::new(page, index))))
                .collect()
        };

        if page == state.page.number() {
            return decode(&state.page, state.index);
        }
        match self.dir.open_page_read_only(page)? {
            Some(file) => decode(&file, file.message_count()?),
            None => Err(CoreError::not_found(page, 0)),
        }
    }

    /// Returns where the next message will be written.
    ///
    /// The index equals [`PAGE_CAPACITY`] when the live page is full and the
    /// next create will roll over.
    pub fn write_position(&self) -> Position {
        let state = self.state.lock();
        Position::new(state.page.number(), state.index)
    }

    /// Returns the number of page files in the root directory.
    pub fn page_count(&self) -> CoreResult<usize> {
        Ok(self.dir.list_pages()?.len())
    }

    pub(crate) fn edit_message(&self, message: &mut Message, content: String) -> CoreResult<()> {
        let new_len = codec::string_len("content", content.len())?;
        let position = message.position();
        let id = message.id();

        let mut state = self.state.lock();
        self.with_page(&mut state, position.page, |page, committed, _| {
            let slot = owned_slot(page, committed, position, id)?;
            if new_len <= slot.content_length {
                page.write_string_at(slot.content_offset, content.as_bytes())?;
                if new_len != slot.content_length {
                    page.write_content_length(position.index, new_len)?;
                }
            } else {
                let offset = page.append_string(content.as_bytes())?;
                let moved = Slot {
                    content_offset: offset,
                    content_length: new_len,
                    ..slot
                };
                page.write_slot(position.index, &moved)?;
                debug!(%position, from = slot.content_offset, to = offset, "edit relocated content");
            }
            Ok(())
        })?;

        message.record.content = content;
        state.refresh_recent(message);
        Ok(())
    }

    pub(crate) fn delete_message(&self, message: &mut Message) -> CoreResult<()> {
        let position = message.position();
        let id = message.id();

        let mut state = self.state.lock();
        let flags = self.with_page(&mut state, position.page, |page, committed, _| {
            let slot = owned_slot(page, committed, position, id)?;
            let flags = slot.flags().with_deleted();
            page.write_flags(position.index, flags)?;
            Ok(flags)
        })?;

        message.record.flags = flags;
        state.refresh_recent(message);
        Ok(())
    }

    pub(crate) fn swap_messages(&self, a: &mut Message, b: &mut Message) -> CoreResult<()> {
        if a.id() == b.id() {
            return Ok(());
        }
        let (pos_a, pos_b) = (a.position(), b.position());
        let (id_a, id_b) = (a.id(), b.id());

        let mut state = self.state.lock();
        if pos_a.page == pos_b.page {
            // Offsets travel with the slot, so strings stay where they are.
            self.with_page(&mut state, pos_a.page, |page, committed, _| {
                let slot_a = owned_slot(page, committed, pos_a, id_a)?;
                let slot_b = owned_slot(page, committed, pos_b, id_b)?;
                page.write_slot(pos_a.index, &slot_b)?;
                page.write_slot(pos_b.index, &slot_a)
            })?;
        } else {
            let record_a = self.with_page(&mut state, pos_a.page, |page, committed, _| {
                page.decode_slot(&owned_slot(page, committed, pos_a, id_a)?)
            })?;
            let record_b = self.with_page(&mut state, pos_b.page, |page, committed, _| {
                page.decode_slot(&owned_slot(page, committed, pos_b, id_b)?)
            })?;
            let encoded_a = codec::encode(&record_a)?;
            let encoded_b = codec::encode(&record_b)?;

            // Each record is rewritten in full into the other's page; the bytes
            // it leaves behind are not reclaimed.
            self.with_page(&mut state, pos_b.page, |page, _, cache| {
                place_record(page, pos_b.index, encoded_a, &record_a.speaker, cache)
            })?;
            self.with_page(&mut state, pos_a.page, |page, _, cache| {
                place_record(page, pos_a.index, encoded_b, &record_b.speaker, cache)
            })?;
            debug!(a = %pos_a, b = %pos_b, "swapped messages across pages");

            a.record = record_a;
            b.record = record_b;
        }

        a.position = pos_b;
        b.position = pos_a;
        state.refresh_recent(a);
        state.refresh_recent(b);
        Ok(())
    }

    /// Runs `f` against page `number`, through the live handle when it is the
    /// live page and a transient handle otherwise.
    ///
    /// `f` receives the page's committed count and, for the live page only, the
    /// speaker cache. Written bytes are flushed before returning.
    fn with_page<R>(
        &self,
        state: &mut WriterState,
        number: u32,
        f: impl FnOnce(&mut PageFile, u16, Option<&mut SpeakerCache>) -> CoreResult<R>,
    ) -> CoreResult<R> {
        if number == state.page.number() {
            let committed = state.index;
            let result = f(&mut state.page, committed, Some(&mut state.speaker_cache))?;
            self.finish_writes(&mut state.page)?;
            return Ok(result);
        }

        let mut page = self
            .dir
            .open_page(number)?
            .ok_or_else(|| CoreError::not_found(number, 0))?;
        let committed = page.message_count()?;
        let result = f(&mut page, committed, None)?;
        self.finish_writes(&mut page)?;
        Ok(result)
    }

    fn finish_writes(&self, page: &mut PageFile) -> CoreResult<()> {
        page.flush()?;
        if self.sync_on_write {
            page.sync()?;
        }
        Ok(())
    }

    fn commit(&self, page: &mut PageFile, count: u16) -> CoreResult<()> {
        self.finish_writes(page)?;
        page.set_message_count(count)?;
        self.finish_writes(page)
    }

    fn roll_over(&self, state: &mut WriterState) -> CoreResult<()> {
        let sealed = state.page.number();
        let next = sealed
            .checked_add(1)
            .ok_or_else(|| CoreError::invalid_operation("page numbers exhausted"))?;

        let page = self.dir.create_page(next)?;
        state.page.flush()?;

        state.index = page.message_count()?;
        state.page = page;
        state.speaker_cache.clear();

        info!(sealed, page = next, "rolled over to new message page");
        Ok(())
    }
}

/// Reads the slot at `position`, checking it is committed and still holds `id`.
fn owned_slot(page: &PageFile, committed: u16, position: Position, id: MessageId) -> CoreResult<Slot> {
    if position.index >= committed {
        return Err(CoreError::not_found(position.page, position.index));
    }
    let slot = page.read_slot(position.index)?;
    if slot.id != *id.as_bytes() {
        return Err(CoreError::invalid_operation(format!(
            "message {id} is no longer at {position}"
        )));
    }
    Ok(slot)
}

/// Writes a record's strings and slot into `page` at `index`.
///
/// With a speaker cache, a speaker already written to this page is reused.
/// Content is always appended fresh. Strings land before the slot so the slot
/// never points at unwritten bytes.
fn place_record(
    page: &mut PageFile,
    index: u16,
    encoded: EncodedRecord,
    speaker: &str,
    speaker_cache: Option<&mut SpeakerCache>,
) -> CoreResult<()> {
    let EncodedRecord {
        mut slot,
        speaker: speaker_bytes,
        content,
    } = encoded;

    slot.speaker_offset = match speaker_cache {
        Some(cache) => match cache.get(speaker) {
            Some(&offset) => {
                debug!(speaker, offset, "speaker cache hit");
                offset
            }
            None => {
                let offset = page.append_string(&speaker_bytes)?;
                debug!(speaker, offset, "speaker cache miss");
                cache.insert(speaker.to_owned(), offset);
                offset
            }
        },
        None => page.append_string(&speaker_bytes)?,
    };
    slot.content_offset = page.append_string(&content)?;

    page.write_slot(index, &slot)
}

impl std::fmt::Debug for MessageLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MessageLog")
            .field("root", &self.dir.path())
            .field("page", &state.page.number())
            .field("index", &state.index)
            .field("recent", &state.recent.len())
            .finish_non_exhaustive()
    }
}
