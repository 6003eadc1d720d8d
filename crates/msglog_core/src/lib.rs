//! # MsgLog Core
//!
//! File-backed storage engine for chat and roll messages.
//!
//! Messages live in fixed-capacity page files under one root directory. Each
//! page holds a table of 52-byte header slots followed by an append-only
//! strings area. This crate provides:
//! - The slot codec and page file format
//! - The [`MessageLog`] engine: page rollover, speaker deduplication, a bounded
//!   buffer of recent messages, and startup recovery
//! - [`Message`] with in-place edit, soft delete and swap
//!
//! ## Example
//!
//! ```rust,no_run
//! use msglog_core::{Config, MessageDraft, MessageLog};
//!
//! let log = MessageLog::load(Config::new().root("data/messages"))?;
//! let mut message = log.create(MessageDraft::new("Alice", "I cast fireball"))?;
//! message.edit(&log, "I cast magic missile")?;
//! # Ok::<(), msglog_core::CoreError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
mod config;
pub mod dir;
mod error;
mod log;
mod message;
pub mod page;
mod types;

pub use codec::{FORMAT_VERSION, PAGE_CAPACITY, SLOT_SIZE, STRINGS_START};
pub use config::Config;
pub use dir::PageDir;
pub use error::{CoreError, CoreResult};
pub use log::MessageLog;
pub use message::{ForeignMessage, Message, MessageDraft, MessageRecord};
pub use page::PageFile;
pub use types::{CharacterId, Language, MessageFlags, MessageId, Position, TOKEN_LEN};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
