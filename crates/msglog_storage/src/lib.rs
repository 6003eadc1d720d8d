//! # MsgLog Storage
//!
//! Storage backend trait and implementations for MsgLog.
//!
//! Backends are **opaque byte stores**: they know nothing about page headers,
//! slot tables or string areas. `msglog_core` owns all format interpretation.
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For testing and ephemeral storage
//! - [`FileBackend`] - For persistent storage using OS file APIs
//!
//! ## Example
//!
//! ```rust
//! use msglog_storage::{StorageBackend, InMemoryBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! backend.write_at(0, b"hello world").unwrap();
//! backend.write_at(6, b"there").unwrap();
//! assert_eq!(backend.read_at(0, 11).unwrap(), b"hello there");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
