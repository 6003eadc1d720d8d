//! Error types for MsgLog core.

use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in MsgLog core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] msglog_storage::StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Page was written by an unsupported format version.
    #[error("page {page:08x} has unsupported version {found} (expected {expected})")]
    UnsupportedVersion {
        /// Page number.
        page: u32,
        /// Version found in the page header.
        found: u32,
        /// Version this engine understands.
        expected: u32,
    },

    /// Page bytes do not describe a valid record.
    #[error("invalid page format: {message}")]
    InvalidFormat {
        /// Description of the format issue.
        message: String,
    },

    /// No message at the given position.
    #[error("no message found at page {page:08x} index {index}")]
    NotFound {
        /// Page number searched.
        page: u32,
        /// Slot index searched.
        index: u16,
    },

    /// A field does not fit the on-disk width.
    #[error("{field} is {len} bytes, maximum is {max}")]
    FieldTooLarge {
        /// Name of the field.
        field: &'static str,
        /// Actual size.
        len: usize,
        /// Largest encodable size.
        max: usize,
    },

    /// Message or character id is not a 16-byte ASCII token.
    #[error("invalid token: {message}")]
    InvalidToken {
        /// Description of the problem.
        message: String,
    },

    /// Operation not permitted in current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why operation is invalid.
        message: String,
    },

    /// Another engine holds the root directory lock.
    #[error("message log locked: another process has exclusive access")]
    Locked,
}

impl CoreError {
    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Creates an invalid token error.
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(page: u32, index: u16) -> Self {
        Self::NotFound { page, index }
    }

    /// Returns true for [`CoreError::NotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true for errors that mean the page bytes cannot be trusted.
    #[must_use]
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedVersion { .. } | Self::InvalidFormat { .. }
        )
    }
}
