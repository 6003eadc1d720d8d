//! Message log configuration.

use crate::codec::PAGE_CAPACITY;
use std::path::PathBuf;

/// Configuration for loading a message log.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the page files.
    pub root: PathBuf,

    /// Whether to create the root directory if it doesn't exist.
    pub create_if_missing: bool,

    /// Maximum number of messages kept in the recent buffer.
    pub recent_capacity: usize,

    /// Whether to `fsync` page bytes before every commit point (safer but slower).
    pub sync_on_write: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: PathBuf::from("data/messages"),
            create_if_missing: true,
            recent_capacity: usize::from(PAGE_CAPACITY),
            sync_on_write: true,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the page directory.
    #[must_use]
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Sets whether to create the root directory if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets the recent buffer capacity. Zero is treated as one.
    #[must_use]
    pub const fn recent_capacity(mut self, capacity: usize) -> Self {
        self.recent_capacity = if capacity == 0 { 1 } else { capacity };
        self
    }

    /// Sets whether to sync page bytes before each commit.
    #[must_use]
    pub const fn sync_on_write(mut self, value: bool) -> Self {
        self.sync_on_write = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert!(config.create_if_missing);
        assert!(config.sync_on_write);
        assert_eq!(config.recent_capacity, 128);
        assert_eq!(config.root, PathBuf::from("data/messages"));
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new()
            .root("/tmp/log")
            .create_if_missing(false)
            .sync_on_write(false)
            .recent_capacity(0);

        assert_eq!(config.root, PathBuf::from("/tmp/log"));
        assert!(!config.create_if_missing);
        assert!(!config.sync_on_write);
        assert_eq!(config.recent_capacity, 1);
    }
}
