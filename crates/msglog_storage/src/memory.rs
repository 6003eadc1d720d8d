//! Volatile backend holding a page in a `Vec<u8>`.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;

/// A backend kept entirely in memory.
///
/// Page-format tests run against it instead of touching the file system.
///
/// ```rust
/// use msglog_storage::{StorageBackend, InMemoryBackend};
///
/// let mut page = InMemoryBackend::new();
/// page.write_at(0, &1u32.to_be_bytes()).unwrap();
/// page.write_at(4, b"Alice").unwrap();
/// assert_eq!(page.size().unwrap(), 9);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    data: RwLock<Vec<u8>>,
}

impl InMemoryBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend preloaded with `data`, such as a hand-built page.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }

    /// Returns a copy of the stored bytes.
    #[must_use]
    pub fn data(&self) -> Vec<u8> {
        self.data.read().clone()
    }
}

impl StorageBackend for InMemoryBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let data = self.data.read();
        let size = data.len() as u64;
        let offset_usize = offset as usize;
        let end = offset_usize.saturating_add(len);

        if offset > size || end > data.len() {
            return Err(StorageError::ReadPastEnd { offset, len, size });
        }

        Ok(data[offset_usize..end].to_vec())
    }

    fn write_at(&mut self, offset: u64, new_data: &[u8]) -> StorageResult<()> {
        if new_data.is_empty() {
            return Ok(());
        }

        let mut data = self.data.write();
        let start = offset as usize;
        let end = start + new_data.len();
        if data.len() < end {
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(new_data);
        Ok(())
    }

    fn flush(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.data.read().len() as u64)
    }

    fn sync(&mut self) -> StorageResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn starts_empty() {
        let backend = InMemoryBackend::new();
        assert_eq!(backend.size().unwrap(), 0);
        assert!(backend.data().is_empty());
    }

    #[test]
    fn write_at_end_extends_preloaded_data() {
        let mut backend = InMemoryBackend::with_data(vec![0; 8]);
        backend.write_at(8, b"Bob").unwrap();
        backend.write_at(11, b"hey").unwrap();
        assert_eq!(backend.size().unwrap(), 14);
        assert_eq!(backend.read_at(8, 6).unwrap(), b"Bobhey");
    }

    #[test]
    fn read_straddling_end_fails() {
        let backend = InMemoryBackend::with_data(b"hello".to_vec());
        assert!(matches!(
            backend.read_at(3, 10),
            Err(StorageError::ReadPastEnd { size: 5, .. })
        ));
    }

    #[test]
    fn write_at_patches_in_place() {
        let mut backend = InMemoryBackend::with_data(b"count=0000".to_vec());
        backend.write_at(6, b"0042").unwrap();
        assert_eq!(backend.data(), b"count=0042");
    }

    #[test]
    fn write_at_past_end_grows_with_zeros() {
        let mut backend = InMemoryBackend::new();
        backend.write_at(4, b"xy").unwrap();
        assert_eq!(backend.data(), b"\0\0\0\0xy");
    }

    #[test]
    fn empty_write_changes_nothing() {
        let mut backend = InMemoryBackend::new();
        backend.write_at(100, b"").unwrap();
        assert_eq!(backend.size().unwrap(), 0);
    }

    proptest! {
        #[test]
        fn written_bytes_read_back(
            offset in 0u64..512,
            bytes in prop::collection::vec(any::<u8>(), 1..64),
        ) {
            let mut backend = InMemoryBackend::new();
            backend.write_at(offset, &bytes).unwrap();
            prop_assert_eq!(backend.read_at(offset, bytes.len()).unwrap(), bytes);
        }
    }
}
