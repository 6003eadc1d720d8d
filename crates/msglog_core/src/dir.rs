//! Page directory management.
//!
//! All pages live directly under one root directory:
//!
//! ```text
//! <root>/
//! ├─ LOCK       # Advisory lock for the single writer
//! ├─ 00000000   # Page 0
//! ├─ 00000001   # Page 1
//! └─ ...
//! ```
//!
//! Page file names are the page number as eight lowercase hex digits, so a
//! lexical sort is also a numeric sort.

use crate::error::{CoreError, CoreResult};
use crate::page::PageFile;
use fs2::FileExt;
use msglog_storage::FileBackend;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

const LOCK_FILE: &str = "LOCK";
const PAGE_NAME_LEN: usize = 8;

/// Returns the file name for page `number`.
#[must_use]
pub fn page_file_name(number: u32) -> String {
    format!("{number:08x}")
}

/// Parses a page file name back into its number.
///
/// Only exact eight-digit lowercase hex names are pages.
#[must_use]
pub fn parse_page_file_name(name: &str) -> Option<u32> {
    let is_page = name.len() == PAGE_NAME_LEN
        && name
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
    if is_page {
        u32::from_str_radix(name, 16).ok()
    } else {
        None
    }
}

/// Lists page numbers under `root` in ascending order.
///
/// Entries that are not page files are skipped.
pub fn list_page_numbers(root: &Path) -> CoreResult<Vec<u32>> {
    let mut pages = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        match name.to_str().and_then(parse_page_file_name) {
            Some(number) => pages.push(number),
            None => debug!(entry = ?name, "skipping non-page entry"),
        }
    }
    pages.sort_unstable();
    Ok(pages)
}

/// Opens an existing page for reading only.
///
/// Returns `None` if the page file does not exist.
pub fn open_page_read_only(root: &Path, number: u32) -> CoreResult<Option<PageFile>> {
    let path = root.join(page_file_name(number));
    if !path.is_file() {
        return Ok(None);
    }
    let backend = FileBackend::open_read_only(&path)?;
    PageFile::open(number, Box::new(backend)).map(Some)
}

/// The root directory of a message log, held under an exclusive lock.
///
/// Only one `PageDir` can exist per directory at a time, across processes.
#[derive(Debug)]
pub struct PageDir {
    path: PathBuf,
    _lock_file: File,
}

impl PageDir {
    /// Opens or creates the page directory and takes its lock.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory doesn't exist and `create_if_missing` is false
    /// - Another process holds the lock (returns `Locked`)
    /// - I/O errors occur
    pub fn open(path: &Path, create_if_missing: bool) -> CoreResult<Self> {
        if !path.exists() {
            if create_if_missing {
                fs::create_dir_all(path)?;
            } else {
                return Err(CoreError::invalid_operation(format!(
                    "message directory does not exist: {}",
                    path.display()
                )));
            }
        }

        if !path.is_dir() {
            return Err(CoreError::invalid_operation(format!(
                "path is not a directory: {}",
                path.display()
            )));
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(CoreError::Locked);
        }

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    /// Returns the root directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the path of page `number`.
    #[must_use]
    pub fn page_path(&self, number: u32) -> PathBuf {
        self.path.join(page_file_name(number))
    }

    /// Lists page numbers in ascending order.
    pub fn list_pages(&self) -> CoreResult<Vec<u32>> {
        list_page_numbers(&self.path)
    }

    /// Creates page `number` with a fresh header, or opens it if it already
    /// has one.
    ///
    /// The directory is synced so the new file survives a crash.
    pub fn create_page(&self, number: u32) -> CoreResult<PageFile> {
        let backend = FileBackend::open(&self.page_path(number))?;
        let page = PageFile::open_or_create(number, Box::new(backend))?;
        self.sync_directory()?;
        Ok(page)
    }

    /// Opens an existing page for writing.
    ///
    /// Returns `None` if the page file does not exist.
    pub fn open_page(&self, number: u32) -> CoreResult<Option<PageFile>> {
        let path = self.page_path(number);
        if !path.is_file() {
            return Ok(None);
        }
        let backend = FileBackend::open(&path)?;
        PageFile::open(number, Box::new(backend)).map(Some)
    }

    /// Opens an existing page for reading only.
    pub fn open_page_read_only(&self, number: u32) -> CoreResult<Option<PageFile>> {
        open_page_read_only(&self.path, number)
    }

    #[cfg(unix)]
    fn sync_directory(&self) -> CoreResult<()> {
        File::open(&self.path)?.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_directory(&self) -> CoreResult<()> {
        // NTFS journals metadata; directory handles cannot be fsynced.
        Ok(())
    }
}
