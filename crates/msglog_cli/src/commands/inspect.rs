//! Inspect command implementation.

use msglog_core::dir::{list_page_numbers, open_page_read_only};
use msglog_core::STRINGS_START;
use serde::Serialize;
use std::path::Path;

/// Directory inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Directory path.
    pub path: String,
    /// Number of page files.
    pub page_count: usize,
    /// Committed messages across all pages.
    pub message_count: usize,
    /// Soft-deleted messages across all pages.
    pub deleted_count: usize,
    /// Total size in bytes.
    pub total_size: u64,
    /// Per-page statistics.
    pub pages: Vec<PageStats>,
}

/// Statistics for a single page.
#[derive(Debug, Serialize)]
pub struct PageStats {
    /// Page number.
    pub number: u32,
    /// Committed messages.
    pub message_count: u16,
    /// Soft-deleted messages.
    pub deleted_count: usize,
    /// File size in bytes.
    pub size: u64,
    /// Bytes in the strings area, including bytes orphaned by edits and swaps.
    pub strings_size: u64,
}

/// Collects statistics for every page under `path`.
pub fn inspect(path: &Path) -> Result<InspectResult, Box<dyn std::error::Error>> {
    let mut pages = Vec::new();

    for number in list_page_numbers(path)? {
        let Some(page) = open_page_read_only(path, number)? else {
            continue;
        };
        let message_count = page.message_count()?;
        let mut deleted_count = 0;
        for index in 0..message_count {
            if page.read_slot(index)?.flags().is_deleted() {
                deleted_count += 1;
            }
        }
        let size = page.size()?;

        pages.push(PageStats {
            number,
            message_count,
            deleted_count,
            size,
            strings_size: size.saturating_sub(STRINGS_START),
        });
    }

    Ok(InspectResult {
        path: path.display().to_string(),
        page_count: pages.len(),
        message_count: pages.iter().map(|p| usize::from(p.message_count)).sum(),
        deleted_count: pages.iter().map(|p| p.deleted_count).sum(),
        total_size: pages.iter().map(|p| p.size).sum(),
        pages,
    })
}

/// Runs the inspect command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !path.is_dir() {
        return Err(format!("No message directory found at {:?}", path).into());
    }

    let result = inspect(path)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("MsgLog Inspection");
    println!("=================");
    println!();
    println!("Path: {}", result.path);
    println!();
    println!("Pages:        {}", result.page_count);
    println!("Messages:     {}", result.message_count);
    println!("Deleted:      {}", result.deleted_count);
    println!("Total size:   {}", format_size(result.total_size));

    if !result.pages.is_empty() {
        println!();
        println!("Page      Messages  Deleted  Size       Strings");
        for page in &result.pages {
            println!(
                "{:08x}  {:>8}  {:>7}  {:<9}  {}",
                page.number,
                page.message_count,
                page.deleted_count,
                format_size(page.size),
                format_size(page.strings_size)
            );
        }
    }
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use msglog_core::{Config, MessageDraft, MessageLog};
    use tempfile::tempdir;

    #[test]
    fn inspect_counts_messages_and_deletions() {
        let dir = tempdir().unwrap();
        {
            let log = MessageLog::load(Config::new().root(dir.path())).unwrap();
            for i in 0..130 {
                let mut message = log
                    .create(MessageDraft::new("Alice", format!("{i}")))
                    .unwrap();
                if i % 10 == 0 {
                    message.delete(&log).unwrap();
                }
            }
        }

        let result = inspect(dir.path()).unwrap();
        assert_eq!(result.page_count, 2);
        assert_eq!(result.message_count, 130);
        assert_eq!(result.deleted_count, 13);
        assert_eq!(result.pages[0].message_count, 128);
        assert_eq!(result.pages[1].message_count, 2);
        assert!(result.pages[1].strings_size > 0);
    }

    #[test]
    fn format_size_units() {
        assert_eq!(format_size(10), "10 B");
        assert_eq!(format_size(2048), "2.0 KB");
    }
}
