//! Verify command implementation.

use msglog_core::dir::{list_page_numbers, open_page_read_only, page_file_name};
use msglog_core::PageFile;
use std::path::Path;

/// Verification result.
#[derive(Debug, Default)]
pub struct VerifyResult {
    /// Pages opened.
    pub pages_checked: usize,
    /// Messages decoded.
    pub messages_checked: usize,
    /// Messages that decoded cleanly.
    pub valid_messages: usize,
    /// Problems found, one line each.
    pub errors: Vec<String>,
}

impl VerifyResult {
    /// Returns true if no problems were found.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Decodes every committed message under `path`.
pub fn verify(path: &Path) -> Result<VerifyResult, Box<dyn std::error::Error>> {
    let mut result = VerifyResult::default();

    for number in list_page_numbers(path)? {
        let page = match open_page_read_only(path, number) {
            Ok(Some(page)) => page,
            Ok(None) => continue,
            Err(e) => {
                result
                    .errors
                    .push(format!("page {}: {}", page_file_name(number), e));
                continue;
            }
        };
        result.pages_checked += 1;
        verify_page(&page, &mut result);
    }

    Ok(result)
}

fn verify_page(page: &PageFile, result: &mut VerifyResult) {
    let name = page_file_name(page.number());
    let count = match page.message_count() {
        Ok(count) => count,
        Err(e) => {
            result.errors.push(format!("page {name}: {e}"));
            return;
        }
    };

    for index in 0..count {
        result.messages_checked += 1;
        match page.decode(index) {
            Ok(_) => result.valid_messages += 1,
            Err(e) => result.errors.push(format!("page {name} slot {index}: {e}")),
        }
    }
}

/// Runs the verify command.
pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if !path.is_dir() {
        return Err(format!("No message directory found at {:?}", path).into());
    }

    println!("Verifying message log at {:?}...", path);
    println!();

    let result = verify(path)?;

    println!("Pages checked:    {}", result.pages_checked);
    println!("Messages checked: {}", result.messages_checked);
    println!("Valid messages:   {}", result.valid_messages);
    println!("Problems:         {}", result.errors.len());

    if !result.errors.is_empty() {
        println!();
        println!("Errors:");
        for error in &result.errors {
            println!("  - {}", error);
        }
    }

    println!();
    if result.is_ok() {
        println!("✓ Verification passed");
        Ok(())
    } else {
        println!("✗ Verification failed");
        Err("Verification failed".into())
    }
}
