//! Dump command implementation.

use msglog_core::dir::{open_page_read_only, page_file_name};
use msglog_core::MessageRecord;
use serde::Serialize;
use std::path::Path;

/// One dumped slot.
#[derive(Debug, Serialize)]
pub struct DumpEntry {
    /// Slot index.
    pub index: u16,
    /// Message id.
    pub id: String,
    /// Character id, if any.
    pub character_id: Option<String>,
    /// Unix seconds.
    pub timestamp: u32,
    /// Language code.
    pub language: u16,
    /// Whether the message is soft-deleted, absent when redacted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted: Option<bool>,
    /// Speaker name.
    pub speaker: String,
    /// Content, absent when redacted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Content length in characters.
    pub length: usize,
}

impl DumpEntry {
    fn new(index: u16, record: MessageRecord, redact: bool) -> Self {
        let length = record.content.chars().count();
        Self {
            index,
            id: record.id.as_str().to_string(),
            character_id: record.character_id.map(|c| c.as_str().to_string()),
            timestamp: record.timestamp,
            language: record.language.as_u16(),
            deleted: (!redact).then_some(record.flags.is_deleted()),
            speaker: record.speaker,
            content: (!redact).then_some(record.content),
            length,
        }
    }
}

/// Decodes every committed message on page `number`.
pub fn dump(
    path: &Path,
    number: u32,
    redact: bool,
) -> Result<Vec<DumpEntry>, Box<dyn std::error::Error>> {
    let page = open_page_read_only(path, number)?
        .ok_or_else(|| format!("Page {} not found", page_file_name(number)))?;

    let entries = page
        .decode_all()?
        .into_iter()
        .zip(0u16..)
        .map(|(record, index)| DumpEntry::new(index, record, redact))
        .collect();
    Ok(entries)
}

/// Runs the dump command.
pub fn run(
    path: &Path,
    number: u32,
    format: &str,
    redact: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if !path.is_dir() {
        return Err(format!("No message directory found at {:?}", path).into());
    }

    let entries = dump(path, number, redact)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        _ => {
            print_text_output(number, &entries);
        }
    }

    Ok(())
}

fn print_text_output(number: u32, entries: &[DumpEntry]) {
    println!("Page {} ({} messages)", page_file_name(number), entries.len());
    println!();

    for entry in entries {
        let marker = if entry.deleted == Some(true) {
            " [deleted]"
        } else {
            ""
        };
        println!(
            "[{:>3}] {} t={} lang={}{}",
            entry.index, entry.id, entry.timestamp, entry.language, marker
        );
        match &entry.content {
            Some(content) => println!("      {}: {}", entry.speaker, content),
            None => println!("      {}: <{} chars>", entry.speaker, entry.length),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use msglog_core::{Config, MessageDraft, MessageLog};
    use tempfile::tempdir;

    #[test]
    fn dump_lists_committed_messages() {
        let dir = tempdir().unwrap();
        {
            let log = MessageLog::load(Config::new().root(dir.path())).unwrap();
            log.create(MessageDraft::new("Alice", "hello")).unwrap();
            let mut second = log.create(MessageDraft::new("Bob", "oops")).unwrap();
            second.delete(&log).unwrap();
        }

        let entries = dump(dir.path(), 0, false).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].speaker, "Alice");
        assert_eq!(entries[0].content.as_deref(), Some("hello"));
        assert_eq!(entries[0].deleted, Some(false));
        assert_eq!(entries[1].index, 1);
        assert_eq!(entries[1].deleted, Some(true));
    }

    #[test]
    fn redacted_dump_matches_foreign_view() {
        let dir = tempdir().unwrap();
        let foreign = {
            let log = MessageLog::load(Config::new().root(dir.path())).unwrap();
            let mut message = log.create(MessageDraft::new("Druid", "héllo grove")).unwrap();
            message.delete(&log).unwrap();
            message.foreign_view()
        };

        let entries = dump(dir.path(), 0, true).unwrap();
        assert!(entries[0].content.is_none());
        assert!(entries[0].deleted.is_none());
        assert_eq!(entries[0].length, foreign.length);
        assert_eq!(entries[0].length, 11);
        assert_eq!(entries[0].id, foreign.id.as_str());
        assert_eq!(entries[0].speaker, foreign.speaker);

        let json = serde_json::to_string(&entries).unwrap();
        assert!(!json.contains("grove"));
        assert!(!json.contains("deleted"));
    }

    #[test]
    fn missing_page_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(dump(dir.path(), 4, false).is_err());
    }
}
