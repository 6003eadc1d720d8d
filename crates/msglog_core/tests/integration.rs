//! End-to-end tests for the message log through its public API.

use msglog_core::codec::encode_header;
use msglog_core::dir::page_file_name;
use msglog_core::{
    CharacterId, Config, CoreError, Language, Message, MessageDraft, MessageId, MessageLog,
    Position, PAGE_CAPACITY,
};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn config(root: &Path) -> Config {
    Config::new().root(root).sync_on_write(false)
}

fn chat(log: &MessageLog, count: usize) -> Vec<Message> {
    (0..count)
        .map(|i| {
            let speaker = if i % 2 == 0 { "Alice" } else { "Bob" };
            log.create(MessageDraft::new(speaker, format!("message number {i}")))
                .unwrap()
        })
        .collect()
}

#[test]
fn records_round_trip_across_restart() {
    let dir = tempdir().unwrap();
    let character = CharacterId::parse("paladin-00000007").unwrap();

    let written = {
        let log = MessageLog::load(config(dir.path())).unwrap();
        let mut messages = chat(&log, 150);
        messages.push(
            log.create(
                MessageDraft::new("Sir Reginald", "For the realm! ⚔️")
                    .id(MessageId::parse("custom-id-000001").unwrap())
                    .character(character)
                    .language(Language::new(9))
                    .timestamp(1_234_567),
            )
            .unwrap(),
        );
        messages
    };

    let log = MessageLog::load(config(dir.path())).unwrap();
    for message in &written {
        let position = message.position();
        assert_eq!(&log.get(position.page, position.index).unwrap(), message);
    }

    let last = log.get(1, 22).unwrap();
    assert_eq!(last.id().as_str(), "custom-id-000001");
    assert_eq!(last.character_id(), Some(character));
    assert_eq!(last.content(), "For the realm! ⚔️");
}

#[test]
fn recovery_resumes_at_last_index() {
    let dir = tempdir().unwrap();
    let total = usize::from(PAGE_CAPACITY) * 2 + 17;

    let written = {
        let log = MessageLog::load(config(dir.path())).unwrap();
        chat(&log, total)
    };

    let log = MessageLog::load(config(dir.path())).unwrap();
    assert_eq!(log.page_count().unwrap(), 3);
    assert_eq!(log.write_position(), Position::new(2, 17));

    let recent = log.recent();
    assert_eq!(recent.len(), usize::from(PAGE_CAPACITY));
    assert_eq!(recent.last(), written.last());
    assert_eq!(recent.first(), written.get(total - usize::from(PAGE_CAPACITY)));

    let next = log.create(MessageDraft::new("Alice", "back again")).unwrap();
    assert_eq!(next.position(), Position::new(2, 17));
    assert_eq!(log.get(2, 17).unwrap().content(), "back again");
}

#[test]
fn recovery_of_full_live_page_rolls_on_next_create() {
    let dir = tempdir().unwrap();
    {
        let log = MessageLog::load(config(dir.path())).unwrap();
        chat(&log, usize::from(PAGE_CAPACITY));
    }

    let log = MessageLog::load(config(dir.path())).unwrap();
    assert_eq!(log.write_position(), Position::new(0, PAGE_CAPACITY));

    let next = log.create(MessageDraft::new("Bob", "new page")).unwrap();
    assert_eq!(next.position(), Position::new(1, 0));
}

#[test]
fn uncounted_slot_is_ignored_after_restart() {
    let dir = tempdir().unwrap();
    {
        let log = MessageLog::load(config(dir.path())).unwrap();
        chat(&log, 3);
    }

    // Roll the count back as if the third create crashed before its commit.
    let page_path = dir.path().join(page_file_name(0));
    let mut bytes = fs::read(&page_path).unwrap();
    bytes[4..8].copy_from_slice(&2u32.to_be_bytes());
    fs::write(&page_path, bytes).unwrap();

    let log = MessageLog::load(config(dir.path())).unwrap();
    assert_eq!(log.write_position(), Position::new(0, 2));
    assert!(log.get(0, 2).unwrap_err().is_not_found());

    let replacement = log.create(MessageDraft::new("Bob", "retry")).unwrap();
    assert_eq!(replacement.position(), Position::new(0, 2));
    assert_eq!(log.get(0, 2).unwrap().content(), "retry");
}

#[test]
fn speaker_cache_survives_restart_within_page() {
    let dir = tempdir().unwrap();
    {
        let log = MessageLog::load(config(dir.path())).unwrap();
        log.create(MessageDraft::new("Alice", "one")).unwrap();
    }
    let size_before = fs::metadata(dir.path().join(page_file_name(0))).unwrap().len();

    let log = MessageLog::load(config(dir.path())).unwrap();
    log.create(MessageDraft::new("Alice", "two")).unwrap();

    let size_after = fs::metadata(dir.path().join(page_file_name(0))).unwrap().len();
    assert_eq!(size_after, size_before + 3);
}

#[test]
fn soft_delete_keeps_record_readable() {
    let dir = tempdir().unwrap();
    let log = MessageLog::load(config(dir.path())).unwrap();
    let mut message = log
        .create(MessageDraft::new("Alice", "regrettable"))
        .unwrap();
    let original = message.clone();

    message.delete(&log).unwrap();
    drop(log);

    let log = MessageLog::load(config(dir.path())).unwrap();
    let stored = log.get(0, 0).unwrap();
    assert!(stored.is_deleted());
    assert_eq!(stored.id(), original.id());
    assert_eq!(stored.content(), "regrettable");
    assert_eq!(stored.position(), original.position());

    let bytes = fs::read(dir.path().join(page_file_name(0))).unwrap();
    assert!(bytes.windows(11).any(|w| w == b"regrettable"));
}

#[test]
fn edits_are_visible_after_restart() {
    let dir = tempdir().unwrap();
    {
        let log = MessageLog::load(config(dir.path())).unwrap();
        let mut short = log.create(MessageDraft::new("Alice", "long original text")).unwrap();
        let mut long = log.create(MessageDraft::new("Bob", "tiny")).unwrap();
        short.edit(&log, "short").unwrap();
        long.edit(&log, "considerably longer replacement").unwrap();
    }

    let log = MessageLog::load(config(dir.path())).unwrap();
    assert_eq!(log.get(0, 0).unwrap().content(), "short");
    assert_eq!(log.get(0, 1).unwrap().content(), "considerably longer replacement");
}

#[test]
fn same_page_swap_twice_restores_everything() {
    let dir = tempdir().unwrap();
    let log = MessageLog::load(config(dir.path())).unwrap();
    let messages = chat(&log, 5);
    let (mut a, mut b) = (messages[1].clone(), messages[4].clone());

    a.swap(&log, &mut b).unwrap();
    assert_eq!(log.get(0, 4).unwrap().id(), messages[1].id());
    assert_eq!(log.get(0, 1).unwrap().id(), messages[4].id());

    a.swap(&log, &mut b).unwrap();
    assert_eq!(a, messages[1]);
    assert_eq!(b, messages[4]);
    assert_eq!(log.get(0, 1).unwrap(), messages[1]);
    assert_eq!(log.get(0, 4).unwrap(), messages[4]);
}

#[test]
fn cross_page_swap_twice_restores_everything() {
    let dir = tempdir().unwrap();
    let messages = {
        let log = MessageLog::load(config(dir.path())).unwrap();
        let messages = chat(&log, usize::from(PAGE_CAPACITY) * 2 + 1);
        let (mut a, mut b) = (messages[10].clone(), messages[200].clone());

        a.swap(&log, &mut b).unwrap();
        assert_eq!(a.position(), Position::new(1, 72));
        assert_eq!(log.get(1, 72).unwrap().content(), "message number 10");
        assert_eq!(log.get(0, 10).unwrap().content(), "message number 200");

        a.swap(&log, &mut b).unwrap();
        assert_eq!(a, messages[10]);
        assert_eq!(b, messages[200]);
        messages
    };

    // Both sealed pages decode the restored records from disk.
    let log = MessageLog::load(config(dir.path())).unwrap();
    assert_eq!(log.get(0, 10).unwrap(), messages[10]);
    assert_eq!(log.get(1, 72).unwrap(), messages[200]);
}

#[test]
fn read_page_lists_committed_messages() {
    let dir = tempdir().unwrap();
    let log = MessageLog::load(config(dir.path())).unwrap();
    let messages = chat(&log, usize::from(PAGE_CAPACITY) + 3);

    let sealed = log.read_page(0).unwrap();
    assert_eq!(sealed.len(), usize::from(PAGE_CAPACITY));
    assert_eq!(sealed[0], messages[0]);

    let live = log.read_page(1).unwrap();
    assert_eq!(live.as_slice(), &messages[128..]);

    assert!(log.read_page(5).unwrap_err().is_not_found());
}

#[test]
fn foreign_view_hides_content() {
    let dir = tempdir().unwrap();
    let log = MessageLog::load(config(dir.path())).unwrap();
    let message = log
        .create(MessageDraft::new("Druid", "secret grove").language(Language::new(5)))
        .unwrap();

    let view = message.foreign_view();
    assert_eq!(view.length, "secret grove".len());
    assert_eq!(view.speaker, "Druid");
    assert_eq!(view.language, Language::new(5));
    assert!(!serde_json::to_string(&view).unwrap().contains("secret"));
}

#[test]
fn second_engine_on_same_root_is_locked() {
    let dir = tempdir().unwrap();
    let _log = MessageLog::load(config(dir.path())).unwrap();

    let result = MessageLog::load(config(dir.path()));
    assert!(matches!(result, Err(CoreError::Locked)));
}

#[test]
fn unsupported_sealed_page_fails_loudly() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join(page_file_name(0)), encode_header(2, 0)).unwrap();
    fs::write(dir.path().join(page_file_name(1)), encode_header(1, 0)).unwrap();
    fs::write(dir.path().join(page_file_name(2)), encode_header(1, 0)).unwrap();

    let log = MessageLog::load(config(dir.path())).unwrap();
    assert!(matches!(
        log.get(0, 0),
        Err(CoreError::UnsupportedVersion { page: 0, found: 2, .. })
    ));
}

#[test]
fn unsupported_live_page_refuses_to_load() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join(page_file_name(0)), encode_header(7, 0)).unwrap();

    let result = MessageLog::load(config(dir.path()));
    assert!(matches!(result, Err(CoreError::UnsupportedVersion { .. })));
}

#[test]
fn missing_root_without_create_fails() {
    let dir = tempdir().unwrap();
    let result = MessageLog::load(config(&dir.path().join("absent")).create_if_missing(false));
    assert!(matches!(result, Err(CoreError::InvalidOperation { .. })));
}

#[test]
fn shared_engine_serializes_writers() {
    use std::sync::Arc;
    use std::thread;

    let dir = tempdir().unwrap();
    let log = Arc::new(MessageLog::load(config(dir.path())).unwrap());

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let log = Arc::clone(&log);
            thread::spawn(move || {
                for i in 0..50 {
                    log.create(MessageDraft::new(format!("player{t}"), format!("{i}")))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(log.write_position(), Position::new(1, 200 - 128));
    let all: Vec<Message> = log
        .read_page(0)
        .unwrap()
        .into_iter()
        .chain(log.read_page(1).unwrap())
        .collect();
    assert_eq!(all.len(), 200);
}
