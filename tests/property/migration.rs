//! Property-based schema-migration tests.
//!
//! Uses proptest to verify:
//! 1. Migration of any stored record is idempotent — migrating the
//!    result again (at a later instant) changes nothing.
//! 2. Migration never loses a populated field.
//! 3. Any record survives a serialize → deserialize → migrate chain
//!    without panicking, including records with arbitrary field
//!    subsets missing.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;
use taskdeck_model::{Attachment, AttachmentKind, Priority, StoredRecord, migrate};

// --- Strategies for stored-record fields ---

/// Strategy for timestamps within a sane range (year 2000 to 2100).
fn arb_instant() -> impl Strategy<Value = DateTime<Utc>> {
    (946_684_800_i64..4_102_444_800_i64)
        .prop_map(|secs| Utc.timestamp_opt(secs, 0).single().unwrap_or_default())
}

fn arb_priority() -> impl Strategy<Value = Priority> {
    prop_oneof![
        Just(Priority::Low),
        Just(Priority::Medium),
        Just(Priority::High),
    ]
}

fn arb_attachment() -> impl Strategy<Value = Attachment> {
    (
        "[a-z0-9-]{1,16}",
        "[ -~]{0,64}",
        "[ -~]{0,32}",
        prop_oneof![Just(AttachmentKind::Image), Just(AttachmentKind::File)],
        proptest::option::of(any::<u64>()),
    )
        .prop_map(|(id, uri, name, kind, size)| Attachment {
            id,
            uri,
            name,
            kind,
            size,
        })
}

/// Strategy for stored records with arbitrary subsets of optional
/// fields missing, as written by any past schema version.
fn arb_record() -> impl Strategy<Value = StoredRecord> {
    (
        "[a-z0-9-]{1,32}",
        "[^\x00]{0,256}",
        any::<bool>(),
        proptest::option::of(arb_instant()),
        proptest::option::of(arb_instant()),
        proptest::option::of("[0-9]{4}-[0-9]{2}-[0-9]{2}"),
        proptest::option::of("[0-2][0-9]:[0-5][0-9]"),
        proptest::option::of(arb_priority()),
        proptest::option::of(arb_instant()),
        proptest::option::of(prop::collection::vec(arb_attachment(), 0..4)),
    )
        .prop_map(
            |(
                id,
                text,
                completed,
                created_at,
                completed_at,
                due_date,
                due_time,
                priority,
                last_modified,
                attachments,
            )| StoredRecord {
                id,
                text,
                completed,
                created_at,
                completed_at,
                due_date,
                due_time,
                priority,
                last_modified,
                attachments,
            },
        )
}

proptest! {
    #[test]
    fn migration_is_idempotent(record in arb_record(), now in arb_instant(), later in arb_instant()) {
        let once = migrate(record, now);
        let twice = migrate(StoredRecord::from(once.clone()), later);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn migration_preserves_populated_fields(record in arb_record(), now in arb_instant()) {
        let task = migrate(record.clone(), now);

        prop_assert_eq!(&task.id, &record.id);
        prop_assert_eq!(&task.text, &record.text);
        prop_assert_eq!(task.completed, record.completed);
        if let Some(created_at) = record.created_at {
            prop_assert_eq!(task.created_at, created_at);
        }
        prop_assert_eq!(task.completed_at, record.completed_at);
        prop_assert_eq!(&task.due_date, &record.due_date);
        prop_assert_eq!(&task.due_time, &record.due_time);
        if let Some(priority) = record.priority {
            prop_assert_eq!(task.priority, priority);
        }
        if let Some(attachments) = &record.attachments {
            prop_assert_eq!(&task.attachments, attachments);
        }
    }

    #[test]
    fn migration_fills_missing_fields(record in arb_record(), now in arb_instant()) {
        let bare = StoredRecord {
            created_at: None,
            completed_at: None,
            priority: None,
            last_modified: None,
            attachments: None,
            ..record
        };
        let task = migrate(bare, now);

        prop_assert_eq!(task.created_at, now);
        prop_assert_eq!(task.last_modified, now);
        prop_assert_eq!(task.completed_at, None);
        prop_assert_eq!(task.priority, Priority::Medium);
        prop_assert!(task.attachments.is_empty());
    }

    #[test]
    fn serde_round_trip_never_panics(record in arb_record(), now in arb_instant()) {
        let json = serde_json::to_string(&record).expect("record serializes");
        let parsed: StoredRecord = serde_json::from_str(&json).expect("record parses");
        prop_assert_eq!(&parsed, &record);
        let _ = migrate(parsed, now);
    }
}
