//! Property-based tests for the task snapshot codec.
//!
//! Uses proptest to verify:
//! 1. Any task sequence survives encode → decode with identical tasks by id.
//! 2. Arbitrary strings never cause a panic in `decode_snapshot`.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::HashSet;

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;
use taskminder_model::codec::{decode_snapshot, encode_snapshot};
use taskminder_model::reminder::ReminderHandle;
use taskminder_model::task::{Category, ExtraFields, Priority, Task, TaskId};

/// Strategy for whole-second UTC instants between 1970 and ~2096.
fn arb_instant() -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..4_000_000_000).prop_map(|secs| Utc.timestamp_opt(secs, 0).single().expect("in range"))
}

fn arb_priority() -> impl Strategy<Value = Priority> {
    prop_oneof![Just(Priority::Low), Just(Priority::Medium), Just(Priority::High)]
}

fn arb_category() -> impl Strategy<Value = Category> {
    (0usize..Category::ALL.len()).prop_map(|i| Category::ALL[i])
}

/// Strategy for arbitrary `Task` values with unique-ish ids.
fn arb_task() -> impl Strategy<Value = Task> {
    let identity = (
        "[a-z0-9-]{1,36}",
        "[^\x00]{1,100}",
        "[^\x00]{0,200}",
        any::<bool>(),
        arb_priority(),
        arb_category(),
    );
    let timing = (
        arb_instant(),
        prop::option::of(arb_instant()),
        prop::option::of(arb_instant()),
        prop::collection::vec("[a-f0-9-]{8,36}", 0..=2),
    );
    (identity, timing).prop_map(
        |(
            (id, title, description, completed, priority, category),
            (created_at, due_date, completed_at, handles),
        )| Task {
            id: TaskId::from_string(id),
            title,
            description,
            completed,
            priority,
            category,
            created_at,
            due_date,
            completed_at,
            reminder_ids: handles.into_iter().map(ReminderHandle::from_string).collect(),
            extra: ExtraFields::new(),
        },
    )
}

proptest! {
    /// Loading right after saving yields the same set of tasks by id.
    #[test]
    fn snapshot_round_trip(tasks in prop::collection::vec(arb_task(), 0..16)) {
        let encoded = encode_snapshot(&tasks).expect("encode should succeed");
        let decoded = decode_snapshot(&encoded).expect("decode should succeed");
        prop_assert_eq!(&decoded, &tasks);

        let saved: HashSet<_> = tasks.iter().map(|t| t.id.clone()).collect();
        let loaded: HashSet<_> = decoded.iter().map(|t| t.id.clone()).collect();
        prop_assert_eq!(saved, loaded);
    }

    /// Random input never causes a panic when decoded.
    #[test]
    fn random_input_decode_no_panic(input in ".{0,512}") {
        let _ = decode_snapshot(&input);
    }
}
