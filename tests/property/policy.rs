//! Property-based tests for the reminder policy.
//!
//! Uses proptest to verify, for arbitrary `(due, now)` pairs:
//! 1. No planned reminder fires at or before `now`.
//! 2. A plan holds at most one reminder of each kind.
//! 3. Due instants at or before `now` yield an empty plan.
//! 4. Any due instant still ahead yields at least one reminder.
//! 5. No reminder fires after its due instant, except the one-minute fallback.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use proptest::prelude::*;
use taskminder::clock::WallClock;
use taskminder::reminders::ReminderPolicy;
use taskminder_model::reminder::ReminderKind;

/// Strategy for instants across a few years, with sub-second precision.
fn arb_now() -> impl Strategy<Value = DateTime<Utc>> {
    (1_700_000_000i64..1_900_000_000, 0u32..1_000_000_000)
        .prop_map(|(secs, nanos)| Utc.timestamp_opt(secs, nanos).single().expect("in range"))
}

/// Strategy for wall-clock zones between UTC-12 and UTC+14.
fn arb_wall() -> impl Strategy<Value = WallClock> {
    prop_oneof![
        Just(WallClock::utc()),
        (-12 * 60..=14 * 60).prop_map(|m: i32| WallClock::from_offset_minutes(m).expect("valid")),
    ]
}

proptest! {
    #[test]
    fn never_fires_in_the_past(
        now in arb_now(),
        offset_secs in -864_000i64..3_000_000,
        wall in arb_wall(),
    ) {
        let due = now + TimeDelta::seconds(offset_secs);
        let plan = ReminderPolicy::new(wall).plan(Some(due), now, "t");
        for reminder in &plan {
            prop_assert!(reminder.fire_at > now);
        }
    }

    #[test]
    fn at_most_one_of_each_kind(
        now in arb_now(),
        offset_secs in 1i64..3_000_000,
        wall in arb_wall(),
    ) {
        let due = now + TimeDelta::seconds(offset_secs);
        let plan = ReminderPolicy::new(wall).plan(Some(due), now, "t");
        prop_assert!(plan.len() <= 2);
        let upcoming = plan.iter().filter(|r| r.kind == ReminderKind::Upcoming).count();
        let due_today = plan.iter().filter(|r| r.kind == ReminderKind::DueToday).count();
        prop_assert!(upcoming <= 1);
        prop_assert!(due_today <= 1);
        prop_assert!(plan.iter().all(|r| r.kind != ReminderKind::Daily));
    }

    #[test]
    fn past_due_is_empty(now in arb_now(), back_secs in 0i64..10_000_000) {
        let due = now - TimeDelta::seconds(back_secs);
        let plan = ReminderPolicy::default().plan(Some(due), now, "t");
        prop_assert!(plan.is_empty());
    }

    #[test]
    fn anything_ahead_gets_a_reminder(
        now in arb_now(),
        ahead_millis in 1i64..60_000,
        wall in arb_wall(),
    ) {
        let due = now + TimeDelta::milliseconds(ahead_millis);
        let plan = ReminderPolicy::new(wall).plan(Some(due), now, "t");
        prop_assert!(!plan.is_empty());
        prop_assert!(plan.iter().all(|r| r.fire_at >= now));
    }

    #[test]
    fn reminders_fire_before_due_or_within_a_minute(
        now in arb_now(),
        offset_secs in 1i64..3_000_000,
        wall in arb_wall(),
    ) {
        let due = now + TimeDelta::seconds(offset_secs);
        let plan = ReminderPolicy::new(wall).plan(Some(due), now, "t");
        for reminder in &plan {
            prop_assert!(
                reminder.fire_at <= due || reminder.fire_at == now + TimeDelta::minutes(1),
                "{reminder:?} for due {due}"
            );
        }
    }
}

#[test]
fn no_due_date_is_empty() {
    let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    assert!(ReminderPolicy::default().plan(None, now, "t").is_empty());
}
