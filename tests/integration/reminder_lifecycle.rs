//! Integration tests for the reminder lifecycle.
//!
//! Drives the task store, scheduler and notifier together on a paused tokio
//! clock: tasks are created, edited, completed and deleted while timers are
//! checked for exactly-once delivery and leftover handles.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use tokio::sync::mpsc;

use taskminder::clock::{ManualClock, WallClock};
use taskminder::reminders::{
    ChannelNotifier, ReminderEvent, ReminderPolicy, ReminderScheduler, ReminderState,
};
use taskminder::store::{InMemorySnapshotStore, TaskStore};
use taskminder_model::reminder::{Notification, ReminderKind};
use taskminder_model::task::{TaskDraft, TaskPatch};

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 15, 7, 0, 0).unwrap()
}

struct Harness {
    store: TaskStore,
    scheduler: Arc<ReminderScheduler>,
    clock: Arc<ManualClock>,
    delivered: mpsc::Receiver<Notification>,
}

fn harness_with(granted: bool) -> Harness {
    let clock = Arc::new(ManualClock::new(start()));
    let (notifier, delivered) = ChannelNotifier::new(64);
    let scheduler = Arc::new(ReminderScheduler::new(
        Arc::new(notifier.with_permission(granted)),
        clock.clone(),
    ));
    let store = TaskStore::open(
        Arc::clone(&scheduler),
        ReminderPolicy::new(WallClock::utc()),
        clock.clone(),
        Arc::new(InMemorySnapshotStore::new()),
    );
    Harness {
        store,
        scheduler,
        clock,
        delivered,
    }
}

fn harness() -> Harness {
    harness_with(true)
}

/// Lets time run far past any reminder planned in these tests.
async fn run_out_the_clock() {
    tokio::time::sleep(Duration::from_secs(60 * 24 * 3600)).await;
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn scenario_a_no_due_date_no_reminders() {
    let mut h = harness();
    let before = h.store.stats().pending;
    let task = h.store.add(TaskDraft::new("Buy milk")).unwrap();

    assert!(task.reminder_ids.is_empty());
    assert_eq!(h.store.stats().pending, before + 1);
    assert_eq!(h.scheduler.total_live(), 0);
}

#[tokio::test(start_paused = true)]
async fn scenario_b_ten_days_out_reminds_a_week_before() {
    let mut h = harness();
    let due = start() + TimeDelta::days(10);
    let task = h.store.add(TaskDraft::new("Tax return").due(due)).unwrap();

    let pending = h.scheduler.pending(&task.id);
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].kind, ReminderKind::Upcoming);
    assert_eq!(pending[0].fire_at, due - TimeDelta::days(7));

    let before = tokio::time::Instant::now();
    let n = h.delivered.recv().await.unwrap();
    assert_eq!(
        tokio::time::Instant::now() - before,
        Duration::from_secs(3 * 24 * 3600)
    );
    assert_eq!(n.payload.task_id, Some(task.id.clone()));
    assert_eq!(n.heading, ReminderKind::Upcoming.heading());
    assert_eq!(n.body, "Tax return scade il 25/06/2026 alle 07:00");

    run_out_the_clock().await;
    assert!(h.delivered.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn scenario_c_thirty_minutes_out() {
    let mut h = harness();
    let due = start() + TimeDelta::minutes(30);
    let task = h.store.add(TaskDraft::new("Call back").due(due)).unwrap();

    let pending = h.scheduler.pending(&task.id);
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].kind, ReminderKind::DueToday);
    assert_eq!(pending[0].fire_at, start() + TimeDelta::minutes(1));
    assert_eq!(pending[1].kind, ReminderKind::Upcoming);
    assert_eq!(pending[1].fire_at, due - TimeDelta::minutes(15));

    let first = h.delivered.recv().await.unwrap();
    assert_eq!(first.payload.kind, ReminderKind::DueToday);
    assert_eq!(first.body, "Non dimenticare: \"Call back\" scade alle 07:30!");
    let second = h.delivered.recv().await.unwrap();
    assert_eq!(second.payload.kind, ReminderKind::Upcoming);
    assert_eq!(second.body, "Call back scade tra 15 minuti (07:30)");
}

#[tokio::test(start_paused = true)]
async fn scenario_d_delete_cancels_both_reminders() {
    let mut h = harness();
    let task = h
        .store
        .add(TaskDraft::new("Dentist").due(start() + TimeDelta::minutes(30)))
        .unwrap();
    let handles = task.reminder_ids.clone();
    assert_eq!(handles.len(), 2);

    assert!(h.store.delete(&task.id));
    assert_eq!(h.scheduler.live_count(&task.id), 0);
    for handle in &handles {
        assert_eq!(h.scheduler.state(handle), Some(ReminderState::Cancelled));
        assert!(!h.scheduler.fire(handle));
    }

    run_out_the_clock().await;
    assert!(h.delivered.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn scenario_e_due_change_replaces_the_whole_plan() {
    let mut h = harness();
    let task = h
        .store
        .add(TaskDraft::new("Standup").due(start() + TimeDelta::hours(2)))
        .unwrap();
    let old = task.reminder_ids.clone();
    assert!(!old.is_empty());

    let new_due = start() + TimeDelta::minutes(10);
    let updated = h
        .store
        .update(&task.id, TaskPatch::default().due(Some(new_due)))
        .unwrap();

    for handle in &old {
        assert_eq!(h.scheduler.state(handle), Some(ReminderState::Cancelled));
    }
    let expected = ReminderPolicy::new(WallClock::utc()).plan(Some(new_due), start(), "Standup");
    assert_eq!(updated.reminder_ids.len(), expected.len());
    assert_eq!(h.scheduler.live_count(&task.id), expected.len());

    let mut bodies = Vec::new();
    for _ in 0..expected.len() {
        bodies.push(h.delivered.recv().await.unwrap().body);
    }
    run_out_the_clock().await;
    assert!(h.delivered.try_recv().is_err());
    assert!(bodies.iter().all(|b| b.contains("07:10")), "{bodies:?}");
}

// ---------------------------------------------------------------------------
// Invariants
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn delete_twice_is_a_no_op() {
    let mut h = harness();
    let task = h
        .store
        .add(TaskDraft::new("Report").due(start() + TimeDelta::hours(5)))
        .unwrap();
    assert!(h.store.delete(&task.id));
    let after_first: Vec<_> = h.store.tasks().cloned().collect();
    assert!(!h.store.delete(&task.id));
    let after_second: Vec<_> = h.store.tasks().cloned().collect();
    assert_eq!(after_first, after_second);
}

#[tokio::test(start_paused = true)]
async fn repeated_due_edits_never_accumulate_timers() {
    let mut h = harness();
    let task = h.store.add(TaskDraft::new("Report")).unwrap();
    for minutes in [45, 300, 20, 2000, 90, 5] {
        let updated = h
            .store
            .update(
                &task.id,
                TaskPatch::default().due(Some(start() + TimeDelta::minutes(minutes))),
            )
            .unwrap();
        assert!(h.scheduler.live_count(&task.id) <= 2);
        assert_eq!(h.scheduler.live_count(&task.id), updated.reminder_ids.len());
    }
}

#[tokio::test(start_paused = true)]
async fn completing_a_task_silences_it() {
    let mut h = harness();
    let task = h
        .store
        .add(TaskDraft::new("Report").due(start() + TimeDelta::minutes(30)))
        .unwrap();
    h.store.toggle(&task.id).unwrap();

    run_out_the_clock().await;
    assert!(h.delivered.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn denied_permission_still_creates_tasks() {
    let mut h = harness_with(false);
    let task = h
        .store
        .add(TaskDraft::new("Report").due(start() + TimeDelta::minutes(30)))
        .unwrap();
    assert!(task.reminder_ids.is_empty());
    assert!(h.store.get(&task.id).is_some());
    assert_eq!(h.scheduler.total_live(), 0);
}

#[tokio::test(start_paused = true)]
async fn fired_reminders_are_written_back() {
    let mut h = harness();
    let mut events = h.scheduler.subscribe();
    let task = h
        .store
        .add(TaskDraft::new("Report").due(start() + TimeDelta::minutes(30)))
        .unwrap();

    h.delivered.recv().await.unwrap();
    let ReminderEvent::Fired { handle, payload } = events.recv().await.unwrap();
    assert_eq!(payload.task_id, Some(task.id.clone()));
    assert!(task.reminder_ids.contains(&handle));

    assert_eq!(h.store.prune_fired_reminders(), 1);
    let stored = h.store.get(&task.id).unwrap();
    assert_eq!(stored.reminder_ids.len(), 1);
    assert_eq!(h.scheduler.live_count(&task.id), 1);
}

#[tokio::test(start_paused = true)]
async fn reconcile_after_clock_jump_skips_past_due_tasks() {
    let mut h = harness();
    h.store
        .add(TaskDraft::new("Soon").due(start() + TimeDelta::hours(1)))
        .unwrap();
    let later = h
        .store
        .add(TaskDraft::new("Later").due(start() + TimeDelta::days(3)))
        .unwrap();

    h.clock.advance(TimeDelta::hours(2));
    let installed = h.store.reconcile();

    assert_eq!(installed, 1);
    assert_eq!(h.scheduler.total_live(), 1);
    assert_eq!(h.scheduler.live_count(&later.id), 1);
    assert_eq!(h.store.stats().overdue, 1);
}
