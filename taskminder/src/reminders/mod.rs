//! Reminder engine for task due dates.
//!
//! [`policy`] decides when reminders fire and what they say, [`scheduler`]
//! turns a plan into live timers tracked per task, [`notifier`] delivers the
//! fired reminders, and [`daily`] runs the process-wide morning reminder.
//! Scheduling is best-effort: a failure here is logged and never undoes the
//! task change that asked for it.

pub mod daily;
pub mod notifier;
pub mod policy;
pub mod scheduler;

pub use daily::{DailyReminder, DailyTime};
pub use notifier::{
    ChannelNotifier, ConsoleNotifier, Notifier, NotifierKind, NotifyError, NullNotifier,
    select_notifier,
};
pub use policy::{PlannedReminder, ReminderPlan, ReminderPolicy};
pub use scheduler::{ReminderEvent, ReminderScheduler, ReminderState};

use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::time::Instant;

use crate::clock::Clock;

/// Longest single sleep of a reminder timer.
pub const WAKE_SLICE: Duration = Duration::from_secs(60);

/// Reasons reminders could not be installed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchedulingError {
    /// The notifier reported that notifications are not permitted.
    #[error("notification permission denied")]
    PermissionDenied,
    /// No async runtime is available to drive the timers.
    #[error("no async runtime available for reminder timers")]
    NoRuntime,
    /// The local time does not occur in the coming days (DST gap).
    #[error("local time {0} does not occur")]
    NoOccurrence(String),
}

/// Waits until `clock` reaches `fire_at` or the runtime reaches `deadline`,
/// whichever happens first.
///
/// Sleeps at most [`WAKE_SLICE`] at a time, so a wall clock that jumped ahead
/// while the monotonic clock stood still (system suspend) is noticed within
/// one slice.
pub(crate) async fn wait_until_due(clock: &dyn Clock, fire_at: DateTime<Utc>, deadline: Instant) {
    loop {
        let now = Instant::now();
        if now >= deadline || clock.now() >= fire_at {
            return;
        }
        tokio::time::sleep((deadline - now).min(WAKE_SLICE)).await;
    }
}

/// Monotonic deadline `fire_at - now` from the runtime's current instant.
pub(crate) fn deadline_for(fire_at: DateTime<Utc>, now: DateTime<Utc>) -> Instant {
    Instant::now() + (fire_at - now).to_std().unwrap_or(Duration::ZERO)
}
