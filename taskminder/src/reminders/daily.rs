//! The process-wide morning reminder.
//!
//! Independent of any task: it fires every day at a configured local time
//! (09:00 unless configured otherwise) with a fixed body and a
//! [`ReminderKind::Daily`](taskminder_model::reminder::ReminderKind::Daily)
//! payload. Task cancellation never touches it; only [`DailyReminder::stop`]
//! or dropping the [`DailyReminder`] does.
//!
//! Each fire instant is derived from local time, so the reminder keeps its
//! configured time across DST changes.

use std::sync::Arc;

use chrono::{DateTime, NaiveTime, Utc};
use parking_lot::Mutex;
use taskminder_model::reminder::{Notification, ReminderPayload};
use tokio::task::JoinHandle;

use super::notifier::Notifier;
use super::{SchedulingError, deadline_for, wait_until_due};
use crate::clock::{Clock, WallClock};

/// Body of the morning reminder.
pub const DAILY_BODY: &str = "Controlla le tue attività per oggi";

/// Local time of the morning reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyTime {
    hour: u32,
    minute: u32,
}

impl DailyTime {
    /// Returns `None` unless `hour < 24` and `minute < 60`.
    #[must_use]
    pub const fn new(hour: u32, minute: u32) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self { hour, minute })
        } else {
            None
        }
    }

    #[must_use]
    pub const fn hour(self) -> u32 {
        self.hour
    }

    #[must_use]
    pub const fn minute(self) -> u32 {
        self.minute
    }

    fn as_naive(self) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0)
    }
}

impl Default for DailyTime {
    fn default() -> Self {
        Self { hour: 9, minute: 0 }
    }
}

impl std::fmt::Display for DailyTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

struct Running {
    join: JoinHandle<()>,
    first_fire: DateTime<Utc>,
}

/// Owns the single repeating morning timer.
pub struct DailyReminder {
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    wall: WallClock,
    time: DailyTime,
    running: Mutex<Option<Running>>,
}

impl DailyReminder {
    #[must_use]
    pub fn new(
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        wall: WallClock,
        time: DailyTime,
    ) -> Self {
        Self {
            notifier,
            clock,
            wall,
            time,
            running: Mutex::new(None),
        }
    }

    /// Starts (or restarts) the morning timer and returns its first fire instant.
    ///
    /// Restarting replaces the previous timer, so there is never more than one.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulingError::PermissionDenied`] if the notifier does not
    /// allow notifications, [`SchedulingError::NoRuntime`] outside a tokio
    /// runtime, or [`SchedulingError::NoOccurrence`] if the configured local
    /// time never occurs.
    pub fn start(&self) -> Result<DateTime<Utc>, SchedulingError> {
        if !self.notifier.permission_granted() {
            return Err(SchedulingError::PermissionDenied);
        }
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| SchedulingError::NoRuntime)?;

        let no_occurrence = || SchedulingError::NoOccurrence(self.time.to_string());
        let now = self.clock.now();
        let time = self.time.as_naive().ok_or_else(no_occurrence)?;
        let first_fire = self.wall.next_occurrence(now, time).ok_or_else(no_occurrence)?;

        let notifier = Arc::clone(&self.notifier);
        let clock = Arc::clone(&self.clock);
        let wall = self.wall;
        let join = runtime.spawn(async move {
            let mut fire_at = first_fire;
            let mut deadline = deadline_for(first_fire, now);
            loop {
                wait_until_due(clock.as_ref(), fire_at, deadline).await;
                let notification = Notification::new(DAILY_BODY, ReminderPayload::daily());
                if let Err(e) = notifier.deliver(&notification) {
                    tracing::warn!(error = %e, "daily reminder delivery failed");
                }

                // A lagging wall clock must not fire the same occurrence twice.
                let from = clock.now().max(fire_at);
                let Some(next) = wall.next_occurrence(from, time) else {
                    tracing::warn!(%time, "daily reminder has no further occurrence");
                    break;
                };
                tracing::debug!(next_fire = %next, "daily reminder rescheduled");
                deadline = deadline_for(next, from);
                fire_at = next;
            }
        });

        if let Some(previous) = self.running.lock().replace(Running { join, first_fire }) {
            previous.join.abort();
        }
        tracing::info!(time = %self.time, first_fire = %first_fire, "daily reminder started");
        Ok(first_fire)
    }

    /// Stops the morning timer. Returns false if it was not running.
    pub fn stop(&self) -> bool {
        let Some(running) = self.running.lock().take() else {
            return false;
        };
        running.join.abort();
        tracing::info!("daily reminder stopped");
        true
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    /// First fire instant of the running timer, if any.
    #[must_use]
    pub fn first_fire(&self) -> Option<DateTime<Utc>> {
        self.running.lock().as_ref().map(|r| r.first_fire)
    }

    #[must_use]
    pub const fn time(&self) -> DailyTime {
        self.time
    }
}

impl Drop for DailyReminder {
    fn drop(&mut self) {
        if let Some(running) = self.running.get_mut().take() {
            running.join.abort();
        }
    }
}
