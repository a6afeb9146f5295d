//! Reminder policy: decides when a task's reminders fire and what they say.
//!
//! [`ReminderPolicy::plan`] is a pure function of `(due, now, title)`. It
//! yields at most one [`ReminderKind::Upcoming`] and one
//! [`ReminderKind::DueToday`] reminder, never one that fires at or before
//! `now`.
//!
//! # Upcoming tier
//!
//! The lead time before the due instant is picked from the whole hours and
//! whole minutes left, first match wins:
//!
//! | time left            | lead time        |
//! |----------------------|------------------|
//! | more than 168 h      | 168 h            |
//! | more than 48 h       | 24 h             |
//! | more than 24 h       | 12 h             |
//! | more than 4 h        | 2 h              |
//! | more than 2 h        | 1 h              |
//! | 30 min or more       | 15 min           |
//! | more than 10 min     | 5 min            |
//! | anything positive    | fire at now + 1 min |
//!
//! # Due-today tier
//!
//! Only when 0 to 12 whole hours are left. Fires at 09:00 local on the due
//! day when that is still ahead, before the due instant, and more than two
//! hours are left; otherwise at now + 1 min.

use chrono::{DateTime, NaiveTime, TimeDelta, Utc};
use taskminder_model::reminder::ReminderKind;

use crate::clock::WallClock;

/// Hour tiers: (more than this many whole hours left, lead time in minutes).
const HOUR_TIERS: [(i64, i64); 5] = [
    (168, 168 * 60),
    (48, 24 * 60),
    (24, 12 * 60),
    (4, 2 * 60),
    (2, 60),
];

/// Largest number of whole hours left for which a due-today reminder is planned.
const DUE_TODAY_MAX_HOURS: i64 = 12;

/// Hours left at or below which the due-today reminder fires right away.
const DUE_TODAY_IMMEDIATE_HOURS: i64 = 2;

/// Local time of the due-today reminder.
const DUE_TODAY_HOUR: u32 = 9;

/// One reminder the scheduler should install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedReminder {
    /// Instant the reminder fires. Always after the `now` it was planned at.
    pub fire_at: DateTime<Utc>,
    pub kind: ReminderKind,
    /// Rendered message body.
    pub message: String,
}

/// The zero to two reminders planned for a task at a given instant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReminderPlan(Vec<PlannedReminder>);

impl ReminderPlan {
    /// A plan with no reminders.
    #[must_use]
    pub const fn empty() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the planned reminder of the given kind, if any.
    #[must_use]
    pub fn get(&self, kind: ReminderKind) -> Option<&PlannedReminder> {
        self.0.iter().find(|r| r.kind == kind)
    }

    #[must_use]
    pub fn iter(&self) -> std::slice::Iter<'_, PlannedReminder> {
        self.0.iter()
    }
}

impl IntoIterator for ReminderPlan {
    type Item = PlannedReminder;
    type IntoIter = std::vec::IntoIter<PlannedReminder>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ReminderPlan {
    type Item = &'a PlannedReminder;
    type IntoIter = std::slice::Iter<'a, PlannedReminder>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Computes reminder plans. Holds only the wall-clock zone used for the
/// 09:00 target and for the times printed in messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReminderPolicy {
    wall: WallClock,
}

impl ReminderPolicy {
    #[must_use]
    pub const fn new(wall: WallClock) -> Self {
        Self { wall }
    }

    #[must_use]
    pub const fn wall_clock(&self) -> WallClock {
        self.wall
    }

    /// Plans the reminders for a task due at `due`, as seen at `now`.
    ///
    /// Returns an empty plan when there is no due date or it is not in the
    /// future.
    #[must_use]
    pub fn plan(
        &self,
        due: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        title: &str,
    ) -> ReminderPlan {
        let Some(due) = due else {
            return ReminderPlan::empty();
        };
        if due <= now {
            return ReminderPlan::empty();
        }

        let mut plan = Vec::with_capacity(2);
        plan.extend(self.upcoming(due, now, title));
        plan.extend(self.due_today(due, now, title));
        ReminderPlan(plan)
    }

    fn upcoming(
        &self,
        due: DateTime<Utc>,
        now: DateTime<Utc>,
        title: &str,
    ) -> Option<PlannedReminder> {
        let left = due - now;
        let fire_at = match lead_time(left) {
            Some(lead) => due - lead,
            None if left > TimeDelta::zero() => now + TimeDelta::minutes(1),
            None => return None,
        };
        if fire_at <= now {
            return None;
        }
        Some(PlannedReminder {
            fire_at,
            kind: ReminderKind::Upcoming,
            message: self.upcoming_message(title, due, fire_at),
        })
    }

    fn due_today(
        &self,
        due: DateTime<Utc>,
        now: DateTime<Utc>,
        title: &str,
    ) -> Option<PlannedReminder> {
        let hours = (due - now).num_hours();
        if !(0..=DUE_TODAY_MAX_HOURS).contains(&hours) {
            return None;
        }

        let morning = NaiveTime::from_hms_opt(DUE_TODAY_HOUR, 0, 0)
            .and_then(|nine| self.wall.at_time_on_day_of(due, nine));
        let fire_at = match morning {
            Some(target)
                if now < target && target < due && hours > DUE_TODAY_IMMEDIATE_HOURS =>
            {
                target
            }
            _ => now + TimeDelta::minutes(1),
        };

        Some(PlannedReminder {
            fire_at,
            kind: ReminderKind::DueToday,
            message: format!(
                "Non dimenticare: \"{title}\" scade alle {}!",
                self.clock_time(due)
            ),
        })
    }

    /// Renders the upcoming-reminder message from the time still left when
    /// the reminder fires.
    fn upcoming_message(&self, title: &str, due: DateTime<Utc>, fire_at: DateTime<Utc>) -> String {
        let left = due - fire_at;
        let time = self.clock_time(due);
        if left <= TimeDelta::zero() {
            format!("{title} scade ORA!")
        } else if left >= TimeDelta::hours(24) {
            let date = self.wall.to_local(due).format("%d/%m/%Y");
            format!("{title} scade il {date} alle {time}")
        } else if left >= TimeDelta::hours(2) {
            format!("{title} scade oggi alle {time}")
        } else if left > TimeDelta::minutes(60) {
            format!("{title} scade tra {} ore ({time})", ceil_div(left.num_seconds(), 3600))
        } else {
            format!("{title} scade tra {} minuti ({time})", ceil_div(left.num_seconds(), 60))
        }
    }

    fn clock_time(&self, instant: DateTime<Utc>) -> String {
        self.wall.to_local(instant).format("%H:%M").to_string()
    }
}

/// Picks the lead time for an upcoming reminder, or `None` for the
/// "fire in one minute" fallback.
fn lead_time(left: TimeDelta) -> Option<TimeDelta> {
    let hours = left.num_hours();
    let minutes = left.num_minutes();
    HOUR_TIERS
        .iter()
        .find(|(more_than, _)| hours > *more_than)
        .map(|(_, lead)| TimeDelta::minutes(*lead))
        .or_else(|| match minutes {
            m if m >= 30 => Some(TimeDelta::minutes(15)),
            m if m > 10 => Some(TimeDelta::minutes(5)),
            _ => None,
        })
}

const fn ceil_div(value: i64, divisor: i64) -> i64 {
    (value + divisor - 1) / divisor
}
