//! Time sources.
//!
//! [`Clock`] is the only way the policy, scheduler and store learn the
//! current instant, so tests can drive them with a [`ManualClock`].
//! [`WallClock`] maps instants to the local wall-clock time used for the
//! 09:00 targets and for rendering reminder messages.

use chrono::{
    DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeDelta, TimeZone,
    Utc,
};
use parking_lot::Mutex;

/// Supplies the current instant.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Moves the clock to `instant`, forwards or backwards.
    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.lock() = instant;
    }

    /// Moves the clock forward by `delta`.
    pub fn advance(&self, delta: TimeDelta) {
        let mut now = self.now.lock();
        *now += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// The zone used to interpret wall-clock times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WallClock {
    /// The operating system's local zone.
    #[default]
    Local,
    /// A fixed offset from UTC.
    Fixed(FixedOffset),
}

impl WallClock {
    /// UTC as a fixed zone. Handy for deterministic tests.
    #[must_use]
    pub fn utc() -> Self {
        Self::Fixed(Utc.fix())
    }

    /// Builds a fixed zone `minutes` east of UTC, if the offset is valid.
    #[must_use]
    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        FixedOffset::east_opt(minutes.checked_mul(60)?).map(Self::Fixed)
    }

    /// Converts an instant to local wall-clock time.
    #[must_use]
    pub fn to_local(self, instant: DateTime<Utc>) -> NaiveDateTime {
        match self {
            Self::Local => instant.with_timezone(&Local).naive_local(),
            Self::Fixed(offset) => instant.with_timezone(&offset).naive_local(),
        }
    }

    /// Converts a local wall-clock time back to an instant.
    ///
    /// Ambiguous times resolve to the earliest instant; times that do not
    /// exist (DST gaps) yield `None`.
    #[must_use]
    pub fn to_instant(self, local: NaiveDateTime) -> Option<DateTime<Utc>> {
        match self {
            Self::Local => Local
                .from_local_datetime(&local)
                .earliest()
                .map(|t| t.with_timezone(&Utc)),
            Self::Fixed(offset) => offset
                .from_local_datetime(&local)
                .earliest()
                .map(|t| t.with_timezone(&Utc)),
        }
    }

    /// Returns the instant at `time` on the local calendar day of `instant`.
    #[must_use]
    pub fn at_time_on_day_of(
        self,
        instant: DateTime<Utc>,
        time: NaiveTime,
    ) -> Option<DateTime<Utc>> {
        self.to_instant(self.to_local(instant).date().and_time(time))
    }

    /// Returns the first instant strictly after `after` whose local time is `time`.
    ///
    /// Days where `time` falls in a DST gap are skipped.
    #[must_use]
    pub fn next_occurrence(self, after: DateTime<Utc>, time: NaiveTime) -> Option<DateTime<Utc>> {
        let mut day: NaiveDate = self.to_local(after).date();
        for _ in 0..3 {
            if let Some(candidate) = self.to_instant(day.and_time(time))
                && candidate > after
            {
                return Some(candidate);
            }
            day = day.succ_opt()?;
        }
        None
    }
}
