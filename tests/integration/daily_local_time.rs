//! Integration test for the daily reminder across a DST change.
//!
//! Runs in its own test binary because it pins the process time zone
//! through `TZ` before anything reads the local zone.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use tokio::time::Instant;

use taskminder::clock::{ManualClock, WallClock};
use taskminder::reminders::{ChannelNotifier, DailyReminder, DailyTime};

/// Central European time: UTC+1, UTC+2 from the last Sunday of March at
/// 02:00 until the last Sunday of October at 03:00.
const CENTRAL_EUROPE: &str = "CET-1CEST,M3.5.0,M10.5.0/3";

const HOUR: Duration = Duration::from_secs(60 * 60);

#[tokio::test(start_paused = true)]
async fn morning_reminder_keeps_nine_local_across_spring_forward() {
    // SAFETY: this binary holds a single test, and the variable is set
    // before any thread reads the environment.
    unsafe { std::env::set_var("TZ", CENTRAL_EUROPE) };

    // Saturday 2026-03-28 08:00 CET; clocks go forward the next night.
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 3, 28, 7, 0, 0).unwrap(),
    ));
    let (notifier, mut delivered) = ChannelNotifier::new(8);
    let daily = DailyReminder::new(
        Arc::new(notifier),
        clock,
        WallClock::Local,
        DailyTime::default(),
    );

    let first = daily.start().unwrap();
    assert_eq!(first, Utc.with_ymd_and_hms(2026, 3, 28, 8, 0, 0).unwrap());

    let started = Instant::now();
    delivered.recv().await.unwrap();
    assert_eq!(started.elapsed(), HOUR);

    // 09:00 CEST on Sunday is 07:00 UTC, 23 hours after 09:00 CET.
    let fired = Instant::now();
    delivered.recv().await.unwrap();
    assert_eq!(fired.elapsed(), HOUR * 23);

    // Then back to a plain 24 hours.
    let fired = Instant::now();
    delivered.recv().await.unwrap();
    assert_eq!(fired.elapsed(), HOUR * 24);

    assert!(daily.stop());
}
