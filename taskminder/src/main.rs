//! `taskminder`: reminder daemon for the personal task tracker.
//!
//! Loads the task snapshot, reconciles reminders with it, starts the daily
//! morning reminder and delivers reminders until interrupted. Configuration
//! via CLI flags, environment variables, or config file
//! (`~/.config/taskminder/config.toml`).
//!
//! ```bash
//! # Defaults: console notifier, daily reminder at 09:00 local time
//! cargo run --bin taskminder
//!
//! # Custom snapshot and a fixed zone
//! cargo run --bin taskminder -- --data-file ./tasks.json --utc-offset-minutes 60
//! ```

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use parking_lot::Mutex;
use tracing_appender::non_blocking::WorkerGuard;

use taskminder::clock::{Clock, SystemClock};
use taskminder::config::{AppConfig, CliArgs};
use taskminder::reminders::{
    DailyReminder, ReminderEvent, ReminderPolicy, ReminderScheduler, select_notifier,
};
use taskminder::store::{FileSnapshotStore, TaskStore};

#[tokio::main]
async fn main() {
    let cli = CliArgs::parse();

    let config = match AppConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    let _log_guard = init_logging(&config.log_level, config.log_file.as_deref());

    tracing::info!(
        data_file = %config.data_file.display(),
        notifier = %config.notifier,
        "taskminder starting"
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let notifier = select_notifier(config.notifier);
    if !notifier.permission_granted() {
        tracing::warn!(
            notifier = %config.notifier,
            "notifications unavailable, reminders disabled"
        );
    }

    let scheduler = Arc::new(ReminderScheduler::new(
        Arc::clone(&notifier),
        Arc::clone(&clock),
    ));
    let mut events = scheduler.subscribe();
    let store = Arc::new(Mutex::new(TaskStore::open(
        Arc::clone(&scheduler),
        ReminderPolicy::new(config.wall_clock),
        Arc::clone(&clock),
        Arc::new(FileSnapshotStore::new(config.data_file.clone())),
    )));

    let daily = config.daily.map(|time| {
        let daily = DailyReminder::new(
            Arc::clone(&notifier),
            Arc::clone(&clock),
            config.wall_clock,
            time,
        );
        if let Err(e) = daily.start() {
            tracing::warn!(error = %e, "daily reminder not started");
        }
        daily
    });

    {
        let stats = store.lock().stats();
        tracing::info!(
            total = stats.total,
            pending = stats.pending,
            overdue = stats.overdue,
            live_reminders = scheduler.total_live(),
            "taskminder ready"
        );
    }

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(ReminderEvent::Fired { handle, payload }) => {
                    let dropped = store.lock().prune_fired_reminders();
                    tracing::debug!(
                        handle = %handle,
                        kind = %payload.kind,
                        dropped,
                        "fired reminder written back"
                    );
                }
                None => break,
            },
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    tracing::error!(error = %e, "failed to listen for shutdown signal");
                }
                break;
            }
        }
    }

    if let Some(daily) = daily {
        daily.stop();
    }
    let cancelled = scheduler.cancel_all();
    tracing::info!(cancelled, "taskminder exiting");
}

/// Initialize logging.
///
/// Writes to `file_path` through a non-blocking appender when one is given,
/// otherwise to stderr. The returned guard must be held until shutdown so
/// buffered lines are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let Some((log_dir, file_name)) =
        file_path.and_then(|p| Some((p.parent()?, p.file_name()?)))
    else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(env_filter)
            .init();
        return None;
    };

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}
