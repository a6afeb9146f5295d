//! Live reminder timers, indexed by task.
//!
//! [`ReminderScheduler`] installs one tokio timer per planned reminder and
//! keeps every live timer in a single index guarded by one lock. Scheduling,
//! cancelling and firing all take that lock, so a timer can never fire after
//! its cancellation has been recorded, and a new timer is never registered
//! while an old one for the same task is half-cancelled.
//!
//! Each handle moves `Scheduled → Fired` or `Scheduled → Cancelled`, once.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use taskminder_model::reminder::{Notification, ReminderHandle, ReminderKind, ReminderPayload};
use taskminder_model::task::TaskId;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::notifier::Notifier;
use super::{SchedulingError, deadline_for, wait_until_due};
use super::policy::ReminderPlan;
use crate::clock::Clock;

/// Number of settled (fired or cancelled) handles remembered for [`ReminderScheduler::state`].
const DEFAULT_SETTLED_LIMIT: usize = 1024;

/// Lifecycle state of one reminder handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderState {
    /// Waiting for its fire instant.
    Scheduled,
    /// Delivered to the notifier.
    Fired,
    /// Cancelled before it fired.
    Cancelled,
}

/// Published when a task reminder fires, so its owner can drop the handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderEvent {
    Fired {
        handle: ReminderHandle,
        payload: ReminderPayload,
    },
}

/// A live timer as seen from outside the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledReminder {
    pub handle: ReminderHandle,
    pub task_id: TaskId,
    pub kind: ReminderKind,
    pub fire_at: DateTime<Utc>,
    pub message: String,
}

struct LiveTimer {
    task_id: TaskId,
    kind: ReminderKind,
    fire_at: DateTime<Utc>,
    message: String,
    timer: Option<JoinHandle<()>>,
}

#[derive(Default)]
struct TimerIndex {
    live: HashMap<ReminderHandle, LiveTimer>,
    by_task: HashMap<TaskId, Vec<ReminderHandle>>,
    settled: HashMap<ReminderHandle, ReminderState>,
    settled_order: VecDeque<ReminderHandle>,
}

impl TimerIndex {
    /// Removes a live timer and records how it ended.
    fn take(&mut self, handle: &ReminderHandle, outcome: ReminderState) -> Option<LiveTimer> {
        let timer = self.live.remove(handle)?;
        if let Some(handles) = self.by_task.get_mut(&timer.task_id) {
            handles.retain(|h| h != handle);
            if handles.is_empty() {
                self.by_task.remove(&timer.task_id);
            }
        }
        self.settle(handle.clone(), outcome);
        Some(timer)
    }

    fn settle(&mut self, handle: ReminderHandle, outcome: ReminderState) {
        self.settled.insert(handle.clone(), outcome);
        self.settled_order.push_back(handle);
        while self.settled_order.len() > DEFAULT_SETTLED_LIMIT {
            if let Some(old) = self.settled_order.pop_front() {
                self.settled.remove(&old);
            }
        }
    }
}

/// State shared between the scheduler and its timer tasks.
struct Shared {
    notifier: Arc<dyn Notifier>,
    index: Mutex<TimerIndex>,
    events: Mutex<Option<mpsc::UnboundedSender<ReminderEvent>>>,
}

impl Shared {
    /// Fires `handle` if it is still live. Returns false for a no-op.
    fn fire(&self, handle: &ReminderHandle) -> bool {
        let Some(timer) = self.index.lock().take(handle, ReminderState::Fired) else {
            return false;
        };
        self.deliver(handle, timer);
        true
    }

    fn deliver(&self, handle: &ReminderHandle, timer: LiveTimer) {
        let payload = ReminderPayload::for_task(timer.task_id, timer.kind);
        let notification = Notification::new(timer.message, payload.clone());
        match self.notifier.deliver(&notification) {
            Ok(()) => tracing::debug!(handle = %handle, kind = %timer.kind, "reminder delivered"),
            Err(e) => tracing::warn!(
                handle = %handle,
                kind = %timer.kind,
                error = %e,
                "reminder delivery failed"
            ),
        }
        if let Some(tx) = self.events.lock().as_ref() {
            // Receiver gone means nobody is tracking write-backs anymore.
            let _ = tx.send(ReminderEvent::Fired {
                handle: handle.clone(),
                payload,
            });
        }
    }
}

/// Maps reminder plans onto live timers and tracks them by task id.
pub struct ReminderScheduler {
    shared: Arc<Shared>,
    clock: Arc<dyn Clock>,
    permission: OnceLock<bool>,
}

impl ReminderScheduler {
    /// Creates a scheduler delivering through `notifier`, timing with `clock`.
    #[must_use]
    pub fn new(notifier: Arc<dyn Notifier>, clock: Arc<dyn Clock>) -> Self {
        Self {
            shared: Arc::new(Shared {
                notifier,
                index: Mutex::new(TimerIndex::default()),
                events: Mutex::new(None),
            }),
            clock,
            permission: OnceLock::new(),
        }
    }

    /// Returns a receiver for [`ReminderEvent`]s. A later call replaces the
    /// previous subscriber.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<ReminderEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.shared.events.lock() = Some(tx);
        rx
    }

    /// Whether the notifier allows scheduling. Asked once, then cached.
    pub fn permission_granted(&self) -> bool {
        *self
            .permission
            .get_or_init(|| self.shared.notifier.permission_granted())
    }

    /// Installs a timer for every entry of `plan` and returns their handles.
    ///
    /// A timer fires once its instant is reached on the wall clock or its
    /// delay has elapsed on the runtime clock, whichever comes first.
    ///
    /// A live reminder of the same kind for the same task is cancelled
    /// first, so a task never has two of one kind. Callers changing a due
    /// date should still [`cancel`](Self::cancel) before planning anew.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulingError::PermissionDenied`] if the notifier does not
    /// allow notifications, or [`SchedulingError::NoRuntime`] if called
    /// outside a tokio runtime. Nothing is installed in either case.
    pub fn schedule(
        &self,
        task_id: &TaskId,
        plan: ReminderPlan,
    ) -> Result<Vec<ReminderHandle>, SchedulingError> {
        if plan.is_empty() {
            return Ok(Vec::new());
        }
        if !self.permission_granted() {
            return Err(SchedulingError::PermissionDenied);
        }
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| SchedulingError::NoRuntime)?;

        let now = self.clock.now();
        let mut index = self.shared.index.lock();
        let mut handles = Vec::with_capacity(plan.len());

        for reminder in plan {
            let same_kind: Vec<ReminderHandle> = index
                .by_task
                .get(task_id)
                .into_iter()
                .flatten()
                .filter(|h| index.live.get(*h).is_some_and(|t| t.kind == reminder.kind))
                .cloned()
                .collect();
            for old in same_kind {
                if let Some(mut timer) = index.take(&old, ReminderState::Cancelled)
                    && let Some(join) = timer.timer.take()
                {
                    join.abort();
                }
            }

            let handle = ReminderHandle::new();
            let fire_at = reminder.fire_at;
            let deadline = deadline_for(fire_at, now);
            let shared = Arc::clone(&self.shared);
            let clock = Arc::clone(&self.clock);
            let timer_handle = handle.clone();
            let join = runtime.spawn(async move {
                wait_until_due(clock.as_ref(), fire_at, deadline).await;
                shared.fire(&timer_handle);
            });

            tracing::debug!(
                task_id = %task_id,
                handle = %handle,
                kind = %reminder.kind,
                fire_at = %reminder.fire_at,
                "reminder scheduled"
            );
            index.live.insert(
                handle.clone(),
                LiveTimer {
                    task_id: task_id.clone(),
                    kind: reminder.kind,
                    fire_at: reminder.fire_at,
                    message: reminder.message,
                    timer: Some(join),
                },
            );
            index
                .by_task
                .entry(task_id.clone())
                .or_default()
                .push(handle.clone());
            handles.push(handle);
        }
        drop(index);

        Ok(handles)
    }

    /// Cancels every live reminder of `task_id`. Returns how many were cancelled.
    ///
    /// Calling this for a task with no live reminders is a no-op. A reminder
    /// whose notifier call is already running is not interrupted.
    pub fn cancel(&self, task_id: &TaskId) -> usize {
        let mut index = self.shared.index.lock();
        let handles = index.by_task.get(task_id).cloned().unwrap_or_default();
        let mut cancelled = 0;
        for handle in &handles {
            if let Some(mut timer) = index.take(handle, ReminderState::Cancelled) {
                if let Some(join) = timer.timer.take() {
                    join.abort();
                }
                cancelled += 1;
            }
        }
        drop(index);

        if cancelled > 0 {
            tracing::debug!(task_id = %task_id, cancelled, "reminders cancelled");
        }
        cancelled
    }

    /// Cancels every live task reminder. Returns how many were cancelled.
    pub fn cancel_all(&self) -> usize {
        let mut index = self.shared.index.lock();
        let handles: Vec<ReminderHandle> = index.live.keys().cloned().collect();
        for handle in &handles {
            if let Some(mut timer) = index.take(handle, ReminderState::Cancelled)
                && let Some(join) = timer.timer.take()
            {
                join.abort();
            }
        }
        drop(index);

        tracing::debug!(cancelled = handles.len(), "all task reminders cancelled");
        handles.len()
    }

    /// Fires a live reminder right away, as if its timer had elapsed.
    ///
    /// Returns false, without delivering anything, if the handle already
    /// fired or was cancelled.
    pub fn fire(&self, handle: &ReminderHandle) -> bool {
        let Some(mut timer) = self.shared.index.lock().take(handle, ReminderState::Fired) else {
            return false;
        };
        if let Some(join) = timer.timer.take() {
            join.abort();
        }
        self.shared.deliver(handle, timer);
        true
    }

    /// Returns the state of `handle`, if it is live or settled recently.
    #[must_use]
    pub fn state(&self, handle: &ReminderHandle) -> Option<ReminderState> {
        let index = self.shared.index.lock();
        if index.live.contains_key(handle) {
            return Some(ReminderState::Scheduled);
        }
        index.settled.get(handle).copied()
    }

    #[must_use]
    pub fn is_live(&self, handle: &ReminderHandle) -> bool {
        self.shared.index.lock().live.contains_key(handle)
    }

    /// Number of live reminders for `task_id`.
    #[must_use]
    pub fn live_count(&self, task_id: &TaskId) -> usize {
        self.shared
            .index
            .lock()
            .by_task
            .get(task_id)
            .map_or(0, Vec::len)
    }

    /// Number of live reminders across all tasks.
    #[must_use]
    pub fn total_live(&self) -> usize {
        self.shared.index.lock().live.len()
    }

    /// Lists the live reminders of `task_id`, earliest first.
    #[must_use]
    pub fn pending(&self, task_id: &TaskId) -> Vec<ScheduledReminder> {
        let index = self.shared.index.lock();
        let mut pending: Vec<ScheduledReminder> = index
            .by_task
            .get(task_id)
            .into_iter()
            .flatten()
            .filter_map(|h| {
                index.live.get(h).map(|t| ScheduledReminder {
                    handle: h.clone(),
                    task_id: t.task_id.clone(),
                    kind: t.kind,
                    fire_at: t.fire_at,
                    message: t.message.clone(),
                })
            })
            .collect();
        drop(index);
        pending.sort_by_key(|r| r.fire_at);
        pending
    }
}
