//! The task store: single owner of the task collection.
//!
//! Every mutation goes through a [`TaskStore`] method and is applied as a
//! whole before the next one starts. After each mutation the full collection
//! is written to the [`SnapshotStore`]. Reminders are kept in step with due
//! dates through the [`ReminderScheduler`]: cancel first, then plan anew.
//!
//! Scheduling and persistence failures are logged and absorbed here. Only
//! validation and not-found errors reach the caller.

pub mod persistence;
pub mod query;

pub use persistence::{FileSnapshotStore, InMemorySnapshotStore, PersistenceError, SnapshotStore};
pub use query::{SortDirection, SortKey, StatusFilter, TaskQuery, TaskStats};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use indexmap::map::Entry;
use taskminder_model::codec::{decode_snapshot, encode_snapshot};
use taskminder_model::reminder::ReminderHandle;
use taskminder_model::task::{
    ExtraFields, MAX_TASK_DESCRIPTION_LENGTH, MAX_TASK_TITLE_LENGTH, Task, TaskDraft, TaskId,
    TaskPatch, combine_due,
};
use thiserror::Error;

use crate::clock::Clock;
use crate::reminders::{ReminderPolicy, ReminderScheduler};

/// Errors returned by task store transitions.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskError {
    /// Task title is empty after trimming.
    #[error("task title cannot be empty")]
    TitleEmpty,
    /// Task title exceeds the maximum length.
    #[error("task title too long (max {MAX_TASK_TITLE_LENGTH} characters)")]
    TitleTooLong,
    /// Task description exceeds the maximum length.
    #[error("task description too long (max {MAX_TASK_DESCRIPTION_LENGTH} characters)")]
    DescriptionTooLong,
    /// The due date/time could not be turned into an instant.
    #[error("invalid due date: {0}")]
    InvalidDueDate(String),
    /// No task has the given id.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),
}

impl TaskError {
    /// Whether this error is about invalid input rather than a missing task.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        !matches!(self, Self::TaskNotFound(_))
    }
}

fn validate_title(raw: &str) -> Result<String, TaskError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(TaskError::TitleEmpty);
    }
    if title.chars().count() > MAX_TASK_TITLE_LENGTH {
        return Err(TaskError::TitleTooLong);
    }
    Ok(title.to_string())
}

fn validate_description(raw: &str) -> Result<String, TaskError> {
    let description = raw.trim();
    if description.chars().count() > MAX_TASK_DESCRIPTION_LENGTH {
        return Err(TaskError::DescriptionTooLong);
    }
    Ok(description.to_string())
}

/// Owns the task collection and keeps its reminders and snapshot in step.
pub struct TaskStore {
    tasks: IndexMap<TaskId, Task>,
    scheduler: Arc<ReminderScheduler>,
    policy: ReminderPolicy,
    clock: Arc<dyn Clock>,
    persistence: Arc<dyn SnapshotStore>,
    persistence_degraded: bool,
}

impl TaskStore {
    /// Loads the stored snapshot and reconciles reminders with it.
    ///
    /// Never fails: an unreadable or malformed snapshot is logged and
    /// replaced by an empty collection.
    pub fn open(
        scheduler: Arc<ReminderScheduler>,
        policy: ReminderPolicy,
        clock: Arc<dyn Clock>,
        persistence: Arc<dyn SnapshotStore>,
    ) -> Self {
        let mut store = Self {
            tasks: IndexMap::new(),
            scheduler,
            policy,
            clock,
            persistence,
            persistence_degraded: false,
        };
        store.load();
        store.reconcile();
        store
    }

    fn load(&mut self) {
        let snapshot = match self.persistence.load() {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                tracing::info!("no task snapshot found, starting empty");
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to load task snapshot, starting empty");
                self.persistence_degraded = true;
                return;
            }
        };

        let tasks = match decode_snapshot(&snapshot) {
            Ok(tasks) => tasks,
            Err(e) => {
                let e = PersistenceError::Decode(e);
                tracing::warn!(error = %e, "discarding malformed task snapshot");
                return;
            }
        };

        for task in tasks {
            match self.tasks.entry(task.id.clone()) {
                Entry::Occupied(_) => {
                    tracing::warn!(
                        task_id = %task.id,
                        "duplicate task id in snapshot, keeping first"
                    );
                }
                Entry::Vacant(slot) => {
                    slot.insert(task);
                }
            }
        }
        tracing::info!(count = self.tasks.len(), "task snapshot loaded");
    }

    /// Cancels every task reminder and reschedules from the current due dates.
    ///
    /// Timers do not survive a restart, so handles loaded from a snapshot are
    /// stale. Returns the number of reminders installed.
    pub fn reconcile(&mut self) -> usize {
        self.scheduler.cancel_all();
        let now = self.clock.now();
        let mut installed = 0;
        let ids: Vec<TaskId> = self.tasks.keys().cloned().collect();
        for id in ids {
            let handles = match self.tasks.get(&id) {
                Some(task) if !task.completed => self.install(task, now),
                _ => Vec::new(),
            };
            installed += handles.len();
            if let Some(task) = self.tasks.get_mut(&id) {
                task.reminder_ids = handles;
            }
        }
        tracing::info!(tasks = self.tasks.len(), reminders = installed, "reminders reconciled");
        self.persist();
        installed
    }

    /// Plans and schedules reminders for `task`. Failures degrade to no handles.
    fn install(&self, task: &Task, now: DateTime<Utc>) -> Vec<ReminderHandle> {
        let plan = self.policy.plan(task.due_date, now, &task.title);
        match self.scheduler.schedule(&task.id, plan) {
            Ok(handles) => handles,
            Err(e) => {
                tracing::warn!(task_id = %task.id, error = %e, "reminders not scheduled");
                Vec::new()
            }
        }
    }

    /// Cancels and replans the reminders of task `id`.
    fn reschedule(&mut self, id: &TaskId) {
        self.scheduler.cancel(id);
        let now = self.clock.now();
        let handles = match self.tasks.get(id) {
            Some(task) if !task.completed => self.install(task, now),
            _ => Vec::new(),
        };
        if let Some(task) = self.tasks.get_mut(id) {
            task.reminder_ids = handles;
        }
    }

    /// Creates a task from `draft`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::TitleEmpty`], [`TaskError::TitleTooLong`] or
    /// [`TaskError::DescriptionTooLong`] for invalid input. Nothing is
    /// stored in that case.
    pub fn add(&mut self, draft: TaskDraft) -> Result<Task, TaskError> {
        let title = validate_title(&draft.title)?;
        let description = validate_description(&draft.description)?;
        self.prune();

        let now = self.clock.now();
        let mut task = Task {
            id: TaskId::new(),
            title,
            description,
            completed: false,
            priority: draft.priority.unwrap_or_default(),
            category: draft.category.unwrap_or_default(),
            created_at: now,
            due_date: draft.due_date,
            completed_at: None,
            reminder_ids: Vec::new(),
            extra: ExtraFields::new(),
        };
        task.reminder_ids = self.install(&task, now);

        tracing::info!(task_id = %task.id, reminders = task.reminder_ids.len(), "task added");
        self.tasks.insert(task.id.clone(), task.clone());
        self.persist();
        Ok(task)
    }

    /// Applies `patch` to task `id`.
    ///
    /// A change to the due date or the title cancels the task's reminders
    /// and plans them again from the new values.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::TaskNotFound`] if `id` is unknown, or a
    /// validation error for an invalid title or description.
    pub fn update(&mut self, id: &TaskId, patch: TaskPatch) -> Result<Task, TaskError> {
        if !self.tasks.contains_key(id) {
            return Err(TaskError::TaskNotFound(id.clone()));
        }
        let title = patch.title.as_deref().map(validate_title).transpose()?;
        let description = patch
            .description
            .as_deref()
            .map(validate_description)
            .transpose()?;
        self.prune();

        let task = self
            .tasks
            .get_mut(id)
            .ok_or_else(|| TaskError::TaskNotFound(id.clone()))?;
        let mut replan = false;
        if let Some(title) = title
            && title != task.title
        {
            task.title = title;
            replan = true;
        }
        if let Some(description) = description {
            task.description = description;
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        if let Some(category) = patch.category {
            task.category = category;
        }
        if let Some(due) = patch.due_date
            && due != task.due_date
        {
            task.due_date = due;
            replan = true;
        }

        if replan {
            self.reschedule(id);
        }
        tracing::info!(task_id = %id, replanned = replan, "task updated");
        self.persist();
        self.get(id)
            .cloned()
            .ok_or_else(|| TaskError::TaskNotFound(id.clone()))
    }

    /// Flips the completion state of task `id`.
    ///
    /// Completing cancels the task's reminders. Reopening plans them again
    /// if the due date is still ahead.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::TaskNotFound`] if `id` is unknown.
    pub fn toggle(&mut self, id: &TaskId) -> Result<Task, TaskError> {
        self.prune();
        let now = self.clock.now();
        let task = self
            .tasks
            .get_mut(id)
            .ok_or_else(|| TaskError::TaskNotFound(id.clone()))?;
        task.completed = !task.completed;
        task.completed_at = task.completed.then_some(now);
        let completed = task.completed;

        self.reschedule(id);
        tracing::info!(task_id = %id, completed, "task toggled");
        self.persist();
        self.get(id)
            .cloned()
            .ok_or_else(|| TaskError::TaskNotFound(id.clone()))
    }

    /// Deletes task `id` after cancelling its reminders.
    ///
    /// Returns false, changing nothing, if the task does not exist.
    pub fn delete(&mut self, id: &TaskId) -> bool {
        self.prune();
        let cancelled = self.scheduler.cancel(id);
        if self.tasks.shift_remove(id).is_none() {
            return false;
        }
        tracing::info!(task_id = %id, cancelled, "task deleted");
        self.persist();
        true
    }

    /// Deletes every task and cancels every task reminder.
    ///
    /// Returns the number of tasks removed. The daily reminder is unaffected.
    pub fn clear_all(&mut self) -> usize {
        let cancelled = self.scheduler.cancel_all();
        let removed = self.tasks.len();
        self.tasks.clear();
        tracing::info!(removed, cancelled, "all tasks cleared");
        self.persist();
        removed
    }

    /// Drops handles of reminders that have already fired and saves the
    /// result if anything changed. Returns the number of handles dropped.
    pub fn prune_fired_reminders(&mut self) -> usize {
        let dropped = self.prune();
        if dropped > 0 {
            self.persist();
        }
        dropped
    }

    fn prune(&mut self) -> usize {
        let scheduler = Arc::clone(&self.scheduler);
        let mut dropped = 0;
        for task in self.tasks.values_mut() {
            let before = task.reminder_ids.len();
            task.reminder_ids.retain(|h| scheduler.is_live(h));
            dropped += before - task.reminder_ids.len();
        }
        dropped
    }

    /// Turns a `YYYY-MM-DD` date and optional `HH:MM` time into a due
    /// instant in the store's wall-clock zone.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::InvalidDueDate`] for malformed input or a local
    /// time that does not exist.
    pub fn due_from_parts(
        &self,
        date: &str,
        time: Option<&str>,
    ) -> Result<DateTime<Utc>, TaskError> {
        let local =
            combine_due(date, time).map_err(|e| TaskError::InvalidDueDate(e.to_string()))?;
        self.policy
            .wall_clock()
            .to_instant(local)
            .ok_or_else(|| TaskError::InvalidDueDate(format!("{local} does not exist locally")))
    }

    #[must_use]
    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.get(id)
    }

    /// All tasks in insertion order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Filters and sorts the collection.
    #[must_use]
    pub fn query(&self, query: &TaskQuery) -> Vec<&Task> {
        query.apply(self.tasks.values())
    }

    /// Statistics recomputed from the current collection.
    #[must_use]
    pub fn stats(&self) -> TaskStats {
        TaskStats::compute(self.tasks.values(), self.clock.now())
    }

    /// Whether the most recent snapshot load or save failed.
    #[must_use]
    pub const fn is_persistence_degraded(&self) -> bool {
        self.persistence_degraded
    }

    #[must_use]
    pub fn scheduler(&self) -> &Arc<ReminderScheduler> {
        &self.scheduler
    }

    fn persist(&mut self) {
        let tasks: Vec<Task> = self.tasks.values().cloned().collect();
        let result = encode_snapshot(&tasks)
            .map_err(PersistenceError::Encode)
            .and_then(|snapshot| self.persistence.save(&snapshot));
        match result {
            Ok(()) => self.persistence_degraded = false,
            Err(e) => {
                tracing::warn!(error = %e, "failed to save task snapshot");
                self.persistence_degraded = true;
            }
        }
    }
}
