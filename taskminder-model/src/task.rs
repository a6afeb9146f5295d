//! Task entity and the inputs that create or change it.
//!
//! A [`Task`] is owned by the task store. Reminder code only refers to it by
//! [`TaskId`]. Field names serialize in camelCase so snapshots stay readable
//! by older front-ends that wrote the same JSON layout.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::reminder::ReminderHandle;

/// Maximum allowed task title length in characters.
pub const MAX_TASK_TITLE_LENGTH: usize = 100;

/// Maximum allowed task description length in characters.
pub const MAX_TASK_DESCRIPTION_LENGTH: usize = 500;

/// Snapshot fields this model does not know, kept as read.
pub type ExtraFields = serde_json::Map<String, serde_json::Value>;

/// Opaque task identifier.
///
/// New identifiers are UUID v7 strings, so they sort by creation time and
/// cannot collide within a process. Identifiers read back from a snapshot are
/// kept verbatim whatever their shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Creates a new time-ordered task identifier (UUID v7).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Wraps an existing identifier string.
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Task priority. Unknown values read from a snapshot become [`Priority::Medium`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Priority {
    /// Can wait.
    Low,
    /// The default.
    #[default]
    Medium,
    /// Counted separately in statistics while pending.
    High,
}

impl Priority {
    /// Returns the lowercase tag used in snapshots.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl From<String> for Priority {
    fn from(value: String) -> Self {
        match value.as_str() {
            "low" => Self::Low,
            "high" => Self::High,
            _ => Self::Medium,
        }
    }
}

impl From<Priority> for String {
    fn from(value: Priority) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task category. Unknown values read from a snapshot become [`Category::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Work,
    Personal,
    Health,
    Shopping,
    Study,
    Family,
    #[default]
    Other,
}

impl Category {
    /// Every category, in display order.
    pub const ALL: [Self; 7] = [
        Self::Work,
        Self::Personal,
        Self::Health,
        Self::Shopping,
        Self::Study,
        Self::Family,
        Self::Other,
    ];

    /// Returns the lowercase tag used in snapshots.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Work => "work",
            Self::Personal => "personal",
            Self::Health => "health",
            Self::Shopping => "shopping",
            Self::Study => "study",
            Self::Family => "family",
            Self::Other => "other",
        }
    }

    /// Returns the human-readable (Italian) label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Work => "Lavoro",
            Self::Personal => "Personale",
            Self::Health => "Salute",
            Self::Shopping => "Shopping",
            Self::Study => "Studio",
            Self::Family => "Famiglia",
            Self::Other => "Altro",
        }
    }
}

impl From<String> for Category {
    fn from(value: String) -> Self {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == value)
            .unwrap_or_default()
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tracked unit of work.
///
/// `reminder_ids` lists the scheduler handles that are still pending for this
/// task (zero to two). Only the task store writes it, from what the reminder
/// scheduler returned.
///
/// Fields written by other front-ends (tags, time estimates, streaks and the
/// like) land in `extra` and are written back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique, immutable identifier.
    pub id: TaskId,
    /// Trimmed, non-empty title.
    pub title: String,
    /// Free text, possibly empty.
    #[serde(default)]
    pub description: String,
    /// Whether the task has been completed.
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub category: Category,
    /// Set once, when the task is created.
    pub created_at: DateTime<Utc>,
    /// Single absolute due instant. `None` means no reminder is eligible.
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    /// Set when the task transitions to completed, cleared when reopened.
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Pending scheduler handles for this task.
    #[serde(default)]
    pub reminder_ids: Vec<ReminderHandle>,
    /// Unrecognised snapshot fields.
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl Task {
    /// Returns true when the task is pending and its due instant has passed.
    #[must_use]
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.completed && self.due_date.is_some_and(|due| due <= now)
    }
}

/// Input for creating a task. Absent fields take the task defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub priority: Option<Priority>,
    pub category: Option<Category>,
    pub due_date: Option<DateTime<Utc>>,
}

impl TaskDraft {
    /// Starts a draft with the given title and every other field defaulted.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub const fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    #[must_use]
    pub const fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    #[must_use]
    pub const fn due(mut self, due: DateTime<Utc>) -> Self {
        self.due_date = Some(due);
        self
    }
}

/// Partial update for an existing task. `None` leaves a field untouched.
///
/// `due_date` is doubly optional: `Some(None)` removes the due date,
/// `Some(Some(t))` sets it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub category: Option<Category>,
    pub due_date: Option<Option<DateTime<Utc>>>,
}

impl TaskPatch {
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub const fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    #[must_use]
    pub const fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    #[must_use]
    pub const fn due(mut self, due: Option<DateTime<Utc>>) -> Self {
        self.due_date = Some(due);
        self
    }

    /// Returns true if applying this patch would change nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.category.is_none()
            && self.due_date.is_none()
    }
}

/// Errors produced while combining a calendar date and clock time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DueDateError {
    /// The date is not a valid `YYYY-MM-DD` calendar date.
    #[error("invalid date '{0}' (expected YYYY-MM-DD)")]
    Date(String),
    /// The time is not a valid `HH:MM` clock time.
    #[error("invalid time '{0}' (expected HH:MM)")]
    Time(String),
}

/// Combines a `YYYY-MM-DD` date and an optional `HH:MM` time into one local
/// wall-clock value.
///
/// A date without a time means the end of that day (23:59:59). The caller
/// converts the result into an absolute instant in its own zone.
///
/// # Errors
///
/// Returns [`DueDateError`] if either part fails to parse.
pub fn combine_due(date: &str, time: Option<&str>) -> Result<NaiveDateTime, DueDateError> {
    let date = date.trim();
    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| DueDateError::Date(date.to_string()))?;
    let clock = match time.map(str::trim).filter(|t| !t.is_empty()) {
        Some(t) => {
            NaiveTime::parse_from_str(t, "%H:%M").map_err(|_| DueDateError::Time(t.to_string()))?
        }
        None => NaiveTime::from_hms_opt(23, 59, 59)
            .ok_or_else(|| DueDateError::Time("23:59:59".into()))?,
    };
    Ok(day.and_time(clock))
}
