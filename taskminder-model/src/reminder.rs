//! Reminder identifiers and the payload delivered with every alert.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::task::TaskId;

/// Opaque identifier of one scheduled reminder timer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReminderHandle(String);

impl ReminderHandle {
    /// Creates a fresh handle (UUID v7).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Wraps an existing handle string.
    pub fn from_string(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ReminderHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ReminderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a reminder is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReminderKind {
    /// Lead-time reminder ahead of the due instant.
    Upcoming,
    /// "Due today" reminder, at 09:00 on the due day or right away.
    DueToday,
    /// The process-wide morning reminder. Not tied to any task.
    Daily,
}

impl ReminderKind {
    /// Heading shown above the reminder body.
    #[must_use]
    pub const fn heading(self) -> &'static str {
        match self {
            Self::Upcoming => "⏰ Promemoria Attività",
            Self::DueToday => "📅 Attività in Scadenza Oggi",
            Self::Daily => "🌅 Buongiorno!",
        }
    }
}

impl std::fmt::Display for ReminderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Upcoming => write!(f, "upcoming"),
            Self::DueToday => write!(f, "dueToday"),
            Self::Daily => write!(f, "daily"),
        }
    }
}

/// Data attached to a delivered reminder so the receiver can route it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderPayload {
    /// The task the reminder belongs to; `None` for the daily reminder.
    pub task_id: Option<TaskId>,
    pub kind: ReminderKind,
}

impl ReminderPayload {
    /// Payload for a task-bound reminder.
    #[must_use]
    pub const fn for_task(task_id: TaskId, kind: ReminderKind) -> Self {
        Self {
            task_id: Some(task_id),
            kind,
        }
    }

    /// Payload for the daily reminder.
    #[must_use]
    pub const fn daily() -> Self {
        Self {
            task_id: None,
            kind: ReminderKind::Daily,
        }
    }
}

/// A fully rendered reminder, as handed to a notifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub heading: String,
    pub body: String,
    pub payload: ReminderPayload,
}

impl Notification {
    /// Builds a notification whose heading follows the payload kind.
    pub fn new(body: impl Into<String>, payload: ReminderPayload) -> Self {
        Self {
            heading: payload.kind.heading().to_string(),
            body: body.into(),
            payload,
        }
    }
}
