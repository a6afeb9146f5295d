//! Read-only views over the task collection: filtered listings and statistics.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use taskminder_model::task::{Category, Priority, Task};

/// Which tasks a listing includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Completed,
    Pending,
    /// Pending tasks with [`Priority::High`].
    HighPriority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    CreatedAt,
    /// Tasks without a due date always come last.
    DueDate,
    Priority,
    /// Case-insensitive.
    Title,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

/// A listing request. The default lists every task, newest created first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskQuery {
    pub status: StatusFilter,
    pub category: Option<Category>,
    pub priority: Option<Priority>,
    /// Matched case-insensitively against title and description.
    pub search: Option<String>,
    pub sort: SortKey,
    pub direction: SortDirection,
}

impl TaskQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn status(mut self, status: StatusFilter) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub const fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    #[must_use]
    pub const fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    #[must_use]
    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    #[must_use]
    pub const fn sort_by(mut self, key: SortKey, direction: SortDirection) -> Self {
        self.sort = key;
        self.direction = direction;
        self
    }

    /// Returns true if `task` passes every filter.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        let status_ok = match self.status {
            StatusFilter::All => true,
            StatusFilter::Completed => task.completed,
            StatusFilter::Pending => !task.completed,
            StatusFilter::HighPriority => !task.completed && task.priority == Priority::High,
        };
        if !status_ok {
            return false;
        }
        if self.category.is_some_and(|c| c != task.category) {
            return false;
        }
        if self.priority.is_some_and(|p| p != task.priority) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(needle) => {
                let needle = needle.to_lowercase();
                task.title.to_lowercase().contains(&needle)
                    || task.description.to_lowercase().contains(&needle)
            }
        }
    }

    /// Filters and sorts `tasks`. Ties keep their input order.
    pub fn apply<'a>(&self, tasks: impl IntoIterator<Item = &'a Task>) -> Vec<&'a Task> {
        let mut out: Vec<&Task> = tasks.into_iter().filter(|t| self.matches(t)).collect();
        out.sort_by(|a, b| self.compare(a, b));
        out
    }

    fn compare(&self, a: &Task, b: &Task) -> Ordering {
        let directed = |ord: Ordering| match self.direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        };
        match self.sort {
            SortKey::CreatedAt => directed(a.created_at.cmp(&b.created_at)),
            SortKey::Priority => directed(a.priority.cmp(&b.priority)),
            SortKey::Title => directed(a.title.to_lowercase().cmp(&b.title.to_lowercase())),
            SortKey::DueDate => match (a.due_date, b.due_date) {
                (Some(x), Some(y)) => directed(x.cmp(&y)),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
        }
    }
}

/// Counts derived from the current collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    /// Pending tasks with high priority.
    pub high_priority: usize,
    /// Pending tasks whose due instant has passed.
    pub overdue: usize,
    /// Completed share in percent, 0 for an empty collection.
    pub completion_rate: f64,
    pub by_category: BTreeMap<Category, usize>,
}

impl TaskStats {
    /// Computes statistics over `tasks` as seen at `now`.
    pub fn compute<'a>(tasks: impl IntoIterator<Item = &'a Task>, now: DateTime<Utc>) -> Self {
        let mut stats = Self::default();
        for task in tasks {
            stats.total += 1;
            *stats.by_category.entry(task.category).or_default() += 1;
            if task.completed {
                stats.completed += 1;
                continue;
            }
            stats.pending += 1;
            if task.priority == Priority::High {
                stats.high_priority += 1;
            }
            if task.is_overdue(now) {
                stats.overdue += 1;
            }
        }
        stats.completion_rate = percent(stats.completed, stats.total);
        stats
    }
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    let part = f64::from(u32::try_from(part).unwrap_or(u32::MAX));
    let whole = f64::from(u32::try_from(whole).unwrap_or(u32::MAX));
    part / whole * 100.0
}
