//! Taskminder: personal task tracker with local due-date reminders.

pub mod clock;
pub mod config;
pub mod reminders;
pub mod store;
