//! Data model shared by every Taskminder layer.
//!
//! Holds the task entity, the reminder identifiers and payloads, and the
//! snapshot codec used to persist the task collection. Nothing here performs
//! I/O or spawns work.

pub mod codec;
pub mod reminder;
pub mod task;
