//! Snapshot encoding for the persisted task collection.
//!
//! A snapshot is a JSON array of [`Task`] values. Anything that is not a
//! well-formed array of tasks fails to decode as a whole; callers decide how
//! to degrade.

use crate::task::Task;

/// Error type for snapshot encode/decode operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The task sequence could not be serialized.
    #[error("snapshot encode error: {0}")]
    Encode(#[source] serde_json::Error),
    /// The bytes are not a well-formed task sequence.
    #[error("snapshot decode error: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Encodes a task sequence into a snapshot string.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] if serialization fails.
pub fn encode_snapshot(tasks: &[Task]) -> Result<String, CodecError> {
    serde_json::to_string(tasks).map_err(CodecError::Encode)
}

/// Decodes a snapshot string into a task sequence.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] if the input is not a JSON array of tasks.
pub fn decode_snapshot(snapshot: &str) -> Result<Vec<Task>, CodecError> {
    serde_json::from_str(snapshot).map_err(CodecError::Decode)
}
