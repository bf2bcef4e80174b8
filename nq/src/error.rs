//! Queue error types

use thiserror::Error;

/// Errors reported by the queue
///
/// Cloneable so a single failure can be delivered to every waiter
/// coalesced under the same key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("Invalid task: missing key")]
    InvalidTask,

    #[error("No in-flight entry for key: {key}")]
    NoSuchKey { key: String },

    #[error("Queue scheduler has shut down")]
    Closed,

    #[error("Processor aborted while running key: {key}")]
    Aborted { key: String },
}

impl QueueError {
    /// Check if the error was raised by the caller's own submission
    pub fn is_caller_error(&self) -> bool {
        matches!(self, QueueError::InvalidTask)
    }
}
