//! Error types for queue domain validation and parsing.

use super::{TaskId, TaskStatus};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors returned while constructing or transitioning domain task values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueueDomainError {
    /// The task name is empty after trimming.
    #[error("task name must not be empty")]
    EmptyTaskName,

    /// The task name exceeds the persisted column width.
    #[error("task name is {0} characters long, at most 255 are allowed")]
    TaskNameTooLong(usize),

    /// The table name is not a plain SQL identifier.
    #[error("invalid table name '{0}', expected an identifier of at most 48 characters")]
    InvalidTableName(String),

    /// The attempt ceiling is zero.
    #[error("max attempts must be at least 1")]
    InvalidMaxAttempts,

    /// A retention or lease window reaches past the representable time range.
    #[error("{window} window is too large to subtract from {now}")]
    WindowOutOfRange {
        /// Window that overflowed.
        window: &'static str,
        /// Instant the window was measured back from.
        now: DateTime<Utc>,
    },

    /// The task cannot be claimed in its current state.
    #[error("task {task_id} is not eligible for claim ({status}, {attempt_count} attempts)")]
    NotEligible {
        /// Task that was asked to transition.
        task_id: TaskId,
        /// Current status of the task.
        status: TaskStatus,
        /// Attempts already consumed.
        attempt_count: u32,
    },

    /// The requested status transition is not permitted.
    #[error("invalid transition for task {task_id}: {from} -> {to}")]
    InvalidTransition {
        /// Task that was asked to transition.
        task_id: TaskId,
        /// Current status.
        from: TaskStatus,
        /// Requested status.
        to: TaskStatus,
    },
}

/// Error returned while parsing task statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task status: {0}")]
pub struct ParseTaskStatusError(pub String);
