//! Store port for task persistence, claiming, and retention.

use crate::queue::domain::{
    MaxAttempts, NewTask, QueueStats, SweepCutoffs, SweepReport, Task, TaskId, TaskOutcome,
    TaskStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for task store operations.
pub type TaskStoreResult<T> = Result<T, TaskStoreError>;

/// Parameters for a single claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimRequest {
    /// Ceiling separating retryable failures from dead ones.
    pub max_attempts: MaxAttempts,
    /// Timestamp written to `updated_at` on the claimed row.
    pub claimed_at: DateTime<Utc>,
}

/// Parameters for recording a consumer-reported outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutcomeRequest {
    /// Task whose claim is being resolved.
    pub task_id: TaskId,
    /// Reported outcome.
    pub outcome: TaskOutcome,
    /// Timestamp written to `updated_at`.
    pub recorded_at: DateTime<Utc>,
}

/// Parameters for releasing expired claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReclaimRequest {
    /// Claims whose `updated_at` is older than this are released.
    pub stale_before: DateTime<Utc>,
    /// Timestamp written to `updated_at` on released rows.
    pub reclaimed_at: DateTime<Utc>,
}

/// Task persistence contract.
///
/// Every method is a single atomic unit: implementations either apply all of
/// an operation's writes or none of them.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Creates the backing table and indices when they are absent.
    ///
    /// Safe to call on every startup and from several processes at once.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::Unavailable`] when the store cannot be
    /// reached or [`TaskStoreError::Persistence`] when DDL fails.
    async fn ensure_schema(&self) -> TaskStoreResult<()>;

    /// Appends a pending task and returns it with its assigned identifier.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::Unavailable`] or
    /// [`TaskStoreError::Persistence`] when the insert cannot commit.
    async fn insert(&self, task: &NewTask) -> TaskStoreResult<Task>;

    /// Claims the oldest eligible task, if any.
    ///
    /// The selected row moves to `processing` with its attempt count
    /// incremented in the same transaction that selected it. Rows locked by
    /// a concurrent claimant are skipped rather than waited on, so racing
    /// consumers receive disjoint tasks. Returns `None` when nothing is
    /// eligible, which is not an error.
    async fn claim_next(&self, request: ClaimRequest) -> TaskStoreResult<Option<Task>>;

    /// Records the outcome of a claimed task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::NotFound`] when the task does not exist or
    /// [`TaskStoreError::InvalidTransition`] when it is neither
    /// `processing` nor already carrying the reported outcome.
    async fn record_outcome(&self, request: OutcomeRequest) -> TaskStoreResult<Task>;

    /// Deletes completed and dead tasks older than their cutoffs.
    async fn sweep(&self, cutoffs: SweepCutoffs) -> TaskStoreResult<SweepReport>;

    /// Moves `processing` tasks untouched since the cutoff back to `failed`.
    ///
    /// Returns the number of released claims.
    async fn reclaim_stale(&self, request: ReclaimRequest) -> TaskStoreResult<u64>;

    /// Finds a task by identifier.
    ///
    /// Returns `None` when the task does not exist.
    async fn find_by_id(&self, id: TaskId) -> TaskStoreResult<Option<Task>>;

    /// Counts tasks per lifecycle bucket.
    async fn stats(&self, max_attempts: MaxAttempts) -> TaskStoreResult<QueueStats>;
}

/// Errors returned by task store implementations.
#[derive(Debug, Clone, Error)]
pub enum TaskStoreError {
    /// The task was not found.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// The task is not in a state that accepts the requested status.
    #[error("task {task_id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// Task that was asked to transition.
        task_id: TaskId,
        /// Status found in the store.
        from: TaskStatus,
        /// Requested status.
        to: TaskStatus,
    },

    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(Arc<dyn std::error::Error + Send + Sync>),

    /// A transaction failed and was rolled back.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl TaskStoreError {
    /// Wraps a connectivity error.
    pub fn unavailable(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Unavailable(Arc::new(err))
    }

    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
