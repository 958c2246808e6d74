//! Task aggregate root and its lifecycle state machine.

use super::{
    MaxAttempts, ParseTaskStatusError, QueueDomainError, SweepCutoffs, TaskId, TaskName,
    TaskPayload,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task is waiting for its first claim.
    Pending,
    /// Task is claimed by a consumer.
    Processing,
    /// The last attempt failed.
    Failed,
    /// Task finished successfully.
    Completed,
}

impl TaskStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 4] = [
        Self::Pending,
        Self::Processing,
        Self::Failed,
        Self::Completed,
    ];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Failed => "failed",
            Self::Completed => "completed",
        }
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = ParseTaskStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "failed" => Ok(Self::Failed),
            "completed" => Ok(Self::Completed),
            _ => Err(ParseTaskStatusError(value.to_owned())),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal result reported by the consumer holding a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskOutcome {
    /// The handler succeeded.
    Completed,
    /// The handler failed or no handler was registered.
    Failed,
}

impl TaskOutcome {
    /// Status the task moves to when this outcome is recorded.
    #[must_use]
    pub const fn status(self) -> TaskStatus {
        match self {
            Self::Completed => TaskStatus::Completed,
            Self::Failed => TaskStatus::Failed,
        }
    }
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.status().as_str())
    }
}

/// Task submitted by a producer, before the store assigns an identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    name: TaskName,
    payload: TaskPayload,
    created_at: DateTime<Utc>,
}

impl NewTask {
    /// Creates a pending task stamped with the current clock time.
    #[must_use]
    pub fn new(name: TaskName, payload: TaskPayload, clock: &impl Clock) -> Self {
        Self::at(name, payload, clock.utc())
    }

    /// Creates a pending task with an explicit creation time.
    #[must_use]
    pub const fn at(
        name: TaskName,
        payload: TaskPayload,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name,
            payload,
            created_at,
        }
    }

    /// Handler name.
    #[must_use]
    pub const fn name(&self) -> &TaskName {
        &self.name
    }

    /// Task arguments.
    #[must_use]
    pub const fn payload(&self) -> &TaskPayload {
        &self.payload
    }

    /// Creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Materializes the stored task once the store has assigned `id`.
    #[must_use]
    pub fn into_task(self, id: TaskId) -> Task {
        Task {
            id,
            name: self.name,
            payload: self.payload,
            status: TaskStatus::Pending,
            attempt_count: 0,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

/// Task aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    name: TaskName,
    payload: TaskPayload,
    status: TaskStatus,
    attempt_count: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted task aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskData {
    /// Persisted task identifier.
    pub id: TaskId,
    /// Persisted handler name.
    pub name: TaskName,
    /// Persisted arguments.
    pub payload: TaskPayload,
    /// Persisted lifecycle status.
    pub status: TaskStatus,
    /// Persisted number of claims.
    pub attempt_count: u32,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest transition timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        Self {
            id: data.id,
            name: data.name,
            payload: data.payload,
            status: data.status,
            attempt_count: data.attempt_count,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the handler name.
    #[must_use]
    pub const fn name(&self) -> &TaskName {
        &self.name
    }

    /// Returns the task arguments.
    #[must_use]
    pub const fn payload(&self) -> &TaskPayload {
        &self.payload
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the number of claims consumed so far.
    #[must_use]
    pub const fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest transition timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns `true` when a consumer may claim this task.
    #[must_use]
    pub const fn is_eligible(&self, max_attempts: MaxAttempts) -> bool {
        match self.status {
            TaskStatus::Pending => true,
            TaskStatus::Failed => max_attempts.allows(self.attempt_count),
            TaskStatus::Processing | TaskStatus::Completed => false,
        }
    }

    /// Returns `true` for a failed task that has exhausted its attempts.
    #[must_use]
    pub const fn is_dead(&self, max_attempts: MaxAttempts) -> bool {
        matches!(self.status, TaskStatus::Failed) && !max_attempts.allows(self.attempt_count)
    }

    /// Returns `true` when a sweep with `cutoffs` deletes this task.
    #[must_use]
    pub fn is_sweepable(&self, cutoffs: &SweepCutoffs) -> bool {
        match self.status {
            TaskStatus::Completed => self.created_at < cutoffs.completed_before,
            TaskStatus::Failed => {
                self.is_dead(cutoffs.max_attempts) && self.created_at < cutoffs.failed_before
            }
            TaskStatus::Pending | TaskStatus::Processing => false,
        }
    }

    /// Returns `true` for a claim that has not been touched since
    /// `stale_before`.
    #[must_use]
    pub fn is_stale(&self, stale_before: DateTime<Utc>) -> bool {
        self.status == TaskStatus::Processing && self.updated_at < stale_before
    }

    /// Marks the task as claimed, consuming one attempt.
    ///
    /// # Errors
    ///
    /// Returns [`QueueDomainError::NotEligible`] when the task is neither
    /// pending nor a failure below the attempt ceiling.
    pub fn claim(
        &mut self,
        max_attempts: MaxAttempts,
        at: DateTime<Utc>,
    ) -> Result<(), QueueDomainError> {
        if !self.is_eligible(max_attempts) {
            return Err(QueueDomainError::NotEligible {
                task_id: self.id,
                status: self.status,
                attempt_count: self.attempt_count,
            });
        }
        self.status = TaskStatus::Processing;
        self.attempt_count = self.attempt_count.saturating_add(1);
        self.updated_at = at;
        Ok(())
    }

    /// Records the outcome reported by the claim holder.
    ///
    /// Recording the outcome the task already carries is accepted without
    /// change, so a consumer may safely repeat a report.
    ///
    /// # Errors
    ///
    /// Returns [`QueueDomainError::InvalidTransition`] when the task is not
    /// `processing` and does not already carry the requested outcome.
    pub fn record_outcome(
        &mut self,
        outcome: TaskOutcome,
        at: DateTime<Utc>,
    ) -> Result<(), QueueDomainError> {
        let target = outcome.status();
        if self.status == target {
            return Ok(());
        }
        if self.status != TaskStatus::Processing {
            return Err(QueueDomainError::InvalidTransition {
                task_id: self.id,
                from: self.status,
                to: target,
            });
        }
        self.status = target;
        self.updated_at = at;
        Ok(())
    }

    /// Releases an expired claim back to `failed` without consuming an
    /// attempt.
    ///
    /// # Errors
    ///
    /// Returns [`QueueDomainError::InvalidTransition`] when the task is not
    /// `processing`.
    pub fn release_stale(&mut self, at: DateTime<Utc>) -> Result<(), QueueDomainError> {
        if self.status != TaskStatus::Processing {
            return Err(QueueDomainError::InvalidTransition {
                task_id: self.id,
                from: self.status,
                to: TaskStatus::Failed,
            });
        }
        self.status = TaskStatus::Failed;
        self.updated_at = at;
        Ok(())
    }
}

/// Rows removed by one sweep pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SweepReport {
    /// Completed tasks past the completed retention window.
    pub completed_deleted: u64,
    /// Dead tasks past the failed retention window.
    pub dead_deleted: u64,
}

impl SweepReport {
    /// Total rows deleted.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.completed_deleted + self.dead_deleted
    }
}

/// Row counts per lifecycle bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueueStats {
    /// Tasks awaiting their first claim.
    pub pending: u64,
    /// Tasks currently claimed.
    pub processing: u64,
    /// Failed tasks below the attempt ceiling.
    pub retryable: u64,
    /// Failed tasks at the attempt ceiling.
    pub dead: u64,
    /// Completed tasks not yet swept.
    pub completed: u64,
}

impl QueueStats {
    /// Adds one task to the matching bucket.
    pub fn count(&mut self, task: &Task, max_attempts: MaxAttempts) {
        match task.status() {
            TaskStatus::Pending => self.pending += 1,
            TaskStatus::Processing => self.processing += 1,
            TaskStatus::Failed if task.is_dead(max_attempts) => self.dead += 1,
            TaskStatus::Failed => self.retryable += 1,
            TaskStatus::Completed => self.completed += 1,
        }
    }

    /// Tasks a consumer could claim right now.
    #[must_use]
    pub const fn eligible(&self) -> u64 {
        self.pending + self.retryable
    }
}
