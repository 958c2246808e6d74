//! Queue facade shared by producers, consumers, and the sweeper.

use crate::queue::{
    domain::{
        NewTask, QueueDomainError, QueuePolicy, QueueStats, SweepReport, Task, TaskId, TaskName,
        TaskOutcome, TaskPayload, window_start,
    },
    ports::{ClaimRequest, OutcomeRequest, ReclaimRequest, TaskStore, TaskStoreError},
};
use mockable::Clock;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Service-level errors for queue operations.
#[derive(Debug, Error)]
pub enum TaskQueueError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] QueueDomainError),
    /// The payload could not be encoded as a JSON document.
    #[error("payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Store operation failed.
    #[error(transparent)]
    Store(#[from] TaskStoreError),
}

/// Result type for queue service operations.
pub type TaskQueueResult<T> = Result<T, TaskQueueError>;

/// A queue instance: one store handle, one clock, one fixed policy.
///
/// Cloning is cheap and shares the underlying store, so the same instance
/// can be handed to producers, consumers, and the sweeper.
pub struct TaskQueueService<S, C>
where
    S: TaskStore,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    clock: Arc<C>,
    policy: QueuePolicy,
}

impl<S, C> Clone for TaskQueueService<S, C>
where
    S: TaskStore,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
            policy: self.policy,
        }
    }
}

impl<S, C> TaskQueueService<S, C>
where
    S: TaskStore,
    C: Clock + Send + Sync,
{
    /// Creates a new queue service.
    #[must_use]
    pub const fn new(store: Arc<S>, clock: Arc<C>, policy: QueuePolicy) -> Self {
        Self {
            store,
            clock,
            policy,
        }
    }

    /// Returns the policy fixed at construction.
    #[must_use]
    pub const fn policy(&self) -> &QueuePolicy {
        &self.policy
    }

    /// Returns the underlying store.
    #[must_use]
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Creates the backing table and indices if they are absent.
    ///
    /// # Errors
    ///
    /// Returns [`TaskQueueError::Store`] when schema creation fails.
    pub async fn initialize(&self) -> TaskQueueResult<()> {
        self.store.ensure_schema().await?;
        info!("task store schema ready");
        Ok(())
    }

    /// Appends a pending task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskQueueError::Domain`] for an invalid name,
    /// [`TaskQueueError::Serialization`] when `payload` is not representable
    /// as JSON, or [`TaskQueueError::Store`] when the insert fails.
    pub async fn enqueue<T>(&self, name: impl Into<String>, payload: &T) -> TaskQueueResult<TaskId>
    where
        T: Serialize + ?Sized,
    {
        let name = TaskName::new(name)?;
        let payload = TaskPayload::from_serializable(payload)?;
        let stored = self
            .store
            .insert(&NewTask::new(name, payload, &*self.clock))
            .await?;
        info!(task_id = %stored.id(), task_name = %stored.name(), "task enqueued");
        Ok(stored.id())
    }

    /// Claims the oldest eligible task.
    ///
    /// Returns `Ok(None)` when no task is eligible, including when every
    /// eligible row is momentarily held by another claimant.
    ///
    /// # Errors
    ///
    /// Returns [`TaskQueueError::Store`] when the claim transaction fails; the
    /// transaction is rolled back in that case.
    pub async fn claim(&self) -> TaskQueueResult<Option<Task>> {
        let request = ClaimRequest {
            max_attempts: self.policy.max_attempts(),
            claimed_at: self.clock.utc(),
        };
        let claimed = self.store.claim_next(request).await?;
        if let Some(task) = &claimed {
            debug!(
                task_id = %task.id(),
                task_name = %task.name(),
                attempt = task.attempt_count(),
                "task claimed"
            );
        }
        Ok(claimed)
    }

    /// Records the outcome reported by the holder of a claim.
    ///
    /// # Errors
    ///
    /// Returns [`TaskQueueError::Store`] when the task does not exist, is not
    /// currently claimed, or the write fails.
    pub async fn report_outcome(&self, id: TaskId, outcome: TaskOutcome) -> TaskQueueResult<Task> {
        let request = OutcomeRequest {
            task_id: id,
            outcome,
            recorded_at: self.clock.utc(),
        };
        let task = self.store.record_outcome(request).await?;
        if task.is_dead(self.policy.max_attempts()) {
            warn!(
                task_id = %task.id(),
                task_name = %task.name(),
                attempts = task.attempt_count(),
                "task exhausted its attempts"
            );
        } else {
            debug!(task_id = %task.id(), %outcome, "task outcome recorded");
        }
        Ok(task)
    }

    /// Deletes completed and dead tasks past their retention windows.
    ///
    /// # Errors
    ///
    /// Returns [`TaskQueueError::Domain`] when a retention window cannot be
    /// measured back from the current time, or [`TaskQueueError::Store`]
    /// when the sweep transaction fails.
    pub async fn sweep(&self) -> TaskQueueResult<SweepReport> {
        let cutoffs = self
            .policy
            .retention()
            .cutoffs(self.clock.utc(), self.policy.max_attempts())?;
        let report = self.store.sweep(cutoffs).await?;
        info!(
            completed = report.completed_deleted,
            dead = report.dead_deleted,
            "retention sweep finished"
        );
        Ok(report)
    }

    /// Releases claims older than the configured processing timeout.
    ///
    /// Released tasks return to `failed` with their attempt count intact, so
    /// they are retried below the ceiling and dead at it. Returns `0` without
    /// touching the store when no timeout is configured.
    ///
    /// # Errors
    ///
    /// Returns [`TaskQueueError::Domain`] when the timeout cannot be measured
    /// back from the current time, or [`TaskQueueError::Store`] when the
    /// update fails.
    pub async fn reclaim_stale(&self) -> TaskQueueResult<u64> {
        let Some(timeout) = self.policy.processing_timeout() else {
            return Ok(0);
        };
        let now = self.clock.utc();
        let stale_before = window_start(now, timeout, "processing timeout")?;
        let released = self
            .store
            .reclaim_stale(ReclaimRequest {
                stale_before,
                reclaimed_at: now,
            })
            .await?;
        if released > 0 {
            warn!(released, "released stale processing claims");
        }
        Ok(released)
    }

    /// Finds a task by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`TaskQueueError::Store`] when the lookup fails.
    pub async fn find(&self, id: TaskId) -> TaskQueueResult<Option<Task>> {
        Ok(self.store.find_by_id(id).await?)
    }

    /// Counts tasks per lifecycle bucket.
    ///
    /// # Errors
    ///
    /// Returns [`TaskQueueError::Store`] when the query fails.
    pub async fn stats(&self) -> TaskQueueResult<QueueStats> {
        Ok(self.store.stats(self.policy.max_attempts()).await?)
    }
}
