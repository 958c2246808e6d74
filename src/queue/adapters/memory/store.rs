//! In-memory task store.
//!
//! A single mutex guards the whole table, standing in for the row lock a
//! relational store takes during a claim. Every operation runs entirely
//! under the lock, so concurrent claimants always receive disjoint tasks.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::queue::{
    domain::{
        MaxAttempts, NewTask, QueueDomainError, QueueStats, SweepCutoffs, SweepReport, Task,
        TaskId,
    },
    ports::{
        ClaimRequest, OutcomeRequest, ReclaimRequest, TaskStore, TaskStoreError, TaskStoreResult,
    },
};

/// Thread-safe in-memory task store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskStore {
    state: Arc<Mutex<InMemoryTaskState>>,
}

#[derive(Debug, Default)]
struct InMemoryTaskState {
    last_id: i64,
    tasks: BTreeMap<TaskId, Task>,
}

impl InMemoryTaskStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a fully-formed task, replacing any task with the same
    /// identifier.
    ///
    /// Intended for tests that need rows in a specific state or with a
    /// specific age. Later inserts still receive identifiers above every
    /// seeded one.
    ///
    /// # Errors
    ///
    /// Returns a persistence error when the state lock is poisoned.
    pub fn seed(&self, task: Task) -> TaskStoreResult<()> {
        let mut state = self.lock()?;
        state.last_id = state.last_id.max(task.id().value());
        state.tasks.insert(task.id(), task);
        Ok(())
    }

    /// Returns the number of stored tasks.
    ///
    /// # Errors
    ///
    /// Returns a persistence error when the state lock is poisoned.
    pub fn len(&self) -> TaskStoreResult<usize> {
        Ok(self.lock()?.tasks.len())
    }

    /// Returns `true` when no tasks are stored.
    ///
    /// # Errors
    ///
    /// Returns a persistence error when the state lock is poisoned.
    pub fn is_empty(&self) -> TaskStoreResult<bool> {
        Ok(self.lock()?.tasks.is_empty())
    }

    fn lock(&self) -> TaskStoreResult<MutexGuard<'_, InMemoryTaskState>> {
        self.state
            .lock()
            .map_err(|err| TaskStoreError::persistence(std::io::Error::other(err.to_string())))
    }
}

fn transition_error(err: QueueDomainError) -> TaskStoreError {
    match err {
        QueueDomainError::InvalidTransition { task_id, from, to } => {
            TaskStoreError::InvalidTransition { task_id, from, to }
        }
        other => TaskStoreError::persistence(other),
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn ensure_schema(&self) -> TaskStoreResult<()> {
        self.lock().map(drop)
    }

    async fn insert(&self, task: &NewTask) -> TaskStoreResult<Task> {
        let mut state = self.lock()?;
        state.last_id += 1;
        let stored = task.clone().into_task(TaskId::new(state.last_id));
        state.tasks.insert(stored.id(), stored.clone());
        Ok(stored)
    }

    async fn claim_next(&self, request: ClaimRequest) -> TaskStoreResult<Option<Task>> {
        let mut state = self.lock()?;
        let Some(task) = state
            .tasks
            .values_mut()
            .find(|task| task.is_eligible(request.max_attempts))
        else {
            return Ok(None);
        };
        task.claim(request.max_attempts, request.claimed_at)
            .map_err(transition_error)?;
        Ok(Some(task.clone()))
    }

    async fn record_outcome(&self, request: OutcomeRequest) -> TaskStoreResult<Task> {
        let mut state = self.lock()?;
        let task = state
            .tasks
            .get_mut(&request.task_id)
            .ok_or(TaskStoreError::NotFound(request.task_id))?;
        task.record_outcome(request.outcome, request.recorded_at)
            .map_err(transition_error)?;
        Ok(task.clone())
    }

    async fn sweep(&self, cutoffs: SweepCutoffs) -> TaskStoreResult<SweepReport> {
        let mut state = self.lock()?;
        let mut report = SweepReport::default();
        state.tasks.retain(|_, task| {
            if !task.is_sweepable(&cutoffs) {
                return true;
            }
            if task.is_dead(cutoffs.max_attempts) {
                report.dead_deleted += 1;
            } else {
                report.completed_deleted += 1;
            }
            false
        });
        Ok(report)
    }

    async fn reclaim_stale(&self, request: ReclaimRequest) -> TaskStoreResult<u64> {
        let mut state = self.lock()?;
        let mut released = 0;
        for task in state.tasks.values_mut() {
            if task.is_stale(request.stale_before) {
                task.release_stale(request.reclaimed_at)
                    .map_err(transition_error)?;
                released += 1;
            }
        }
        Ok(released)
    }

    async fn find_by_id(&self, id: TaskId) -> TaskStoreResult<Option<Task>> {
        let state = self.lock()?;
        Ok(state.tasks.get(&id).cloned())
    }

    async fn stats(&self, max_attempts: MaxAttempts) -> TaskStoreResult<QueueStats> {
        let state = self.lock()?;
        let mut stats = QueueStats::default();
        for task in state.tasks.values() {
            stats.count(task, max_attempts);
        }
        Ok(stats)
    }
}
