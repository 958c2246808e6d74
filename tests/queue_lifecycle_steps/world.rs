//! Shared world state for queue lifecycle BDD scenarios.

use crate::test_helpers::{FixedClock, epoch};
use corvee::queue::{
    adapters::memory::InMemoryTaskStore,
    domain::{QueuePolicy, Task, TaskId},
    services::TaskQueueService,
};
use rstest::fixture;
use std::sync::Arc;

/// Queue type used by the BDD world.
pub type WorldQueue = TaskQueueService<InMemoryTaskStore, FixedClock>;

/// Scenario world for queue lifecycle behaviour tests.
pub struct QueueWorld {
    pub clock: FixedClock,
    pub queue: WorldQueue,
    pub last_enqueued: Option<TaskId>,
    pub last_claim: Option<Task>,
    pub concurrent_claims: Vec<Option<Task>>,
}

impl QueueWorld {
    /// Creates a world with a default-policy queue frozen at [`epoch`].
    #[must_use]
    pub fn new() -> Self {
        let clock = FixedClock::at(epoch());
        let queue = Self::queue_for(&clock, QueuePolicy::default());
        Self {
            clock,
            queue,
            last_enqueued: None,
            last_claim: None,
            concurrent_claims: Vec::new(),
        }
    }

    /// Replaces the queue with a fresh one using `policy`.
    pub fn reset_queue(&mut self, policy: QueuePolicy) {
        self.queue = Self::queue_for(&self.clock, policy);
    }

    /// Returns the identifier of the most recently enqueued task.
    ///
    /// # Errors
    ///
    /// Returns an error when no task has been enqueued yet.
    pub fn enqueued_id(&self) -> Result<TaskId, eyre::Report> {
        self.last_enqueued
            .ok_or_else(|| eyre::eyre!("missing enqueued task in scenario world"))
    }

    fn queue_for(clock: &FixedClock, policy: QueuePolicy) -> WorldQueue {
        TaskQueueService::new(
            Arc::new(InMemoryTaskStore::new()),
            Arc::new(clock.clone()),
            policy,
        )
    }
}

impl Default for QueueWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> QueueWorld {
    QueueWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
