//! Shared test helpers for in-memory queue integration tests.

use crate::test_helpers::{FixedClock, epoch};
use async_trait::async_trait;
use corvee::queue::{
    adapters::memory::InMemoryTaskStore,
    domain::{MaxAttempts, QueuePolicy, RetentionPolicy, Task, TaskId},
    ports::{HandlerError, TaskHandler},
    services::TaskQueueService,
};
use rstest::fixture;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;

/// Queue type used by in-memory integration tests.
pub type MemoryQueue = TaskQueueService<InMemoryTaskStore, FixedClock>;

/// Provides a clock frozen at [`epoch`].
#[fixture]
pub fn clock() -> FixedClock {
    FixedClock::at(epoch())
}

/// Builds a queue over a fresh store with a three-attempt ceiling.
pub fn queue_with_clock(clock: &FixedClock) -> MemoryQueue {
    let policy = QueuePolicy::new(
        MaxAttempts::new(3).unwrap_or_default(),
        RetentionPolicy::default(),
    );
    TaskQueueService::new(
        Arc::new(InMemoryTaskStore::new()),
        Arc::new(clock.clone()),
        policy,
    )
}

/// Resolves once `signal` reads `true`, or when its sender is gone.
pub async fn stopped(mut signal: watch::Receiver<bool>) {
    signal.wait_for(|stop| *stop).await.ok();
}

/// Handler recording every task it sees and raising `done` after
/// `expected` calls.
pub struct RecordingHandler {
    seen: Arc<Mutex<Vec<TaskId>>>,
    expected: usize,
    done: Arc<watch::Sender<bool>>,
}

impl RecordingHandler {
    /// Creates a handler that raises `done` once `expected` tasks ran.
    pub fn new(
        seen: Arc<Mutex<Vec<TaskId>>>,
        expected: usize,
        done: Arc<watch::Sender<bool>>,
    ) -> Self {
        Self {
            seen,
            expected,
            done,
        }
    }
}

#[async_trait]
impl TaskHandler for RecordingHandler {
    async fn handle(&self, task: &Task) -> Result<(), HandlerError> {
        let count = {
            let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
            seen.push(task.id());
            seen.len()
        };
        tokio::task::yield_now().await;
        if count >= self.expected {
            self.done.send_replace(true);
        }
        Ok(())
    }
}
