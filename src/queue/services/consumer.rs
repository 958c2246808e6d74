//! Blocking-poll consumer loop.
//!
//! Each iteration claims at most one task, runs its handler, and reports the
//! outcome before the next claim. When nothing is eligible the consumer
//! sleeps for the poll interval. No state is shared between consumers; all
//! coordination happens in the store's claim transaction.

use super::{HandlerRegistry, TaskQueueResult, TaskQueueService};
use crate::queue::{
    domain::{Task, TaskId, TaskOutcome},
    ports::TaskStore,
};
use mockable::Clock;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Result of one poll iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// No eligible task was available.
    Idle,
    /// A task was claimed, executed, and its outcome recorded.
    Processed {
        /// Task that was processed.
        task_id: TaskId,
        /// Outcome that was recorded.
        outcome: TaskOutcome,
    },
}

/// Totals accumulated by [`Consumer::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConsumerSummary {
    /// Tasks recorded as completed.
    pub completed: u64,
    /// Tasks recorded as failed.
    pub failed: u64,
}

/// A competing consumer.
pub struct Consumer<S, C>
where
    S: TaskStore,
    C: Clock + Send + Sync,
{
    id: Uuid,
    queue: TaskQueueService<S, C>,
    handlers: HandlerRegistry,
    poll_interval: Duration,
}

impl<S, C> Consumer<S, C>
where
    S: TaskStore,
    C: Clock + Send + Sync,
{
    /// Default sleep between polls of an empty queue.
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

    /// Creates a consumer dispatching to `handlers`.
    #[must_use]
    pub fn new(queue: TaskQueueService<S, C>, handlers: HandlerRegistry) -> Self {
        Self {
            id: Uuid::new_v4(),
            queue,
            handlers,
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
        }
    }

    /// Overrides the idle poll interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Identifier used in this consumer's log events.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Claims and processes at most one task.
    ///
    /// # Errors
    ///
    /// Returns store errors from the claim or the outcome write. Handler
    /// errors are not errors here; they are recorded as failed attempts.
    pub async fn poll_once(&self) -> TaskQueueResult<PollOutcome> {
        let Some(task) = self.queue.claim().await? else {
            return Ok(PollOutcome::Idle);
        };
        let outcome = self.execute(&task).await;
        self.queue.report_outcome(task.id(), outcome).await?;
        Ok(PollOutcome::Processed {
            task_id: task.id(),
            outcome,
        })
    }

    /// Polls until `shutdown` resolves.
    ///
    /// Shutdown is observed between iterations and while sleeping, never in
    /// the middle of a claimed task, so a stopping consumer always reports
    /// the outcome of the task it holds.
    ///
    /// # Errors
    ///
    /// Returns the first store error encountered; retrying is left to the
    /// caller.
    #[tracing::instrument(name = "consumer", skip_all, fields(consumer_id = %self.id))]
    pub async fn run<F>(&self, shutdown: F) -> TaskQueueResult<ConsumerSummary>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut summary = ConsumerSummary::default();
        info!(handlers = ?self.handlers.names(), "consumer started");
        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => break,
                () = std::future::ready(()) => {}
            }

            match self.poll_once().await? {
                PollOutcome::Processed { outcome, .. } => match outcome {
                    TaskOutcome::Completed => summary.completed += 1,
                    TaskOutcome::Failed => summary.failed += 1,
                },
                PollOutcome::Idle => {
                    tokio::select! {
                        () = &mut shutdown => break,
                        () = tokio::time::sleep(self.poll_interval) => {}
                    }
                }
            }
        }
        info!(
            completed = summary.completed,
            failed = summary.failed,
            "consumer stopped"
        );
        Ok(summary)
    }

    async fn execute(&self, task: &Task) -> TaskOutcome {
        let Some(handler) = self.handlers.get(task.name()) else {
            warn!(
                task_id = %task.id(),
                task_name = %task.name(),
                "no handler registered for task"
            );
            return TaskOutcome::Failed;
        };
        match handler.handle(task).await {
            Ok(()) => {
                debug!(task_id = %task.id(), "handler succeeded");
                TaskOutcome::Completed
            }
            Err(err) => {
                warn!(
                    task_id = %task.id(),
                    task_name = %task.name(),
                    attempt = task.attempt_count(),
                    error = %err,
                    "handler failed"
                );
                TaskOutcome::Failed
            }
        }
    }
}
