//! Periodic retention sweeper.

use super::{TaskQueueResult, TaskQueueService};
use crate::queue::{domain::SweepReport, ports::TaskStore};
use mockable::Clock;
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::info;

/// Result of one sweeper pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepPass {
    /// Stale claims released back to `failed`.
    pub reclaimed: u64,
    /// Rows deleted by the retention sweep.
    pub report: SweepReport,
}

/// Runs retention sweeps on a fixed schedule, independent of claim traffic.
pub struct Sweeper<S, C>
where
    S: TaskStore,
    C: Clock + Send + Sync,
{
    queue: TaskQueueService<S, C>,
    interval: Duration,
}

impl<S, C> Sweeper<S, C>
where
    S: TaskStore,
    C: Clock + Send + Sync,
{
    /// Creates a sweeper running every `interval`.
    ///
    /// Intervals shorter than one millisecond are raised to one millisecond.
    #[must_use]
    pub fn new(queue: TaskQueueService<S, C>, interval: Duration) -> Self {
        Self {
            queue,
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    /// Releases stale claims (when a processing timeout is configured), then
    /// deletes expired terminal tasks.
    ///
    /// # Errors
    ///
    /// Returns the first store or window error; each step is its own
    /// transaction, so a failed sweep leaves earlier releases committed and
    /// deletes nothing.
    pub async fn sweep_once(&self) -> TaskQueueResult<SweepPass> {
        let reclaimed = self.queue.reclaim_stale().await?;
        let report = self.queue.sweep().await?;
        Ok(SweepPass { reclaimed, report })
    }

    /// Sweeps immediately and then every interval until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns the first error from [`Self::sweep_once`].
    pub async fn run<F>(&self, shutdown: F) -> TaskQueueResult<u64>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut passes = 0_u64;
        info!(interval = ?self.interval, "sweeper started");
        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => break,
                _ = ticker.tick() => {}
            }
            self.sweep_once().await?;
            passes += 1;
        }
        info!(passes, "sweeper stopped");
        Ok(passes)
    }
}
