//! Application services for queue orchestration.

mod consumer;
mod queue;
mod registry;
mod sweeper;

pub use consumer::{Consumer, ConsumerSummary, PollOutcome};
pub use queue::{TaskQueueError, TaskQueueResult, TaskQueueService};
pub use registry::HandlerRegistry;
pub use sweeper::{SweepPass, Sweeper};
