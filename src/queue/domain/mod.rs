//! Domain model for the task queue.
//!
//! The domain owns the task aggregate, its status transitions, and the
//! eligibility and retention predicates. Storage adapters either call these
//! predicates directly or reproduce them verbatim in SQL.

mod error;
mod ids;
mod payload;
mod policy;
mod task;

pub use error::{ParseTaskStatusError, QueueDomainError};
pub use ids::{TableName, TaskId, TaskName};
pub use payload::TaskPayload;
pub use policy::{MaxAttempts, QueuePolicy, RetentionPolicy, SweepCutoffs, window_start};
pub use task::{
    NewTask, PersistedTaskData, QueueStats, SweepReport, Task, TaskOutcome, TaskStatus,
};
