//! Handler port: the embedding application's executable for a task name.

use crate::queue::domain::Task;
use async_trait::async_trait;

/// Error returned by a failing handler.
///
/// The queue never inspects it beyond logging; any error counts as a failed
/// attempt.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Executes the work described by a claimed task.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// Runs the task.
    ///
    /// Implementations decode the payload shape they expect with
    /// [`crate::queue::domain::TaskPayload::decode`].
    ///
    /// # Errors
    ///
    /// Any error marks the attempt as failed.
    async fn handle(&self, task: &Task) -> Result<(), HandlerError>;
}
