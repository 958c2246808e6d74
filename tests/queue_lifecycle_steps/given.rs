//! Given steps for queue lifecycle BDD scenarios.

use super::world::QueueWorld;
use corvee::queue::domain::{MaxAttempts, QueuePolicy, RetentionPolicy};
use rstest_bdd_macros::given;

#[given("a queue allowing {max_attempts:u32} attempts")]
fn queue_allowing_attempts(
    world: &mut QueueWorld,
    max_attempts: u32,
) -> Result<(), eyre::Report> {
    let policy = QueuePolicy::new(MaxAttempts::new(max_attempts)?, RetentionPolicy::default());
    world.reset_queue(policy);
    Ok(())
}
