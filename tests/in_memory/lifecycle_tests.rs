//! End-to-end task lifecycle through the public queue API.

use super::helpers::{clock, queue_with_clock};
use crate::test_helpers::FixedClock;
use async_trait::async_trait;
use chrono::Duration;
use corvee::queue::{
    domain::{Task, TaskOutcome, TaskStatus},
    ports::{HandlerError, TaskHandler},
    services::{Consumer, HandlerRegistry, PollOutcome},
};
use rstest::rstest;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct AddArgs {
    a: i64,
    b: i64,
}

struct AddHandler;

#[async_trait]
impl TaskHandler for AddHandler {
    async fn handle(&self, task: &Task) -> Result<(), HandlerError> {
        let args: AddArgs = task.payload().decode()?;
        args.a.checked_add(args.b).ok_or("overflow")?;
        Ok(())
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn add_task_runs_completes_and_is_swept(clock: FixedClock) -> eyre::Result<()> {
    let queue = queue_with_clock(&clock);
    let id = queue.enqueue("add", &json!({"a": 1, "b": 2})).await?;

    let claimed = queue.claim().await?.ok_or_else(|| eyre::eyre!("expected claim"))?;
    assert_eq!(claimed.id(), id);
    assert_eq!(claimed.attempt_count(), 1);
    assert_eq!(claimed.status(), TaskStatus::Processing);

    queue.report_outcome(id, TaskOutcome::Completed).await?;
    assert!(queue.claim().await?.is_none());

    clock.advance(Duration::days(7));
    assert_eq!(queue.sweep().await?.total(), 0);
    clock.advance(Duration::seconds(1));
    assert_eq!(queue.sweep().await?.completed_deleted, 1);
    assert!(queue.find(id).await?.is_none());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn consumer_executes_registered_handler(clock: FixedClock) -> eyre::Result<()> {
    let queue = queue_with_clock(&clock);
    let good = queue.enqueue("add", &json!({"a": 1, "b": 2})).await?;
    let bad = queue.enqueue("add", &json!({"a": "one"})).await?;
    let handlers = HandlerRegistry::new().with_handler("add", AddHandler)?;
    let consumer = Consumer::new(queue.clone(), handlers);

    assert_eq!(
        consumer.poll_once().await?,
        PollOutcome::Processed {
            task_id: good,
            outcome: TaskOutcome::Completed,
        }
    );
    assert_eq!(
        consumer.poll_once().await?,
        PollOutcome::Processed {
            task_id: bad,
            outcome: TaskOutcome::Failed,
        }
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failing_task_dies_at_the_ceiling(clock: FixedClock) -> eyre::Result<()> {
    let queue = queue_with_clock(&clock);
    let id = queue.enqueue("add", &json!("not an object")).await?;
    let handlers = HandlerRegistry::new().with_handler("add", AddHandler)?;
    let consumer = Consumer::new(queue.clone(), handlers);

    for _ in 0..3 {
        assert!(matches!(
            consumer.poll_once().await?,
            PollOutcome::Processed {
                outcome: TaskOutcome::Failed,
                ..
            }
        ));
    }
    assert_eq!(consumer.poll_once().await?, PollOutcome::Idle);

    let dead = queue.find(id).await?.ok_or_else(|| eyre::eyre!("dead task missing"))?;
    assert_eq!(dead.status(), TaskStatus::Failed);
    assert_eq!(dead.attempt_count(), 3);

    clock.advance(Duration::days(30) + Duration::seconds(1));
    assert_eq!(queue.sweep().await?.dead_deleted, 1);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn retryable_failure_is_claimed_again(clock: FixedClock) -> eyre::Result<()> {
    let queue = queue_with_clock(&clock);
    let id = queue.enqueue("add", &json!({"a": 2, "b": 2})).await?;

    queue.claim().await?;
    queue.report_outcome(id, TaskOutcome::Failed).await?;
    clock.advance(Duration::days(45));
    assert_eq!(queue.sweep().await?.total(), 0);

    let retried = queue.claim().await?.ok_or_else(|| eyre::eyre!("expected retry"))?;
    assert_eq!(retried.id(), id);
    assert_eq!(retried.attempt_count(), 2);
    Ok(())
}
