//! Retention sweep and stale claim tests against `PostgreSQL`.

use super::helpers::{BoxError, PgHarness, PostgresCluster, postgres_cluster};
use crate::test_helpers::epoch;
use chrono::Duration;
use corvee::queue::{
    domain::{MaxAttempts, QueuePolicy, RetentionPolicy, TaskOutcome, TaskStatus},
    services::Sweeper,
};
use rstest::rstest;
use serde_json::json;

fn three_attempts() -> QueuePolicy {
    QueuePolicy::new(
        MaxAttempts::new(3).unwrap_or_default(),
        RetentionPolicy::default(),
    )
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn completed_rows_are_swept_one_second_past_the_window(
    postgres_cluster: PostgresCluster,
) -> Result<(), BoxError> {
    let harness = PgHarness::connect(postgres_cluster, QueuePolicy::default()).await?;
    let now = epoch();
    let window = Duration::days(7);
    let mut ids = Vec::new();
    for offset in [-1, 1] {
        harness.clock.set(now - window + Duration::seconds(offset));
        let id = harness.queue.enqueue("add", &json!({"a": 1, "b": 2})).await?;
        harness.queue.claim().await?;
        harness.queue.report_outcome(id, TaskOutcome::Completed).await?;
        ids.push(id);
    }

    harness.clock.set(now);
    let report = harness.queue.sweep().await?;
    assert_eq!(report.completed_deleted, 1);
    assert_eq!(report.dead_deleted, 0);

    let [expired, fresh] = ids.as_slice() else {
        return Err("expected two tasks".into());
    };
    assert!(harness.queue.find(*expired).await?.is_none());
    assert!(harness.queue.find(*fresh).await?.is_some());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn only_dead_failures_are_swept(postgres_cluster: PostgresCluster) -> Result<(), BoxError> {
    let harness = PgHarness::connect(postgres_cluster, three_attempts()).await?;
    harness.clock.set(epoch() - Duration::days(31));
    let dead = harness.queue.enqueue("flaky", &json!({})).await?;
    for _ in 0..3 {
        harness.queue.claim().await?;
        harness.queue.report_outcome(dead, TaskOutcome::Failed).await?;
    }
    let retryable = harness.queue.enqueue("flaky", &json!({})).await?;
    harness.queue.claim().await?;
    harness.queue.report_outcome(retryable, TaskOutcome::Failed).await?;
    let pending = harness.queue.enqueue("add", &json!({})).await?;

    harness.clock.set(epoch());
    let report = harness.queue.sweep().await?;
    assert_eq!(report.dead_deleted, 1);
    assert_eq!(report.completed_deleted, 0);
    assert!(harness.queue.find(dead).await?.is_none());
    assert!(harness.queue.find(retryable).await?.is_some());
    assert!(harness.queue.find(pending).await?.is_some());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn sweeper_releases_stale_claims_for_retry(
    postgres_cluster: PostgresCluster,
) -> Result<(), BoxError> {
    let policy = three_attempts().with_processing_timeout(Duration::minutes(15));
    let harness = PgHarness::connect(postgres_cluster, policy).await?;
    let id = harness.queue.enqueue("add", &json!([])).await?;
    harness.queue.claim().await?;

    harness.clock.advance(Duration::minutes(16));
    let sweeper = Sweeper::new(harness.queue.clone(), std::time::Duration::from_secs(60));
    let pass = sweeper.sweep_once().await?;
    assert_eq!(pass.reclaimed, 1);

    let released = harness.queue.find(id).await?.ok_or("task missing")?;
    assert_eq!(released.status(), TaskStatus::Failed);
    assert_eq!(released.attempt_count(), 1);

    let retried = harness.queue.claim().await?.ok_or("expected retry")?;
    assert_eq!(retried.attempt_count(), 2);
    Ok(())
}
