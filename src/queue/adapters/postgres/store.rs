//! `PostgreSQL` task store.
//!
//! Claims rely on `SELECT ... FOR UPDATE SKIP LOCKED` inside a transaction:
//! the candidate row stays exclusively locked until the claim update
//! commits, and competing claimants step over it to the next eligible row
//! instead of queueing behind the lock.

use super::{
    TaskPgPool,
    models::{CandidateRow, StatusCountRow, TaskRow},
    sql::TaskSql,
};
use crate::queue::{
    domain::{
        MaxAttempts, NewTask, PersistedTaskData, QueueStats, SweepCutoffs, SweepReport,
        TableName, Task, TaskId, TaskName, TaskPayload, TaskStatus,
    },
    ports::{
        ClaimRequest, OutcomeRequest, ReclaimRequest, TaskStore, TaskStoreError, TaskStoreResult,
    },
};
use async_trait::async_trait;
use diesel::connection::SimpleConnection;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sql_types::{BigInt, Integer, Jsonb, Text, Timestamptz, Varchar};
use std::sync::Arc;

/// `PostgreSQL`-backed task store.
#[derive(Debug, Clone)]
pub struct PostgresTaskStore {
    pool: TaskPgPool,
    table: TableName,
    sql: Arc<TaskSql>,
}

impl PostgresTaskStore {
    /// Creates a store for `table` from a `PostgreSQL` connection pool.
    #[must_use]
    pub fn new(pool: TaskPgPool, table: TableName) -> Self {
        let sql = Arc::new(TaskSql::new(&table));
        Self { pool, table, sql }
    }

    /// Returns the backing table name.
    #[must_use]
    pub const fn table(&self) -> &TableName {
        &self.table
    }

    async fn run_blocking<F, T>(&self, f: F) -> TaskStoreResult<T>
    where
        F: FnOnce(&mut PgConnection, &TaskSql) -> TaskStoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        let sql = Arc::clone(&self.sql);
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(TaskStoreError::unavailable)?;
            f(&mut connection, &sql)
        })
        .await
        .map_err(TaskStoreError::persistence)?
    }
}

impl From<DieselError> for TaskStoreError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _)
            | DieselError::BrokenTransactionManager => Self::unavailable(err),
            _ => Self::persistence(err),
        }
    }
}

#[async_trait]
impl TaskStore for PostgresTaskStore {
    async fn ensure_schema(&self) -> TaskStoreResult<()> {
        let table = self.table.as_str().to_owned();
        self.run_blocking(move |connection, sql| {
            connection.transaction::<_, TaskStoreError, _>(|tx| {
                // Serializes first-time creation across processes; concurrent
                // CREATE TABLE IF NOT EXISTS can otherwise collide on the
                // catalog's unique indexes.
                diesel::sql_query(&sql.schema_lock)
                    .bind::<Text, _>(table.as_str())
                    .execute(tx)?;
                tx.batch_execute(&sql.create_table)?;
                Ok(())
            })
        })
        .await
    }

    async fn insert(&self, task: &NewTask) -> TaskStoreResult<Task> {
        let name = task.name().as_str().to_owned();
        let args = task.payload().as_value().clone();
        let created_at = task.created_at();
        self.run_blocking(move |connection, sql| {
            let row = diesel::sql_query(&sql.insert)
                .bind::<Varchar, _>(name)
                .bind::<Jsonb, _>(args)
                .bind::<Timestamptz, _>(created_at)
                .get_result::<TaskRow>(connection)?;
            row_to_task(row)
        })
        .await
    }

    async fn claim_next(&self, request: ClaimRequest) -> TaskStoreResult<Option<Task>> {
        let max_attempts = attempts_to_sql(request.max_attempts)?;
        self.run_blocking(move |connection, sql| {
            connection.transaction::<_, TaskStoreError, _>(|tx| {
                let candidate = diesel::sql_query(&sql.select_candidate)
                    .bind::<Integer, _>(max_attempts)
                    .get_result::<CandidateRow>(tx)
                    .optional()?;
                let Some(CandidateRow { id }) = candidate else {
                    return Ok(None);
                };
                let row = diesel::sql_query(&sql.claim)
                    .bind::<BigInt, _>(id)
                    .bind::<Timestamptz, _>(request.claimed_at)
                    .get_result::<TaskRow>(tx)?;
                row_to_task(row).map(Some)
            })
        })
        .await
    }

    async fn record_outcome(&self, request: OutcomeRequest) -> TaskStoreResult<Task> {
        let target = request.outcome.status();
        self.run_blocking(move |connection, sql| {
            connection.transaction::<_, TaskStoreError, _>(|tx| {
                let updated = diesel::sql_query(&sql.record_outcome)
                    .bind::<BigInt, _>(request.task_id.value())
                    .bind::<Varchar, _>(target.as_str())
                    .bind::<Timestamptz, _>(request.recorded_at)
                    .get_result::<TaskRow>(tx)
                    .optional()?;
                if let Some(row) = updated {
                    return row_to_task(row);
                }

                let existing = find_row(tx, sql, request.task_id)?
                    .ok_or(TaskStoreError::NotFound(request.task_id))?;
                let task = row_to_task(existing)?;
                if task.status() == target {
                    return Ok(task);
                }
                Err(TaskStoreError::InvalidTransition {
                    task_id: task.id(),
                    from: task.status(),
                    to: target,
                })
            })
        })
        .await
    }

    async fn sweep(&self, cutoffs: SweepCutoffs) -> TaskStoreResult<SweepReport> {
        let max_attempts = attempts_to_sql(cutoffs.max_attempts)?;
        self.run_blocking(move |connection, sql| {
            connection.transaction::<_, TaskStoreError, _>(|tx| {
                let completed_deleted = diesel::sql_query(&sql.delete_completed)
                    .bind::<Timestamptz, _>(cutoffs.completed_before)
                    .execute(tx)?;
                let dead_deleted = diesel::sql_query(&sql.delete_dead)
                    .bind::<Integer, _>(max_attempts)
                    .bind::<Timestamptz, _>(cutoffs.failed_before)
                    .execute(tx)?;
                Ok(SweepReport {
                    completed_deleted: row_count(completed_deleted),
                    dead_deleted: row_count(dead_deleted),
                })
            })
        })
        .await
    }

    async fn reclaim_stale(&self, request: ReclaimRequest) -> TaskStoreResult<u64> {
        self.run_blocking(move |connection, sql| {
            let released = diesel::sql_query(&sql.reclaim_stale)
                .bind::<Timestamptz, _>(request.stale_before)
                .bind::<Timestamptz, _>(request.reclaimed_at)
                .execute(connection)?;
            Ok(row_count(released))
        })
        .await
    }

    async fn find_by_id(&self, id: TaskId) -> TaskStoreResult<Option<Task>> {
        self.run_blocking(move |connection, sql| {
            find_row(connection, sql, id)?.map(row_to_task).transpose()
        })
        .await
    }

    async fn stats(&self, max_attempts: MaxAttempts) -> TaskStoreResult<QueueStats> {
        let ceiling = attempts_to_sql(max_attempts)?;
        self.run_blocking(move |connection, sql| {
            let rows = diesel::sql_query(&sql.stats)
                .bind::<Integer, _>(ceiling)
                .load::<StatusCountRow>(connection)?;
            let mut stats = QueueStats::default();
            for row in rows {
                let status = TaskStatus::try_from(row.status.as_str())
                    .map_err(TaskStoreError::persistence)?;
                let total = u64::try_from(row.total).map_err(TaskStoreError::persistence)?;
                let bucket = match status {
                    TaskStatus::Pending => &mut stats.pending,
                    TaskStatus::Processing => &mut stats.processing,
                    TaskStatus::Failed if row.dead => &mut stats.dead,
                    TaskStatus::Failed => &mut stats.retryable,
                    TaskStatus::Completed => &mut stats.completed,
                };
                *bucket += total;
            }
            Ok(stats)
        })
        .await
    }
}

fn find_row(
    connection: &mut PgConnection,
    sql: &TaskSql,
    id: TaskId,
) -> TaskStoreResult<Option<TaskRow>> {
    diesel::sql_query(&sql.find_by_id)
        .bind::<BigInt, _>(id.value())
        .get_result::<TaskRow>(connection)
        .optional()
        .map_err(TaskStoreError::from)
}

fn attempts_to_sql(max_attempts: MaxAttempts) -> TaskStoreResult<i32> {
    i32::try_from(max_attempts.value()).map_err(TaskStoreError::persistence)
}

fn row_count(affected: usize) -> u64 {
    u64::try_from(affected).unwrap_or(u64::MAX)
}

fn row_to_task(row: TaskRow) -> TaskStoreResult<Task> {
    let TaskRow {
        id,
        task_name,
        args,
        status: persisted_status,
        count_attempts,
        created_at,
        updated_at,
    } = row;

    let name = TaskName::new(task_name).map_err(TaskStoreError::persistence)?;
    let status =
        TaskStatus::try_from(persisted_status.as_str()).map_err(TaskStoreError::persistence)?;
    let attempt_count = u32::try_from(count_attempts).map_err(TaskStoreError::persistence)?;

    let data = PersistedTaskData {
        id: TaskId::new(id),
        name,
        payload: TaskPayload::new(args),
        status,
        attempt_count,
        created_at,
        updated_at,
    };
    Ok(Task::from_persisted(data))
}
