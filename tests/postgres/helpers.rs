//! Shared test helpers for `PostgreSQL` integration tests.

pub use super::cluster::{BoxError, PostgresCluster, postgres_cluster};
use crate::test_helpers::{FixedClock, epoch};
use corvee::config::DatabaseConfig;
use corvee::queue::{
    adapters::postgres::{PostgresTaskStore, TaskPgPool, build_pool},
    domain::{QueuePolicy, TableName},
    services::TaskQueueService,
};
use diesel::RunQueryDsl;
use std::sync::Arc;
use uuid::Uuid;

/// Queue type used by `PostgreSQL` integration tests.
pub type PgQueue = TaskQueueService<PostgresTaskStore, FixedClock>;

/// A queue over a private table that is dropped with the harness.
pub struct PgHarness {
    pub queue: PgQueue,
    pub clock: FixedClock,
    pub pool: TaskPgPool,
    pub table: TableName,
}

impl PgHarness {
    /// Connects to `cluster` and creates a fresh table.
    ///
    /// # Errors
    ///
    /// Returns an error when the database is unreachable or schema creation
    /// fails.
    pub async fn connect(cluster: PostgresCluster, policy: QueuePolicy) -> Result<Self, BoxError> {
        let database = DatabaseConfig {
            url: Some(cluster.database_url()),
            pool_size: 12,
            ..DatabaseConfig::default()
        };
        let pool = build_pool(&database)?;
        let table = TableName::new(format!("corvee_test_{}", Uuid::new_v4().simple()))?;
        let clock = FixedClock::at(epoch());
        let store = PostgresTaskStore::new(pool.clone(), table.clone());
        let queue = TaskQueueService::new(Arc::new(store), Arc::new(clock.clone()), policy);
        queue.initialize().await?;
        Ok(Self {
            queue,
            clock,
            pool,
            table,
        })
    }

    /// Runs a raw statement against the harness table.
    ///
    /// `{table}` in `statement` is replaced with the quoted table name.
    ///
    /// # Errors
    ///
    /// Returns an error when the statement fails.
    pub async fn execute(&self, statement: &str) -> Result<usize, BoxError> {
        let pool = self.pool.clone();
        let sql = statement.replace("{table}", &self.table.quoted());
        tokio::task::spawn_blocking(move || -> Result<usize, BoxError> {
            let mut connection = pool.get()?;
            Ok(diesel::sql_query(sql).execute(&mut *connection)?)
        })
        .await?
    }
}

impl Drop for PgHarness {
    fn drop(&mut self) {
        let Ok(mut connection) = self.pool.get() else {
            return;
        };
        let statement = format!("DROP TABLE IF EXISTS {}", self.table.quoted());
        if let Err(err) = diesel::sql_query(statement).execute(&mut *connection) {
            tracing::warn!(table = %self.table, error = %err, "failed to drop test table");
        }
    }
}
