//! Connection pool construction.

use crate::config::DatabaseConfig;
use crate::queue::ports::{TaskStoreError, TaskStoreResult};
use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};

/// `PostgreSQL` connection pool type used by queue adapters.
pub type TaskPgPool = Pool<ConnectionManager<PgConnection>>;

/// Builds a pool for the configured database.
///
/// The pool opens its first connections eagerly, so an unreachable server
/// is reported here rather than on the first queue operation.
///
/// # Errors
///
/// Returns [`TaskStoreError::Unavailable`] when no connection can be
/// established.
pub fn build_pool(database: &DatabaseConfig) -> TaskStoreResult<TaskPgPool> {
    let manager = ConnectionManager::<PgConnection>::new(database.connection_string());
    Pool::builder()
        .max_size(database.pool_size.max(1))
        .build(manager)
        .map_err(TaskStoreError::unavailable)
}
