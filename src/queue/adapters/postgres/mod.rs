//! `PostgreSQL` adapters for task queue persistence.

mod models;
mod pool;
mod sql;
mod store;

pub use pool::{TaskPgPool, build_pool};
pub use store::PostgresTaskStore;
