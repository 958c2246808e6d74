//! Diesel row models for task persistence.
//!
//! The table name is chosen at runtime, so rows are read through
//! `sql_query` and mapped by name rather than through a static `table!`.

use chrono::{DateTime, Utc};
use diesel::QueryableByName;
use diesel::sql_types::{BigInt, Bool, Integer, Jsonb, Timestamptz, Varchar};
use serde_json::Value;

/// Query result row for task records.
#[derive(Debug, Clone, QueryableByName)]
pub struct TaskRow {
    /// Store-assigned identifier.
    #[diesel(sql_type = BigInt)]
    pub id: i64,
    /// Handler name.
    #[diesel(sql_type = Varchar)]
    pub task_name: String,
    /// JSON arguments.
    #[diesel(sql_type = Jsonb)]
    pub args: Value,
    /// Lifecycle status.
    #[diesel(sql_type = Varchar)]
    pub status: String,
    /// Claims consumed.
    #[diesel(sql_type = Integer)]
    pub count_attempts: i32,
    /// Creation timestamp.
    #[diesel(sql_type = Timestamptz)]
    pub created_at: DateTime<Utc>,
    /// Last transition timestamp.
    #[diesel(sql_type = Timestamptz)]
    pub updated_at: DateTime<Utc>,
}

/// Identifier of a locked claim candidate.
#[derive(Debug, Clone, Copy, QueryableByName)]
pub struct CandidateRow {
    /// Candidate identifier.
    #[diesel(sql_type = BigInt)]
    pub id: i64,
}

/// Aggregated row count for one status bucket.
#[derive(Debug, Clone, QueryableByName)]
pub struct StatusCountRow {
    /// Lifecycle status.
    #[diesel(sql_type = Varchar)]
    pub status: String,
    /// Whether the bucket holds failures at the attempt ceiling.
    #[diesel(sql_type = Bool)]
    pub dead: bool,
    /// Number of rows.
    #[diesel(sql_type = BigInt)]
    pub total: i64,
}
