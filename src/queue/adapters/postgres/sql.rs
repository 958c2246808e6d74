//! SQL statements rendered for a configured table name.

use crate::queue::domain::{TableName, TaskStatus};

const COLUMNS: &str = "id, task_name, args, status, count_attempts, created_at, updated_at";

/// Statements used by [`super::PostgresTaskStore`], rendered once per store.
#[derive(Debug, Clone)]
pub(super) struct TaskSql {
    pub schema_lock: String,
    pub create_table: String,
    pub insert: String,
    pub select_candidate: String,
    pub claim: String,
    pub record_outcome: String,
    pub find_by_id: String,
    pub delete_completed: String,
    pub delete_dead: String,
    pub reclaim_stale: String,
    pub stats: String,
}

impl TaskSql {
    pub(super) fn new(table_name: &TableName) -> Self {
        let table = table_name.quoted();
        let pending = TaskStatus::Pending.as_str();
        let processing = TaskStatus::Processing.as_str();
        let failed = TaskStatus::Failed.as_str();
        let completed = TaskStatus::Completed.as_str();

        let create_table = format!(
            "CREATE TABLE IF NOT EXISTS {table} (\
                id BIGSERIAL PRIMARY KEY, \
                task_name VARCHAR(255) NOT NULL, \
                args JSONB NOT NULL, \
                status VARCHAR(16) NOT NULL DEFAULT '{pending}', \
                count_attempts INTEGER NOT NULL DEFAULT 0, \
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(), \
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(), \
                CONSTRAINT {status_check} CHECK (status IN \
                    ('{pending}', '{processing}', '{failed}', '{completed}')), \
                CONSTRAINT {attempts_check} CHECK (count_attempts >= 0)\
            );\
            CREATE INDEX IF NOT EXISTS {status_index} ON {table} (status, id);\
            CREATE INDEX IF NOT EXISTS {age_index} ON {table} (status, created_at);",
            status_check = table_name.quoted_with_suffix("status_check"),
            attempts_check = table_name.quoted_with_suffix("attempts_check"),
            status_index = table_name.quoted_with_suffix("status_idx"),
            age_index = table_name.quoted_with_suffix("status_created_idx"),
        );

        Self {
            schema_lock: "SELECT pg_advisory_xact_lock(hashtext($1))".to_owned(),
            create_table,
            insert: format!(
                "INSERT INTO {table} (task_name, args, status, count_attempts, created_at, \
                 updated_at) VALUES ($1, $2, '{pending}', 0, $3, $3) RETURNING {COLUMNS}"
            ),
            select_candidate: format!(
                "SELECT id FROM {table} \
                 WHERE status = '{pending}' OR (status = '{failed}' AND count_attempts < $1) \
                 ORDER BY id LIMIT 1 FOR UPDATE SKIP LOCKED"
            ),
            claim: format!(
                "UPDATE {table} SET status = '{processing}', \
                 count_attempts = count_attempts + 1, updated_at = $2 \
                 WHERE id = $1 RETURNING {COLUMNS}"
            ),
            record_outcome: format!(
                "UPDATE {table} SET status = $2, updated_at = $3 \
                 WHERE id = $1 AND status = '{processing}' RETURNING {COLUMNS}"
            ),
            find_by_id: format!("SELECT {COLUMNS} FROM {table} WHERE id = $1"),
            delete_completed: format!(
                "DELETE FROM {table} WHERE status = '{completed}' AND created_at < $1"
            ),
            delete_dead: format!(
                "DELETE FROM {table} \
                 WHERE status = '{failed}' AND count_attempts >= $1 AND created_at < $2"
            ),
            reclaim_stale: format!(
                "UPDATE {table} SET status = '{failed}', updated_at = $2 \
                 WHERE status = '{processing}' AND updated_at < $1"
            ),
            stats: format!(
                "SELECT status, (status = '{failed}' AND count_attempts >= $1) AS dead, \
                 COUNT(*) AS total FROM {table} GROUP BY 1, 2"
            ),
        }
    }
}
