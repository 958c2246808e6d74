//! Identifier and validated scalar types for the queue domain.

use super::QueueDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Store-assigned task identifier.
///
/// Identifiers are allocated from a monotonically increasing sequence, so
/// ordering by identifier is ordering by insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(i64);

impl TaskId {
    /// Wraps a persisted identifier value.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the underlying numeric value.
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }
}

impl From<i64> for TaskId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name of the handler that executes a task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskName(String);

impl TaskName {
    /// Longest name accepted by the `VARCHAR(255)` column.
    pub const MAX_LENGTH: usize = 255;

    /// Creates a validated task name.
    ///
    /// Surrounding whitespace is trimmed before validation.
    ///
    /// # Errors
    ///
    /// Returns [`QueueDomainError::EmptyTaskName`] when the trimmed value is
    /// empty or [`QueueDomainError::TaskNameTooLong`] when it exceeds
    /// [`Self::MAX_LENGTH`] characters.
    pub fn new(value: impl Into<String>) -> Result<Self, QueueDomainError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(QueueDomainError::EmptyTaskName);
        }
        let length = trimmed.chars().count();
        if length > Self::MAX_LENGTH {
            return Err(QueueDomainError::TaskNameTooLong(length));
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the name as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TaskName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name of the table backing a queue instance.
///
/// Restricted to plain identifiers so it can be interpolated into DDL and
/// queries as a quoted identifier without escaping surprises.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TableName(String);

impl TableName {
    /// Longest accepted name; leaves room for index suffixes under the
    /// 63-byte `PostgreSQL` identifier limit.
    pub const MAX_LENGTH: usize = 48;

    /// Default table name.
    pub const DEFAULT: &'static str = "tasks";

    /// Creates a validated table name.
    ///
    /// # Errors
    ///
    /// Returns [`QueueDomainError::InvalidTableName`] unless the value starts
    /// with an ASCII letter or underscore, continues with ASCII
    /// alphanumerics or underscores, and is at most [`Self::MAX_LENGTH`]
    /// bytes long.
    pub fn new(value: impl Into<String>) -> Result<Self, QueueDomainError> {
        let raw = value.into();
        let mut chars = raw.chars();
        let starts_well = chars
            .next()
            .is_some_and(|first| first.is_ascii_alphabetic() || first == '_');
        let continues_well = chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
        if !starts_well || !continues_well || raw.len() > Self::MAX_LENGTH {
            return Err(QueueDomainError::InvalidTableName(raw));
        }
        Ok(Self(raw))
    }

    /// Returns the table name as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the name wrapped in double quotes for SQL interpolation.
    #[must_use]
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }

    /// Returns a quoted derived identifier such as an index name.
    #[must_use]
    pub fn quoted_with_suffix(&self, suffix: &str) -> String {
        format!("\"{}_{suffix}\"", self.0)
    }
}

impl Default for TableName {
    fn default() -> Self {
        Self(Self::DEFAULT.to_owned())
    }
}

impl TryFrom<String> for TableName {
    type Error = QueueDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TableName> for String {
    fn from(value: TableName) -> Self {
        value.0
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
