//! Attempt ceiling, retention windows, and derived sweep cutoffs.

use super::QueueDomainError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of claims a task may consume before it is considered dead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct MaxAttempts(u32);

impl MaxAttempts {
    /// Default ceiling.
    pub const DEFAULT: Self = Self(5);

    /// Creates a validated ceiling.
    ///
    /// # Errors
    ///
    /// Returns [`QueueDomainError::InvalidMaxAttempts`] when `value` is zero.
    pub const fn new(value: u32) -> Result<Self, QueueDomainError> {
        if value == 0 {
            return Err(QueueDomainError::InvalidMaxAttempts);
        }
        Ok(Self(value))
    }

    /// Returns the numeric ceiling.
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Returns `true` when `attempt_count` has not yet reached the ceiling.
    #[must_use]
    pub const fn allows(self, attempt_count: u32) -> bool {
        attempt_count < self.0
    }
}

impl Default for MaxAttempts {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u32> for MaxAttempts {
    type Error = QueueDomainError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MaxAttempts> for u32 {
    fn from(value: MaxAttempts) -> Self {
        value.0
    }
}

impl fmt::Display for MaxAttempts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Age thresholds after which terminal tasks are deleted.
///
/// Both windows are measured from `created_at`, not from the last status
/// change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    completed: Duration,
    failed: Duration,
}

impl RetentionPolicy {
    /// Creates a policy from explicit windows.
    #[must_use]
    pub const fn new(completed: Duration, failed: Duration) -> Self {
        Self { completed, failed }
    }

    /// Creates a policy from whole-day windows.
    #[must_use]
    pub fn from_days(completed_days: u32, failed_days: u32) -> Self {
        Self::new(
            Duration::days(i64::from(completed_days)),
            Duration::days(i64::from(failed_days)),
        )
    }

    /// Retention window for completed tasks.
    #[must_use]
    pub const fn completed(&self) -> Duration {
        self.completed
    }

    /// Retention window for dead tasks.
    #[must_use]
    pub const fn failed(&self) -> Duration {
        self.failed
    }

    /// Computes the deletion cutoffs relative to `now`.
    ///
    /// # Errors
    ///
    /// Returns [`QueueDomainError::WindowOutOfRange`] when a window reaches
    /// further back than `chrono` can represent.
    pub fn cutoffs(
        &self,
        now: DateTime<Utc>,
        max_attempts: MaxAttempts,
    ) -> Result<SweepCutoffs, QueueDomainError> {
        Ok(SweepCutoffs {
            completed_before: window_start(now, self.completed, "completed retention")?,
            failed_before: window_start(now, self.failed, "failed retention")?,
            max_attempts,
        })
    }
}

/// Returns `now - window`, or an error when the result is unrepresentable.
///
/// # Errors
///
/// Returns [`QueueDomainError::WindowOutOfRange`] naming `label` on overflow.
pub fn window_start(
    now: DateTime<Utc>,
    window: Duration,
    label: &'static str,
) -> Result<DateTime<Utc>, QueueDomainError> {
    now.checked_sub_signed(window)
        .ok_or(QueueDomainError::WindowOutOfRange { window: label, now })
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::from_days(7, 30)
    }
}

/// Concrete thresholds for one sweep pass.
///
/// Rows are deleted only when `created_at` is strictly earlier than the
/// relevant cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepCutoffs {
    /// Completed tasks created before this instant are deleted.
    pub completed_before: DateTime<Utc>,
    /// Dead tasks created before this instant are deleted.
    pub failed_before: DateTime<Utc>,
    /// Ceiling that distinguishes dead failures from retryable ones.
    pub max_attempts: MaxAttempts,
}

/// Policy fixed for the lifetime of a queue instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueuePolicy {
    max_attempts: MaxAttempts,
    retention: RetentionPolicy,
    processing_timeout: Option<Duration>,
}

impl QueuePolicy {
    /// Creates a policy without lease expiry.
    #[must_use]
    pub const fn new(max_attempts: MaxAttempts, retention: RetentionPolicy) -> Self {
        Self {
            max_attempts,
            retention,
            processing_timeout: None,
        }
    }

    /// Enables reclaiming `processing` tasks untouched for longer than
    /// `timeout`.
    #[must_use]
    pub const fn with_processing_timeout(mut self, timeout: Duration) -> Self {
        self.processing_timeout = Some(timeout);
        self
    }

    /// Attempt ceiling.
    #[must_use]
    pub const fn max_attempts(&self) -> MaxAttempts {
        self.max_attempts
    }

    /// Retention windows.
    #[must_use]
    pub const fn retention(&self) -> RetentionPolicy {
        self.retention
    }

    /// Lease expiry for claimed tasks, if enabled.
    #[must_use]
    pub const fn processing_timeout(&self) -> Option<Duration> {
        self.processing_timeout
    }
}
