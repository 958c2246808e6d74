//! Built-in arithmetic handlers registered by `corvee work`.
//!
//! Both accept either a JSON array of integers (`[1, 2, 3]`) or an object
//! whose values are integers (`{"a": 1, "b": 2}`). The result is logged and
//! discarded.

use async_trait::async_trait;
use corvee::queue::{
    domain::{QueueDomainError, Task},
    ports::{HandlerError, TaskHandler},
    services::HandlerRegistry,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use tracing::info;

/// Arithmetic operation applied across all operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Sum of the operands; zero when empty.
    Add,
    /// Product of the operands; one when empty.
    Multiply,
}

impl Operation {
    const fn name(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Multiply => "multiply",
        }
    }

    fn apply(self, operands: &[i64]) -> Result<i64, ArithmeticError> {
        let (identity, step): (i64, fn(i64, i64) -> Option<i64>) = match self {
            Self::Add => (0, i64::checked_add),
            Self::Multiply => (1, i64::checked_mul),
        };
        operands
            .iter()
            .try_fold(identity, |acc, operand| step(acc, *operand))
            .ok_or(ArithmeticError::Overflow(self))
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Failures raised while evaluating an arithmetic task.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArithmeticError {
    /// The result does not fit in a signed 64-bit integer.
    #[error("{0} overflowed")]
    Overflow(Operation),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Operands {
    List(Vec<i64>),
    Named(BTreeMap<String, i64>),
}

impl Operands {
    fn into_values(self) -> Vec<i64> {
        match self {
            Self::List(values) => values,
            Self::Named(values) => values.into_values().collect(),
        }
    }
}

/// Handler evaluating one [`Operation`] over a task's payload.
#[derive(Debug, Clone, Copy)]
pub struct ArithmeticHandler {
    operation: Operation,
}

impl ArithmeticHandler {
    /// Creates a handler for `operation`.
    pub const fn new(operation: Operation) -> Self {
        Self { operation }
    }

    /// Decodes the payload and evaluates the operation.
    pub fn evaluate(&self, task: &Task) -> Result<i64, HandlerError> {
        let operands: Operands = task.payload().decode()?;
        Ok(self.operation.apply(&operands.into_values())?)
    }
}

#[async_trait]
impl TaskHandler for ArithmeticHandler {
    async fn handle(&self, task: &Task) -> Result<(), HandlerError> {
        let result = self.evaluate(task)?;
        info!(
            task_id = %task.id(),
            operation = %self.operation,
            result,
            "arithmetic task finished"
        );
        Ok(())
    }
}

/// Builds the registry used by `corvee work`.
pub fn builtin_registry() -> Result<HandlerRegistry, QueueDomainError> {
    [Operation::Add, Operation::Multiply]
        .into_iter()
        .try_fold(HandlerRegistry::new(), |registry, operation| {
            registry.with_handler(operation.name(), ArithmeticHandler::new(operation))
        })
}
