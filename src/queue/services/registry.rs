//! Name-keyed lookup of task handlers.

use crate::queue::{
    domain::{QueueDomainError, TaskName},
    ports::TaskHandler,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Maps task names to the handlers that execute them.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<TaskName, Arc<dyn TaskHandler>>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `name`, returning the registry.
    ///
    /// A later registration for the same name replaces the earlier one.
    ///
    /// # Errors
    ///
    /// Returns [`QueueDomainError`] when `name` is not a valid task name.
    pub fn with_handler(
        mut self,
        name: impl Into<String>,
        handler: impl TaskHandler + 'static,
    ) -> Result<Self, QueueDomainError> {
        self.register(TaskName::new(name)?, Arc::new(handler));
        Ok(self)
    }

    /// Registers a shared handler, returning any handler it replaced.
    pub fn register(
        &mut self,
        name: TaskName,
        handler: Arc<dyn TaskHandler>,
    ) -> Option<Arc<dyn TaskHandler>> {
        self.handlers.insert(name, handler)
    }

    /// Looks up the handler for `name`.
    #[must_use]
    pub fn get(&self, name: &TaskName) -> Option<Arc<dyn TaskHandler>> {
        self.handlers.get(name).cloned()
    }

    /// Returns the registered names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(TaskName::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.names())
            .finish()
    }
}
