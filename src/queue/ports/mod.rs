//! Port contracts for the task queue.
//!
//! Ports define infrastructure-agnostic interfaces used by queue services.

pub mod handler;
pub mod store;

pub use handler::{HandlerError, TaskHandler};
pub use store::{
    ClaimRequest, OutcomeRequest, ReclaimRequest, TaskStore, TaskStoreError, TaskStoreResult,
};
