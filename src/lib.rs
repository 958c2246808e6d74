//! Corvee: a durable task queue on `PostgreSQL`.
//!
//! Producers enqueue named tasks carrying JSON arguments; any number of
//! consumer processes claim them with `FOR UPDATE SKIP LOCKED`, execute the
//! matching handler, and record the outcome. A periodic sweeper deletes
//! finished tasks once their retention window has elapsed.
//!
//! # Architecture
//!
//! The queue follows hexagonal architecture principles:
//!
//! - **Domain**: task records, status transitions, and queue policy
//! - **Ports**: the [`queue::ports::TaskStore`] and
//!   [`queue::ports::TaskHandler`] seams
//! - **Adapters**: `PostgreSQL` and in-memory stores
//! - **Services**: enqueueing, the consumer loop, and the sweeper
//!
//! # Modules
//!
//! - [`config`]: TOML configuration and connection parameters
//! - [`queue`]: the task queue itself

pub mod config;
pub mod queue;
