//! Relational task queue for Corvee.
//!
//! Producers append tasks in the `pending` state, competing consumers claim
//! them one at a time through a skip-locked read, and a sweeper deletes
//! terminal rows once they age past their retention window. The module
//! follows hexagonal architecture:
//!
//! - Domain types and the lifecycle state machine in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
