//! In-memory adapters for queue tests and single-process embedding.

mod store;

pub use store::InMemoryTaskStore;
