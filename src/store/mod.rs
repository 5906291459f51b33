//! Persistence layer — the `TaskStore` seam and an in-memory backend.

pub mod memory;
pub mod traits;

pub use memory::InMemoryTaskStore;
pub use traits::TaskStore;
