//! `TaskStore` trait — the async persistence seam for tasks and threads.
//!
//! Writes are compare-and-swap on `Task::revision` so concurrent handlers
//! working on the same task serialize through the store.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::tasks::{Task, ThreadMessage};

/// Backend-agnostic task persistence.
#[async_trait]
pub trait TaskStore: Send + Sync {
    // ── Tasks ───────────────────────────────────────────────────────

    /// Insert a new task.
    async fn insert_task(&self, task: &Task) -> Result<(), StoreError>;

    /// Get a task by ID.
    async fn get_task(&self, id: Uuid) -> Result<Option<Task>, StoreError>;

    /// Replace a task if its stored revision still equals
    /// `expected_revision`. Returns the new revision.
    ///
    /// Fails with `StoreError::Conflict` if someone else wrote first.
    async fn update_task(&self, task: &Task, expected_revision: u64) -> Result<u64, StoreError>;

    /// All non-terminal tasks.
    async fn list_active_tasks(&self) -> Result<Vec<Task>, StoreError>;

    /// The most recently updated non-terminal task assigned to `phone`.
    async fn find_open_task_for_phone(&self, phone: &str) -> Result<Option<Task>, StoreError>;

    // ── Threads ─────────────────────────────────────────────────────

    /// Append a message to a task's thread.
    async fn append_message(&self, message: &ThreadMessage) -> Result<(), StoreError>;

    /// A task's thread, oldest first.
    async fn get_thread(&self, task_id: Uuid) -> Result<Vec<ThreadMessage>, StoreError>;
}
