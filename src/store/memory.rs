//! In-memory `TaskStore` for tests and single-process use.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::traits::TaskStore;
use crate::error::StoreError;
use crate::tasks::{Task, ThreadMessage};

/// Tasks and threads held behind async read-write locks.
#[derive(Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<Uuid, Task>>,
    threads: RwLock<HashMap<Uuid, Vec<ThreadMessage>>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn insert_task(&self, task: &Task) -> Result<(), StoreError> {
        let mut tasks = self.tasks.write().await;
        if tasks.contains_key(&task.id) {
            return Err(StoreError::AlreadyExists { id: task.id });
        }
        tasks.insert(task.id, task.clone());
        debug!(task_id = %task.id, status = %task.status, "Task inserted");
        Ok(())
    }

    async fn get_task(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        Ok(self.tasks.read().await.get(&id).cloned())
    }

    async fn update_task(&self, task: &Task, expected_revision: u64) -> Result<u64, StoreError> {
        let mut tasks = self.tasks.write().await;
        let stored = tasks
            .get_mut(&task.id)
            .ok_or(StoreError::NotFound { id: task.id })?;

        if stored.revision != expected_revision {
            return Err(StoreError::Conflict {
                id: task.id,
                expected: expected_revision,
                actual: stored.revision,
            });
        }

        let mut updated = task.clone();
        updated.revision = expected_revision + 1;
        *stored = updated;
        debug!(task_id = %task.id, revision = stored.revision, status = %stored.status, "Task updated");
        Ok(stored.revision)
    }

    async fn list_active_tasks(&self) -> Result<Vec<Task>, StoreError> {
        let tasks = self.tasks.read().await;
        let mut active: Vec<Task> = tasks
            .values()
            .filter(|t| t.status.is_active())
            .cloned()
            .collect();
        active.sort_by_key(|t| t.created_at);
        Ok(active)
    }

    async fn find_open_task_for_phone(&self, phone: &str) -> Result<Option<Task>, StoreError> {
        let tasks = self.tasks.read().await;
        Ok(tasks
            .values()
            .filter(|t| t.status.is_active())
            .filter(|t| t.assignee.as_ref().is_some_and(|a| a.phone == phone))
            .max_by_key(|t| t.updated_at)
            .cloned())
    }

    async fn append_message(&self, message: &ThreadMessage) -> Result<(), StoreError> {
        if !self.tasks.read().await.contains_key(&message.task_id) {
            return Err(StoreError::NotFound {
                id: message.task_id,
            });
        }
        self.threads
            .write()
            .await
            .entry(message.task_id)
            .or_default()
            .push(message.clone());
        Ok(())
    }

    async fn get_thread(&self, task_id: Uuid) -> Result<Vec<ThreadMessage>, StoreError> {
        Ok(self
            .threads
            .read()
            .await
            .get(&task_id)
            .cloned()
            .unwrap_or_default())
    }
}
