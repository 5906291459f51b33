//! Integration tests for the reply pipeline.
//!
//! Each test drives `ReplyProcessor` end to end over an in-memory store:
//! webhook JSON in, persisted task state out.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rust_decimal_macros::dec;
use serde_json::{Value, json};
use uuid::Uuid;

use field_dispatch::classifier::ResponseAction;
use field_dispatch::config::DispatchConfig;
use field_dispatch::error::{PipelineError, StoreError};
use field_dispatch::lifecycle::{SideEffect, TaskStatus};
use field_dispatch::pipeline::ReplyProcessor;
use field_dispatch::pipeline::whatsapp::parse_webhook_payload;
use field_dispatch::store::{InMemoryTaskStore, TaskStore};
use field_dispatch::tasks::{Assignee, Task, ThreadMessage};

const WA_ID: &str = "97333123456";
const PHONE: &str = "+97333123456";

fn text_webhook(id: &str, body: &str) -> Value {
    json!({
        "object": "whatsapp_business_account",
        "entry": [{
            "changes": [{
                "field": "messages",
                "value": {
                    "contacts": [{ "profile": { "name": "Layla" }, "wa_id": WA_ID }],
                    "messages": [{
                        "from": WA_ID,
                        "id": id,
                        "timestamp": Utc::now().timestamp().to_string(),
                        "type": "text",
                        "text": { "body": body }
                    }]
                }
            }]
        }]
    })
}

fn status_webhook(state: &str) -> Value {
    json!({
        "entry": [{
            "changes": [{
                "value": {
                    "statuses": [{
                        "id": "wamid.outbound",
                        "recipient_id": WA_ID,
                        "status": state,
                        "timestamp": Utc::now().timestamp().to_string()
                    }]
                }
            }]
        }]
    })
}

fn assigned_task(title: &str) -> Task {
    Task::new(title).with_assignee(Assignee::new("emp-1", "Layla", PHONE))
}

async fn reply(processor: &ReplyProcessor, id: &str, body: &str) -> field_dispatch::pipeline::ReplyOutcome {
    let mut batch = parse_webhook_payload(&text_webhook(id, body));
    assert_eq!(batch.messages.len(), 1);
    processor.process(batch.messages.remove(0)).await.unwrap()
}

#[tokio::test]
async fn webhook_reply_flow_reaches_completion() {
    let store = Arc::new(InMemoryTaskStore::new());
    let task = assigned_task("Cover the parliament session");
    store.insert_task(&task).await.unwrap();
    let processor = ReplyProcessor::new(store.clone(), &DispatchConfig::default());

    assert_eq!(processor.dispatch(task.id).await.unwrap().status, TaskStatus::Sent);

    let batch = parse_webhook_payload(&status_webhook("delivered"));
    let t = processor.process_receipt(&batch.receipts[0]).await.unwrap().unwrap();
    assert_eq!(t.status, TaskStatus::Read);

    let outcome = reply(&processor, "wamid.1", "I accept the task, on my way").await;
    assert_eq!(outcome.parsed.action, ResponseAction::Accept);
    assert_eq!(outcome.transition.unwrap().status, TaskStatus::Accepted);

    let outcome = reply(&processor, "wamid.2", "Working on it").await;
    assert_eq!(outcome.transition.unwrap().status, TaskStatus::InProgress);

    let outcome = reply(&processor, "wamid.3", "Done, finished the report").await;
    assert_eq!(outcome.parsed.action, ResponseAction::Complete);
    assert!(outcome.parsed.confidence > 0.8);
    assert_eq!(outcome.transition.unwrap().status, TaskStatus::Review);

    assert_eq!(processor.approve(task.id).await.unwrap().status, TaskStatus::Completed);

    let stored = store.get_task(task.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TaskStatus::Completed);
    assert_eq!(stored.escalation_count, 0);

    let thread = store.get_thread(task.id).await.unwrap();
    let ids: Vec<&str> = thread.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, ["wamid.1", "wamid.2", "wamid.3"]);
}

#[tokio::test]
async fn overdue_task_still_accepts_completion() {
    let store = Arc::new(InMemoryTaskStore::new());
    let mut task = assigned_task("Photograph the marathon").with_deadline(Utc::now() - Duration::hours(2));
    task.status = TaskStatus::InProgress;
    store.insert_task(&task).await.unwrap();
    let processor = ReplyProcessor::new(store.clone(), &DispatchConfig::default());

    let swept = processor.sweep(Utc::now()).await.unwrap();
    assert_eq!(swept.len(), 1);
    assert_eq!(swept[0].1.status, TaskStatus::Overdue);
    assert!(swept[0].1.requests(SideEffect::ScheduleReminder));

    let outcome = reply(&processor, "wamid.9", "Submitted, sorry for the delay. Taxi was BD 4.500").await;
    assert_eq!(outcome.parsed.action, ResponseAction::Complete);
    assert_eq!(outcome.transition.unwrap().status, TaskStatus::Review);

    let stored = store.get_task(task.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TaskStatus::Review);
    assert_eq!(stored.requested_total(), dec!(4.5));
}

#[tokio::test]
async fn delay_reply_keeps_status_and_asks_for_reminder() {
    let store = Arc::new(InMemoryTaskStore::new());
    let mut task = assigned_task("Interview the minister");
    task.status = TaskStatus::Accepted;
    store.insert_task(&task).await.unwrap();
    let processor = ReplyProcessor::new(store.clone(), &DispatchConfig::default());

    let outcome = reply(&processor, "wamid.5", "Running late, sorry").await;
    assert_eq!(outcome.parsed.action, ResponseAction::Delay);
    let t = outcome.transition.unwrap();
    assert_eq!(t.status, TaskStatus::Accepted);
    assert!(t.requests(SideEffect::LogDelay));
    assert!(t.requests(SideEffect::ScheduleReminder));

    processor.record_reminder(task.id).await.unwrap();
    let stored = store.get_task(task.id).await.unwrap().unwrap();
    assert!(stored.last_reminder_sent.is_some());
}

/// Store wrapper that reports a conflict on the first `n` writes, either to
/// any task or to one task only.
struct ContendedStore {
    inner: InMemoryTaskStore,
    conflicts_left: AtomicU32,
    only: Option<Uuid>,
}

impl ContendedStore {
    fn new(conflicts: u32) -> Self {
        Self {
            inner: InMemoryTaskStore::new(),
            conflicts_left: AtomicU32::new(conflicts),
            only: None,
        }
    }

    fn for_task(id: Uuid, conflicts: u32) -> Self {
        Self {
            only: Some(id),
            ..Self::new(conflicts)
        }
    }
}

#[async_trait]
impl TaskStore for ContendedStore {
    async fn insert_task(&self, task: &Task) -> Result<(), StoreError> {
        self.inner.insert_task(task).await
    }
    async fn get_task(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        self.inner.get_task(id).await
    }
    async fn update_task(&self, task: &Task, expected_revision: u64) -> Result<u64, StoreError> {
        let left = self.conflicts_left.load(Ordering::SeqCst);
        if left > 0 && self.only.is_none_or(|id| id == task.id) {
            self.conflicts_left.store(left - 1, Ordering::SeqCst);
            return Err(StoreError::Conflict {
                id: task.id,
                expected: expected_revision,
                actual: expected_revision + 1,
            });
        }
        self.inner.update_task(task, expected_revision).await
    }
    async fn list_active_tasks(&self) -> Result<Vec<Task>, StoreError> {
        self.inner.list_active_tasks().await
    }
    async fn find_open_task_for_phone(&self, phone: &str) -> Result<Option<Task>, StoreError> {
        self.inner.find_open_task_for_phone(phone).await
    }
    async fn append_message(&self, message: &ThreadMessage) -> Result<(), StoreError> {
        self.inner.append_message(message).await
    }
    async fn get_thread(&self, task_id: Uuid) -> Result<Vec<ThreadMessage>, StoreError> {
        self.inner.get_thread(task_id).await
    }
}

#[tokio::test]
async fn conflicting_write_is_retried() {
    let store = Arc::new(ContendedStore::new(2));
    let mut task = assigned_task("Council vote");
    task.status = TaskStatus::Sent;
    store.insert_task(&task).await.unwrap();
    let processor = ReplyProcessor::new(store.clone(), &DispatchConfig::default());

    let outcome = reply(&processor, "wamid.7", "👍").await;
    assert_eq!(outcome.transition.unwrap().status, TaskStatus::Accepted);

    let stored = store.get_task(task.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TaskStatus::Accepted);
    assert_eq!(stored.revision, 1);
}

#[tokio::test]
async fn persistent_conflicts_give_up() {
    let store = Arc::new(ContendedStore::new(u32::MAX));
    let mut task = assigned_task("Council vote");
    task.status = TaskStatus::Sent;
    store.insert_task(&task).await.unwrap();
    let processor = ReplyProcessor::new(store.clone(), &DispatchConfig::default());

    let mut batch = parse_webhook_payload(&text_webhook("wamid.8", "yes"));
    let err = processor.process(batch.messages.remove(0)).await.unwrap_err();
    assert!(matches!(err, PipelineError::RetriesExhausted { attempts: 3, .. }));

    let stored = store.get_task(task.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TaskStatus::Sent);
}

#[tokio::test]
async fn batch_skips_unknown_senders() {
    let store = Arc::new(InMemoryTaskStore::new());
    let mut task = assigned_task("Match report");
    task.status = TaskStatus::Sent;
    store.insert_task(&task).await.unwrap();
    let processor = ReplyProcessor::new(store.clone(), &DispatchConfig::default());

    let mut messages = parse_webhook_payload(&text_webhook("wamid.a", "ok")).messages;
    let mut stranger = parse_webhook_payload(&text_webhook("wamid.b", "ok")).messages;
    stranger[0].sender = "+15550000000".into();
    messages.append(&mut stranger);

    let outcomes = processor.process_batch(messages).await;
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].task_id, task.id);
}

#[tokio::test]
async fn sweep_continues_past_a_stuck_task() {
    let past = Utc::now() - Duration::hours(1);
    let mut stuck = Task::new("Stuck").with_deadline(past);
    stuck.status = TaskStatus::Sent;
    let mut late = Task::new("Late").with_deadline(past);
    late.status = TaskStatus::Accepted;

    let store = Arc::new(ContendedStore::for_task(stuck.id, u32::MAX));
    store.insert_task(&stuck).await.unwrap();
    store.insert_task(&late).await.unwrap();
    let processor = ReplyProcessor::new(store.clone(), &DispatchConfig::default());

    let applied = processor.sweep(Utc::now()).await.unwrap();
    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0].0, late.id);
    assert_eq!(applied[0].1.status, TaskStatus::Overdue);

    assert_eq!(store.get_task(late.id).await.unwrap().unwrap().status, TaskStatus::Overdue);
    assert_eq!(store.get_task(stuck.id).await.unwrap().unwrap().status, TaskStatus::Sent);
}
