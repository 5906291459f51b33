//! Reply processor — turns employee replies and dispatcher actions into
//! persisted task transitions.
//!
//! Flow for a reply:
//! 1. Find the sender's open task
//! 2. Classify the text (and disambiguate against the task's status)
//! 3. Append it to the task's thread
//! 4. Compute the transition, record any expense request, write back with
//!    compare-and-swap, retrying on conflict
//!
//! Side effects (reminders, manager notifications) are returned to the
//! caller, never executed here.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::classifier::{IntentClassifier, ParsedResponse, ResponseAction};
use crate::config::DispatchConfig;
use crate::error::{PipelineError, StoreError};
use crate::lifecycle::{LifecycleMachine, SideEffect, TaskStatus, Transition, Trigger};
use crate::pipeline::types::{DeliveryReceipt, InboundMessage, ReplyOutcome};
use crate::store::TaskStore;
use crate::tasks::{MessageDirection, Task, ThreadMessage};

/// Attempts at a compare-and-swap write before giving up.
const MAX_CAS_ATTEMPTS: u32 = 3;

/// Reply processor over a task store.
pub struct ReplyProcessor {
    store: Arc<dyn TaskStore>,
    classifier: IntentClassifier,
    machine: LifecycleMachine,
}

impl ReplyProcessor {
    /// Create a processor with the built-in classifier rules.
    pub fn new(store: Arc<dyn TaskStore>, config: &DispatchConfig) -> Self {
        Self {
            store,
            classifier: IntentClassifier::default_rules(),
            machine: LifecycleMachine::new(config),
        }
    }

    /// Swap in a custom classifier.
    pub fn with_classifier(mut self, classifier: IntentClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Process one employee reply.
    pub async fn process(&self, message: InboundMessage) -> Result<ReplyOutcome, PipelineError> {
        info!(
            id = %message.id,
            channel = %message.channel,
            sender = %message.sender,
            "Processing reply"
        );

        let task = self
            .store
            .find_open_task_for_phone(&message.sender)
            .await?
            .ok_or_else(|| PipelineError::NoOpenTask {
                sender: message.sender.clone(),
            })?;

        let parsed = disambiguate(
            self.classifier.classify(&message.content),
            &message.content,
            task.status,
        );
        debug!(
            task_id = %task.id,
            action = %parsed.action,
            confidence = parsed.confidence,
            budget = ?parsed.budget(),
            contact = ?parsed.contact(),
            "Reply classified"
        );

        self.store
            .append_message(&ThreadMessage {
                id: message.id.clone(),
                task_id: task.id,
                direction: MessageDirection::Inbound,
                sender: message.sender.clone(),
                content: message.content.clone(),
                parsed: Some(parsed.clone()),
                sent_at: message.received_at,
            })
            .await?;

        let trigger = Trigger::from_action(parsed.action);
        let budget = parsed.budget();

        if trigger.is_none() && budget.is_none() {
            info!(task_id = %task.id, "Reply has no actionable intent, leaving for review");
            return Ok(ReplyOutcome {
                task_id: task.id,
                parsed,
                transition: None,
            });
        }

        let confidence = parsed.confidence;
        let transition = self
            .update_with_retry(task.id, |task, now| {
                let mut dirty = false;
                let transition = trigger.map(|trigger| {
                    let t = self.machine.next_status(
                        task.status,
                        trigger,
                        &task.context(now, Some(confidence)),
                    );
                    dirty |= task.apply(&t, trigger, now);
                    t
                });
                if let Some(amount) = budget {
                    task.request_expense(amount, &message.content, Some(message.id.clone()), now);
                    dirty = true;
                }
                (transition, dirty)
            })
            .await?;

        if let Some(t) = &transition {
            log_transition(task.id, trigger, t);
        }

        Ok(ReplyOutcome {
            task_id: task.id,
            parsed,
            transition,
        })
    }

    /// Process a batch of replies independently. Failures on individual
    /// messages are logged but don't fail the batch.
    pub async fn process_batch(&self, messages: Vec<InboundMessage>) -> Vec<ReplyOutcome> {
        let count = messages.len();
        let mut results = Vec::with_capacity(count);
        for message in messages {
            let id = message.id.clone();
            match self.process(message).await {
                Ok(outcome) => results.push(outcome),
                Err(e) => error!(id = %id, error = %e, "Failed to process reply in batch"),
            }
        }
        info!(processed = results.len(), total = count, "Reply batch complete");
        results
    }

    /// Apply a delivery receipt. Receipts for numbers without an open task
    /// are ignored.
    pub async fn process_receipt(
        &self,
        receipt: &DeliveryReceipt,
    ) -> Result<Option<Transition>, PipelineError> {
        if !receipt.confirms_delivery() {
            debug!(message_id = %receipt.message_id, state = ?receipt.state, "Receipt does not confirm delivery");
            return Ok(None);
        }
        let Some(task) = self
            .store
            .find_open_task_for_phone(&receipt.recipient)
            .await?
        else {
            debug!(recipient = %receipt.recipient, "Receipt for number without open task");
            return Ok(None);
        };
        self.confirm_delivery(task.id).await.map(Some)
    }

    /// Offer a manual (unclassified) trigger to a task.
    pub async fn apply_trigger(
        &self,
        task_id: Uuid,
        trigger: Trigger,
    ) -> Result<Transition, PipelineError> {
        let transition = self
            .update_with_retry(task_id, |task, now| {
                let t = self
                    .machine
                    .next_status(task.status, trigger, &task.context(now, None));
                let dirty = task.apply(&t, trigger, now);
                (t, dirty)
            })
            .await?;
        log_transition(task_id, Some(trigger), &transition);
        Ok(transition)
    }

    /// Dispatcher sent the task.
    pub async fn dispatch(&self, task_id: Uuid) -> Result<Transition, PipelineError> {
        self.apply_trigger(task_id, Trigger::Dispatch).await
    }

    /// The task message reached the employee's phone.
    pub async fn confirm_delivery(&self, task_id: Uuid) -> Result<Transition, PipelineError> {
        self.apply_trigger(task_id, Trigger::DeliveryConfirmed).await
    }

    /// Manager approved the submitted work.
    pub async fn approve(&self, task_id: Uuid) -> Result<Transition, PipelineError> {
        self.apply_trigger(task_id, Trigger::ManagerApproval).await
    }

    /// Manager sent the work back for changes.
    pub async fn send_back(&self, task_id: Uuid) -> Result<Transition, PipelineError> {
        self.apply_trigger(task_id, Trigger::ManagerRejection).await
    }

    pub async fn cancel(&self, task_id: Uuid) -> Result<Transition, PipelineError> {
        self.apply_trigger(task_id, Trigger::Cancel).await
    }

    /// Record that the caller sent a reminder, starting its response window.
    pub async fn record_reminder(&self, task_id: Uuid) -> Result<(), PipelineError> {
        self.update_with_retry(task_id, |task, now| {
            task.record_reminder(now);
            ((), true)
        })
        .await
    }

    /// Offer the time-based triggers (deadline, unanswered reminder) to every
    /// live task. Returns transitions that changed status or requested side
    /// effects. A task that fails to update is logged and skipped.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<Vec<(Uuid, Transition)>, PipelineError> {
        let tasks = self.store.list_active_tasks().await?;
        let total = tasks.len();
        let mut applied = Vec::new();
        let mut failed = 0;

        for task in tasks {
            for trigger in [Trigger::DeadlinePassed, Trigger::ReminderElapsed] {
                let result = self
                    .update_with_retry(task.id, |task, _| {
                        let t = self
                            .machine
                            .next_status(task.status, trigger, &task.context(now, None));
                        let dirty = task.apply(&t, trigger, now);
                        (t, dirty)
                    })
                    .await;
                let transition = match result {
                    Ok(t) => t,
                    Err(e) => {
                        error!(
                            task_id = %task.id,
                            trigger = trigger.label(),
                            error = %e,
                            "Sweep failed for task, skipping"
                        );
                        failed += 1;
                        break;
                    }
                };

                if transition.changed() || !transition.side_effects.is_empty() {
                    log_transition(task.id, Some(trigger), &transition);
                    applied.push((task.id, transition));
                }
            }
        }

        info!(count = applied.len(), failed, total, "Sweep complete");
        Ok(applied)
    }

    /// Load, mutate, compare-and-swap. `mutate` returns its output and
    /// whether the task needs writing; it may run more than once.
    async fn update_with_retry<T, F>(&self, task_id: Uuid, mut mutate: F) -> Result<T, PipelineError>
    where
        F: FnMut(&mut Task, DateTime<Utc>) -> (T, bool),
    {
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let mut task = self
                .store
                .get_task(task_id)
                .await?
                .ok_or(StoreError::NotFound { id: task_id })?;
            let expected = task.revision;

            let (output, dirty) = mutate(&mut task, Utc::now());
            if !dirty {
                return Ok(output);
            }

            match self.store.update_task(&task, expected).await {
                Ok(_) => return Ok(output),
                Err(StoreError::Conflict { .. }) => {
                    warn!(task_id = %task_id, attempt, "Concurrent task update, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(PipelineError::RetriesExhausted {
            id: task_id,
            attempts: MAX_CAS_ATTEMPTS,
        })
    }
}

/// A bare "✅" reads as acceptance, except from someone already working on
/// the task, where it means "done".
fn disambiguate(parsed: ParsedResponse, content: &str, status: TaskStatus) -> ParsedResponse {
    if parsed.action == ResponseAction::Accept
        && content.trim() == "✅"
        && status == TaskStatus::InProgress
    {
        ParsedResponse {
            action: ResponseAction::Complete,
            ..parsed
        }
    } else {
        parsed
    }
}

fn log_transition(task_id: Uuid, trigger: Option<Trigger>, transition: &Transition) {
    let trigger = trigger.map(|t| t.label()).unwrap_or("none");
    if transition.requests(SideEffect::Escalate) {
        warn!(
            task_id = %task_id,
            trigger,
            status = %transition.status,
            "Task needs manager attention"
        );
    }
    if transition.changed() {
        info!(
            task_id = %task_id,
            trigger,
            from = %transition.from,
            to = %transition.status,
            "Task status changed"
        );
    } else {
        debug!(
            task_id = %task_id,
            trigger,
            status = %transition.status,
            reason = ?transition.reason,
            effects = ?transition.side_effects,
            "Trigger left status unchanged"
        );
    }
}
