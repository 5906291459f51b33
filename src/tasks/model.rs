//! Task data model — dispatched tasks, their assignee, deliverables,
//! expense requests and WhatsApp thread entries.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::classifier::ParsedResponse;
use crate::lifecycle::{SideEffect, TaskStatus, Transition, TransitionContext, Trigger};

/// Cap on the status-change log to prevent unbounded growth.
const MAX_HISTORY: usize = 200;

/// The field employee a task is assigned to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignee {
    pub employee_id: String,
    pub name: String,
    /// E.164 phone number ("+97333123456") the task is sent to.
    pub phone: String,
}

impl Assignee {
    pub fn new(
        employee_id: impl Into<String>,
        name: impl Into<String>,
        phone: impl Into<String>,
    ) -> Self {
        Self {
            employee_id: employee_id.into(),
            name: name.into(),
            phone: phone.into(),
        }
    }
}

/// Something the employee must hand in ("photos", "interview clips").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deliverable {
    pub label: String,
    pub target: u32,
    pub delivered: u32,
}

impl Deliverable {
    pub fn is_met(&self) -> bool {
        self.delivered >= self.target
    }
}

/// Money the employee asked for in a reply ("I need BD 20 for parking").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseRequest {
    pub amount: Decimal,
    /// The reply text the amount came from.
    pub note: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    pub requested_at: DateTime<Utc>,
}

/// One entry in the status-change log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub from: TaskStatus,
    pub to: TaskStatus,
    pub trigger: Trigger,
    pub at: DateTime<Utc>,
}

/// A dispatched task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<Assignee>,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    /// Anomalies seen this lifecycle. Never decreases except on reassignment.
    pub escalation_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reminder_sent: Option<DateTime<Utc>>,
    /// Send time of the last reminder already counted as unanswered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalated_reminder: Option<DateTime<Utc>>,
    pub last_status_change: DateTime<Utc>,
    /// Bumped by the store on every write; used for compare-and-swap.
    pub revision: u64,
    #[serde(default)]
    pub deliverables: Vec<Deliverable>,
    #[serde(default)]
    pub expenses: Vec<ExpenseRequest>,
    #[serde(default)]
    pub history: Vec<StatusChange>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Create a new draft task.
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: None,
            assignee: None,
            status: TaskStatus::Draft,
            deadline: None,
            escalation_count: 0,
            last_reminder_sent: None,
            escalated_reminder: None,
            last_status_change: now,
            revision: 0,
            deliverables: Vec::new(),
            expenses: Vec::new(),
            history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Builder: set description.
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Builder: set deadline.
    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Builder: set assignee.
    pub fn with_assignee(mut self, assignee: Assignee) -> Self {
        self.assignee = Some(assignee);
        self
    }

    /// Builder: add a deliverable.
    pub fn with_deliverable(mut self, label: impl Into<String>, target: u32) -> Self {
        self.deliverables.push(Deliverable {
            label: label.into(),
            target,
            delivered: 0,
        });
        self
    }

    /// Snapshot of this task as state-machine context.
    pub fn context(&self, now: DateTime<Utc>, confidence: Option<f32>) -> TransitionContext {
        TransitionContext {
            confidence,
            deadline: self.deadline,
            now: Some(now),
            escalation_count: self.escalation_count,
            last_reminder_sent: self.last_reminder_sent,
            escalated_reminder: self.escalated_reminder,
            last_status_change: Some(self.last_status_change),
        }
    }

    /// Fold a computed transition into this snapshot. Returns whether
    /// anything changed.
    pub fn apply(&mut self, transition: &Transition, trigger: Trigger, now: DateTime<Utc>) -> bool {
        let mut touched = false;

        if transition.changed() {
            self.history.push(StatusChange {
                from: self.status,
                to: transition.status,
                trigger,
                at: now,
            });
            if self.history.len() > MAX_HISTORY {
                let drain_count = self.history.len() - MAX_HISTORY;
                self.history.drain(..drain_count);
            }
            self.status = transition.status;
            self.last_status_change = now;
            touched = true;
        }

        if transition.requests(SideEffect::IncrementEscalation) {
            self.escalation_count = self.escalation_count.saturating_add(1);
            if trigger == Trigger::ReminderElapsed {
                self.escalated_reminder = self.last_reminder_sent;
            }
            touched = true;
        }

        if touched {
            self.updated_at = now;
        }
        touched
    }

    /// Record that a reminder went out.
    pub fn record_reminder(&mut self, now: DateTime<Utc>) {
        self.last_reminder_sent = Some(now);
        self.updated_at = now;
    }

    pub fn request_expense(
        &mut self,
        amount: Decimal,
        note: impl Into<String>,
        message_id: Option<String>,
        now: DateTime<Utc>,
    ) {
        self.expenses.push(ExpenseRequest {
            amount,
            note: note.into(),
            message_id,
            requested_at: now,
        });
        self.updated_at = now;
    }

    /// Total of all expense requests on this task.
    pub fn requested_total(&self) -> Decimal {
        self.expenses.iter().map(|e| e.amount).sum()
    }

    /// Count delivered items against a deliverable. Returns false if no
    /// deliverable has that label.
    pub fn record_delivery(&mut self, label: &str, count: u32) -> bool {
        let Some(deliverable) = self.deliverables.iter_mut().find(|d| d.label == label) else {
            return false;
        };
        deliverable.delivered = deliverable.delivered.saturating_add(count);
        self.updated_at = Utc::now();
        true
    }

    pub fn deliverables_met(&self) -> bool {
        self.deliverables.iter().all(Deliverable::is_met)
    }

    /// Hand the task to someone else. This starts a new lifecycle: back to
    /// draft, escalation and reminder state cleared.
    pub fn reassign(&mut self, assignee: Assignee, now: DateTime<Utc>) {
        self.assignee = Some(assignee);
        self.status = TaskStatus::Draft;
        self.escalation_count = 0;
        self.last_reminder_sent = None;
        self.escalated_reminder = None;
        self.last_status_change = now;
        self.history.clear();
        self.updated_at = now;
    }

    /// Past its deadline and still live.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status.is_active() && self.deadline.is_some_and(|d| now > d)
    }
}

/// Which way a thread message went.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageDirection {
    Inbound,
    Outbound,
}

/// One message in a task's WhatsApp thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadMessage {
    pub id: String,
    pub task_id: Uuid,
    pub direction: MessageDirection,
    pub sender: String,
    pub content: String,
    /// Classification of inbound replies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsed: Option<ParsedResponse>,
    pub sent_at: DateTime<Utc>,
}
