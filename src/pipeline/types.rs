//! Shared types for the reply pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::classifier::ParsedResponse;
use crate::lifecycle::Transition;

// ── Inbound message ─────────────────────────────────────────────────

/// A reply from an employee, as delivered by the webhook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Channel-native ID (WhatsApp `wamid.*`) or a generated UUID.
    pub id: String,
    /// Source channel, e.g. "whatsapp".
    pub channel: String,
    /// Sender phone in E.164 form.
    pub sender: String,
    /// Profile name from the webhook, if any.
    pub sender_name: Option<String>,
    /// Message body.
    pub content: String,
    pub received_at: DateTime<Utc>,
}

impl InboundMessage {
    pub fn new(channel: impl Into<String>, sender: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            channel: channel.into(),
            sender: sender.into(),
            sender_name: None,
            content: content.into(),
            received_at: Utc::now(),
        }
    }
}

// ── Delivery receipt ────────────────────────────────────────────────

/// Delivery state reported for an outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryState {
    Sent,
    Delivered,
    Read,
    Failed,
}

/// Status callback for something we sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    /// ID of the outbound message.
    pub message_id: String,
    /// Recipient phone in E.164 form.
    pub recipient: String,
    pub state: DeliveryState,
    pub at: DateTime<Utc>,
}

impl DeliveryReceipt {
    /// Whether this receipt confirms the employee has the task.
    pub fn confirms_delivery(&self) -> bool {
        matches!(self.state, DeliveryState::Delivered | DeliveryState::Read)
    }
}

/// Everything one webhook call carried.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WebhookBatch {
    pub messages: Vec<InboundMessage>,
    pub receipts: Vec<DeliveryReceipt>,
}

impl WebhookBatch {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.receipts.is_empty()
    }
}

// ── Reply outcome ───────────────────────────────────────────────────

/// Result of processing one reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyOutcome {
    pub task_id: Uuid,
    pub parsed: ParsedResponse,
    /// `None` when the reply carried no actionable intent.
    pub transition: Option<Transition>,
}

impl ReplyOutcome {
    /// Whether a human should look at this reply.
    pub fn needs_review(&self) -> bool {
        match &self.transition {
            Some(t) => t.requests(crate::lifecycle::SideEffect::RequestReview),
            None => true,
        }
    }
}
