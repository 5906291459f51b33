//! WhatsApp Business Cloud API webhook parsing.
//!
//! Webhook shape:
//! `{ "object": "whatsapp_business_account", "entry": [{ "changes": [{ "value": {
//!     "contacts": [...], "messages": [...], "statuses": [...] } }] }] }`
//!
//! Only text messages are surfaced; media and interactive messages are
//! skipped. Sending is handled elsewhere.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use super::types::{DeliveryReceipt, DeliveryState, InboundMessage, WebhookBatch};

pub const CHANNEL: &str = "whatsapp";

/// Normalize a WhatsApp `wa_id` ("97333123456") to E.164 ("+97333123456").
pub fn normalize_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    format!("+{digits}")
}

/// Parse a webhook payload into inbound messages and delivery receipts.
/// Malformed parts are skipped, never fatal.
pub fn parse_webhook_payload(payload: &Value) -> WebhookBatch {
    let mut batch = WebhookBatch::default();

    let Some(entries) = payload.get("entry").and_then(Value::as_array) else {
        debug!("WhatsApp webhook without entries");
        return batch;
    };

    for entry in entries {
        let Some(changes) = entry.get("changes").and_then(Value::as_array) else {
            continue;
        };

        for change in changes {
            let Some(value) = change.get("value") else {
                continue;
            };

            if let Some(messages) = value.get("messages").and_then(Value::as_array) {
                for msg in messages {
                    if let Some(inbound) = parse_message(msg, value) {
                        batch.messages.push(inbound);
                    }
                }
            }

            if let Some(statuses) = value.get("statuses").and_then(Value::as_array) {
                batch
                    .receipts
                    .extend(statuses.iter().filter_map(parse_status));
            }
        }
    }

    batch
}

fn parse_message(msg: &Value, value: &Value) -> Option<InboundMessage> {
    let from = msg.get("from").and_then(Value::as_str)?;

    let Some(content) = msg
        .get("text")
        .and_then(|t| t.get("body"))
        .and_then(Value::as_str)
    else {
        let kind = msg.get("type").and_then(Value::as_str).unwrap_or("unknown");
        debug!(from, kind, "WhatsApp: skipping non-text message");
        return None;
    };

    let id = msg
        .get("id")
        .and_then(Value::as_str)
        .map(String::from)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    Some(InboundMessage {
        id,
        channel: CHANNEL.to_string(),
        sender: normalize_phone(from),
        sender_name: contact_name(value, from),
        content: content.to_string(),
        received_at: parse_timestamp(msg.get("timestamp")),
    })
}

fn parse_status(status: &Value) -> Option<DeliveryReceipt> {
    let message_id = status.get("id").and_then(Value::as_str)?;
    let recipient = status.get("recipient_id").and_then(Value::as_str)?;
    let state = match status.get("status").and_then(Value::as_str)? {
        "sent" => DeliveryState::Sent,
        "delivered" => DeliveryState::Delivered,
        "read" => DeliveryState::Read,
        "failed" => DeliveryState::Failed,
        other => {
            warn!(status = other, "WhatsApp: unknown delivery status");
            return None;
        }
    };

    Some(DeliveryReceipt {
        message_id: message_id.to_string(),
        recipient: normalize_phone(recipient),
        state,
        at: parse_timestamp(status.get("timestamp")),
    })
}

/// Profile name for `wa_id` from the `contacts` array, if present.
fn contact_name(value: &Value, wa_id: &str) -> Option<String> {
    value
        .get("contacts")?
        .as_array()?
        .iter()
        .find(|c| c.get("wa_id").and_then(Value::as_str) == Some(wa_id))?
        .get("profile")?
        .get("name")?
        .as_str()
        .map(String::from)
}

/// Unix seconds as a string (what Meta sends). Falls back to now.
fn parse_timestamp(raw: Option<&Value>) -> DateTime<Utc> {
    raw.and_then(|t| match t {
        Value::String(s) => s.parse::<i64>().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    })
    .and_then(|secs| DateTime::from_timestamp(secs, 0))
    .unwrap_or_else(Utc::now)
}
