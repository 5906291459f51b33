//! Reply pipeline.
//!
//! Inbound WhatsApp traffic flows through:
//! 1. `whatsapp::parse_webhook_payload()` — webhook JSON → messages + receipts
//! 2. `ReplyProcessor::process()` — classify, transition, persist
//! 3. `ReplyProcessor::sweep()` — periodic deadline/reminder checks
//!
//! Outbound sending is not handled here; requested side effects are returned
//! to the caller.

pub mod processor;
pub mod types;
pub mod whatsapp;

pub use processor::ReplyProcessor;
pub use types::{DeliveryReceipt, DeliveryState, InboundMessage, ReplyOutcome, WebhookBatch};
