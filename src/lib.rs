//! Field dispatch — reply classification and task lifecycle for newsroom
//! field assignments sent over WhatsApp.

pub mod classifier;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod pipeline;
pub mod store;
pub mod tasks;

pub use classifier::{ParsedResponse, ResponseAction, classify};
pub use lifecycle::{TaskStatus, Transition, TransitionContext, Trigger, next_status};
