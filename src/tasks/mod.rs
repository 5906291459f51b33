//! Dispatched tasks and their WhatsApp threads.

pub mod model;

pub use model::{
    Assignee, Deliverable, ExpenseRequest, MessageDirection, StatusChange, Task, ThreadMessage,
};
