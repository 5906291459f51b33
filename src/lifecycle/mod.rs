//! Task lifecycle state machine.
//!
//! DRAFT → SENT → READ → ACCEPTED → IN_PROGRESS → REVIEW → COMPLETED, with
//! REJECTED and CANCELLED as the other terminal states and OVERDUE as a
//! lateness annotation any live task can fall into and move on from.

pub mod machine;
pub mod status;

pub use machine::{
    LifecycleMachine, SideEffect, Transition, TransitionContext, TransitionReason, Trigger,
    next_status,
};
pub use status::TaskStatus;
