//! Task lifecycle transition function.
//!
//! `LifecycleMachine::next_status` is a pure function of
//! `(current status, trigger, context)`. It never touches storage; callers
//! apply the returned status and execute the requested side effects, and are
//! responsible for serializing updates to the same task.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::TaskStatus;
use crate::classifier::ResponseAction;
use crate::config::DispatchConfig;

/// An event offered to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Trigger {
    /// Dispatcher sent the task to the employee.
    Dispatch,
    /// WhatsApp delivery/read receipt.
    DeliveryConfirmed,
    Accept,
    Decline,
    Progress,
    Complete,
    Delay,
    ManagerApproval,
    /// Manager sent the work back.
    ManagerRejection,
    DeadlinePassed,
    Cancel,
    /// A reminder's response window ran out.
    ReminderElapsed,
}

impl Trigger {
    pub const ALL: [Trigger; 12] = [
        Self::Dispatch,
        Self::DeliveryConfirmed,
        Self::Accept,
        Self::Decline,
        Self::Progress,
        Self::Complete,
        Self::Delay,
        Self::ManagerApproval,
        Self::ManagerRejection,
        Self::DeadlinePassed,
        Self::Cancel,
        Self::ReminderElapsed,
    ];

    /// Trigger for a classified reply. `Unknown` carries no transition.
    pub fn from_action(action: ResponseAction) -> Option<Self> {
        match action {
            ResponseAction::Accept => Some(Self::Accept),
            ResponseAction::Decline => Some(Self::Decline),
            ResponseAction::Progress => Some(Self::Progress),
            ResponseAction::Complete => Some(Self::Complete),
            ResponseAction::Delay => Some(Self::Delay),
            ResponseAction::Unknown => None,
        }
    }

    /// Triggers whose confidence is gated against the threshold.
    pub fn is_classifier_driven(&self) -> bool {
        matches!(
            self,
            Self::Accept | Self::Decline | Self::Progress | Self::Complete
        )
    }

    /// Status this trigger moves `from` to, if the edge exists.
    ///
    /// `Delay` and `ReminderElapsed` never change status and return `None`.
    /// Policy checks (confidence, deadline) are not applied here.
    pub fn target(&self, from: TaskStatus) -> Option<TaskStatus> {
        use TaskStatus::*;

        if from.is_terminal() {
            return None;
        }

        match (self, from) {
            (Self::Dispatch, Draft) => Some(Sent),
            (Self::DeliveryConfirmed, Sent) => Some(Read),
            (Self::Accept, Sent | Read | Overdue) => Some(Accepted),
            (Self::Decline, Sent | Read | Overdue) => Some(Rejected),
            (Self::Progress, Accepted | Overdue) => Some(InProgress),
            (Self::Complete, InProgress | Overdue) => Some(Review),
            (Self::ManagerApproval, Review) => Some(Completed),
            (Self::ManagerRejection, Review) => Some(InProgress),
            (Self::DeadlinePassed, s) if s != Overdue => Some(Overdue),
            (Self::Cancel, _) => Some(Cancelled),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Dispatch => "dispatch",
            Self::DeliveryConfirmed => "delivery_confirmed",
            Self::Accept => "accept",
            Self::Decline => "decline",
            Self::Progress => "progress",
            Self::Complete => "complete",
            Self::Delay => "delay",
            Self::ManagerApproval => "manager_approval",
            Self::ManagerRejection => "manager_rejection",
            Self::DeadlinePassed => "deadline_passed",
            Self::Cancel => "cancel",
            Self::ReminderElapsed => "reminder_elapsed",
        }
    }
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Work the caller should perform after applying a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SideEffect {
    /// Send the employee a reminder.
    ScheduleReminder,
    /// Record that the employee reported a delay.
    LogDelay,
    /// Bump the task's escalation count.
    IncrementEscalation,
    /// Notify a manager.
    Escalate,
    /// Low-confidence reply: show it to a human instead of auto-applying.
    RequestReview,
}

/// Why a trigger produced no transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransitionReason {
    /// No edge for this trigger from the current status.
    InvalidTransition,
    /// Classifier confidence did not exceed the threshold.
    BelowConfidenceThreshold,
    /// Deadline missing, clock missing, or deadline not yet reached.
    NotYetDue,
    /// No reminder outstanding (never sent, or answered by a status change).
    NoReminderPending,
    /// The reminder's response window has not elapsed.
    ReminderWindowOpen,
}

/// Optional facts about the task and the trigger.
///
/// Every field may be missing; a missing field disables the policy that
/// needs it rather than failing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransitionContext {
    /// Classifier confidence. `None` means the trigger was not classified
    /// (manual action) and is not gated.
    pub confidence: Option<f32>,
    pub deadline: Option<DateTime<Utc>>,
    pub now: Option<DateTime<Utc>>,
    pub escalation_count: u32,
    pub last_reminder_sent: Option<DateTime<Utc>>,
    /// Send time of the last reminder already counted as unanswered.
    pub escalated_reminder: Option<DateTime<Utc>>,
    pub last_status_change: Option<DateTime<Utc>>,
}

impl TransitionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }
}

/// Outcome of offering a trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from: TaskStatus,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub side_effects: Vec<SideEffect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<TransitionReason>,
}

impl Transition {
    fn moved(from: TaskStatus, to: TaskStatus) -> Self {
        Self {
            from,
            status: to,
            side_effects: Vec::new(),
            reason: None,
        }
    }

    fn stay(current: TaskStatus, reason: Option<TransitionReason>) -> Self {
        Self {
            from: current,
            status: current,
            side_effects: Vec::new(),
            reason,
        }
    }

    fn with_effects(mut self, effects: impl IntoIterator<Item = SideEffect>) -> Self {
        self.side_effects.extend(effects);
        self
    }

    /// Check if the status changed.
    pub fn changed(&self) -> bool {
        self.from != self.status
    }

    pub fn requests(&self, effect: SideEffect) -> bool {
        self.side_effects.contains(&effect)
    }
}

/// Lifecycle policy: thresholds plus the transition table on `Trigger`.
#[derive(Debug, Clone)]
pub struct LifecycleMachine {
    confidence_threshold: f32,
    escalation_threshold: u32,
    reminder_window: std::time::Duration,
}

impl LifecycleMachine {
    pub fn new(config: &DispatchConfig) -> Self {
        Self {
            confidence_threshold: config.confidence_threshold,
            escalation_threshold: config.escalation_threshold,
            reminder_window: config.reminder_window,
        }
    }

    /// Compute the next status for `current` given `trigger`.
    pub fn next_status(
        &self,
        current: TaskStatus,
        trigger: Trigger,
        ctx: &TransitionContext,
    ) -> Transition {
        if current.is_terminal() {
            return self.reject(current, trigger, ctx);
        }

        match trigger {
            Trigger::Delay => Transition::stay(current, None)
                .with_effects([SideEffect::LogDelay, SideEffect::ScheduleReminder]),
            Trigger::ReminderElapsed => self.reminder_elapsed(current, ctx),
            Trigger::DeadlinePassed => {
                if trigger.target(current).is_none() {
                    return self.reject(current, trigger, ctx);
                }
                match (ctx.deadline, ctx.now) {
                    (Some(deadline), Some(now)) if now > deadline => {
                        Transition::moved(current, TaskStatus::Overdue)
                            .with_effects([SideEffect::ScheduleReminder])
                    }
                    _ => Transition::stay(current, Some(TransitionReason::NotYetDue)),
                }
            }
            _ => {
                let Some(target) = trigger.target(current) else {
                    return self.reject(current, trigger, ctx);
                };
                if trigger.is_classifier_driven() && !self.is_confident(ctx.confidence) {
                    return Self::needs_review(current);
                }
                Transition::moved(current, target)
            }
        }
    }

    fn is_confident(&self, confidence: Option<f32>) -> bool {
        confidence.is_none_or(|c| c > self.confidence_threshold)
    }

    fn needs_review(current: TaskStatus) -> Transition {
        Transition::stay(current, Some(TransitionReason::BelowConfidenceThreshold))
            .with_effects([SideEffect::RequestReview])
    }

    /// No edge for `trigger`. A confident out-of-policy decline counts as an
    /// anomaly; an unsure one goes to review instead.
    fn reject(&self, current: TaskStatus, trigger: Trigger, ctx: &TransitionContext) -> Transition {
        let rejected = Transition::stay(current, Some(TransitionReason::InvalidTransition));
        if trigger != Trigger::Decline {
            return rejected;
        }
        if !self.is_confident(ctx.confidence) {
            return rejected.with_effects([SideEffect::RequestReview]);
        }
        rejected.with_effects(self.escalation_effects(ctx.escalation_count))
    }

    fn reminder_elapsed(&self, current: TaskStatus, ctx: &TransitionContext) -> Transition {
        let Some(sent) = ctx.last_reminder_sent else {
            return Transition::stay(current, Some(TransitionReason::NoReminderPending));
        };
        if ctx.last_status_change.is_some_and(|changed| changed >= sent)
            || ctx.escalated_reminder.is_some_and(|counted| counted >= sent)
        {
            return Transition::stay(current, Some(TransitionReason::NoReminderPending));
        }

        let elapsed = ctx.now.and_then(|now| (now - sent).to_std().ok());
        match elapsed {
            Some(elapsed) if elapsed >= self.reminder_window => {
                Transition::stay(current, None)
                    .with_effects(self.escalation_effects(ctx.escalation_count))
                    .with_effects([SideEffect::ScheduleReminder])
            }
            _ => Transition::stay(current, Some(TransitionReason::ReminderWindowOpen)),
        }
    }

    fn escalation_effects(&self, escalation_count: u32) -> Vec<SideEffect> {
        let mut effects = vec![SideEffect::IncrementEscalation];
        if escalation_count.saturating_add(1) >= self.escalation_threshold {
            effects.push(SideEffect::Escalate);
        }
        effects
    }
}

impl Default for LifecycleMachine {
    fn default() -> Self {
        Self::new(&DispatchConfig::default())
    }
}

/// `LifecycleMachine::next_status` with default policy.
pub fn next_status(current: TaskStatus, trigger: Trigger, ctx: &TransitionContext) -> Transition {
    LifecycleMachine::default().next_status(current, trigger, ctx)
}
