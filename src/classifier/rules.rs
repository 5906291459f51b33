//! Keyword, phrase and emoji rules for reply classification.
//!
//! Patterns run against lower-cased, trimmed text. Longer phrases that
//! contain a shorter signal ("working on it" ⊃ "on it", "no problem" ⊃ "no")
//! are listed as their own rules; the classifier lets the longer match claim
//! the span.

use regex::Regex;

use super::types::ResponseAction;

/// How specific a signal is. Drives the confidence of the winning class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Specificity {
    /// Explicit keyword, phrase or emoji.
    Exact,
    /// Looser or compound phrasing ("heading there", "be there in 10 minutes").
    Loose,
}

impl Specificity {
    pub fn confidence(self) -> f32 {
        match self {
            Self::Exact => 0.9,
            Self::Loose => 0.75,
        }
    }
}

/// A single compiled signal.
#[derive(Debug, Clone)]
pub struct IntentRule {
    /// Human-readable description.
    pub label: String,
    pub regex: Regex,
    /// `Unknown` rules match nothing actionable; they only claim their span.
    pub action: ResponseAction,
    pub specificity: Specificity,
}

impl IntentRule {
    pub fn new(
        label: &str,
        pattern: &str,
        action: ResponseAction,
        specificity: Specificity,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            label: label.into(),
            regex: Regex::new(pattern)?,
            action,
            specificity,
        })
    }
}

/// Optional apology around a delay phrase ("sorry, running late", "running
/// late, sorry") so the apology is not read as a refusal.
fn apologetic(core: &str) -> String {
    format!(
        r"(?:\bsorry\b[\s,.!]*(?:i['’]?m\s+|i am\s+)?)?(?:{core})(?:[\s,.!]*\bsorry\b)?"
    )
}

/// The built-in English + emoji rule table.
pub fn default_rules() -> Vec<IntentRule> {
    use ResponseAction::*;
    use Specificity::*;

    let table: Vec<(&str, String, ResponseAction, Specificity)> = vec![
        // Accept
        ("accept", r"\baccept(?:ed|ing)?\b".into(), Accept, Exact),
        ("yes", r"\b(?:yes|yep|yeah)\b".into(), Accept, Exact),
        ("ok", r"\bok(?:ay)?\b".into(), Accept, Exact),
        ("sure", r"\bsure\b".into(), Accept, Exact),
        ("will do", r"\bwill do\b".into(), Accept, Exact),
        ("on it", r"\bon it\b".into(), Accept, Exact),
        ("got it", r"\bgot it\b".into(), Accept, Exact),
        ("no problem", r"\bno (?:problem|worries)\b".into(), Accept, Exact),
        ("thumbs up", "👍".into(), Accept, Exact),
        ("check mark", "✅".into(), Accept, Exact),
        // Decline
        ("decline", r"\bdeclined?\b".into(), Decline, Exact),
        ("no", r"\bno\b".into(), Decline, Exact),
        ("nope", r"\bnope\b".into(), Decline, Exact),
        ("cannot", r"\b(?:can['’]?t|cannot)\b".into(), Decline, Exact),
        ("unable", r"\bunable\b".into(), Decline, Exact),
        ("not available", r"\b(?:not available|unavailable)\b".into(), Decline, Exact),
        ("sorry", r"\bsorry\b".into(), Decline, Exact),
        ("cross mark", "❌".into(), Decline, Exact),
        (
            "negated acceptance",
            r"\b(?:can['’]?t|cannot|won['’]?t|will not|not|unable to)\s+(?:accept|do (?:it|this|that)|make it|ok(?:ay)?|sure)\b"
                .into(),
            Decline,
            Exact,
        ),
        // "not going to be late" is neither a refusal nor progress.
        ("not going", r"\bnot going\b".into(), Unknown, Loose),
        // Progress
        ("on my way", r"\bon my way\b".into(), Progress, Exact),
        ("started", r"\bstarted\b".into(), Progress, Exact),
        ("working on it", r"\bworking on it\b".into(), Progress, Exact),
        ("in progress", r"\bin progress\b".into(), Progress, Exact),
        ("arrived", r"\barrived\b".into(), Progress, Exact),
        ("at location", r"\bat (?:the )?location\b".into(), Progress, Loose),
        ("going", r"\bgoing\b".into(), Progress, Loose),
        ("heading there", r"\bheading (?:there|over)\b".into(), Progress, Loose),
        // Complete
        ("done", r"\bdone\b".into(), Complete, Exact),
        ("finished", r"\bfinished\b".into(), Complete, Exact),
        ("complete", r"\bcompleted?\b".into(), Complete, Exact),
        ("ready", r"\bready\b".into(), Complete, Exact),
        ("submitted", r"\bsubmitted\b".into(), Complete, Exact),
        (
            "check mark with completion word",
            r"✅[\s,.!]*(?:done|finished|completed?)\b|\b(?:done|finished|completed?)[\s,.!]*✅"
                .into(),
            Complete,
            Exact,
        ),
        // Delay
        ("running late", apologetic(r"\brunning late\b"), Delay, Exact),
        (
            "need more time",
            apologetic(r"\bneed (?:some |a bit |a little )?more time\b"),
            Delay,
            Exact,
        ),
        ("delay", apologetic(r"\bdelay(?:ed|s)?\b"), Delay, Exact),
        ("need extension", apologetic(r"\bneed (?:an )?extension\b"), Delay, Exact),
        (
            "sorry for the wait",
            r"\bsorry for (?:the )?(?:delay|wait|lateness)\b".into(),
            Delay,
            Exact,
        ),
        (
            "be there in minutes",
            apologetic(
                r"\b(?:will|i['’]?ll) be there in \d+\s*(?:minutes?|mins?|hours?|hrs?)\b",
            ),
            Delay,
            Loose,
        ),
        (
            "not done yet",
            r"\bnot (?:done|finished|ready|completed?)(?: yet)?\b".into(),
            Delay,
            Loose,
        ),
    ];

    table
        .into_iter()
        .map(|(label, pattern, action, specificity)| {
            IntentRule::new(label, &pattern, action, specificity).unwrap()
        })
        .collect()
}
