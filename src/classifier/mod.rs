//! Reply intent classifier.
//!
//! Maps a free-text WhatsApp reply (mixed case, emoji-only, anything) to a
//! `ParsedResponse`:
//! 1. Normalize: trim and lower-case.
//! 2. Collect every rule match with its span; longer matches claim their span
//!    first and overlapping shorter matches are dropped.
//! 3. Pick the winning class by `ResponseAction::PRECEDENCE`.
//! 4. Confidence is the best specificity among the winner's surviving hits.
//!
//! Extraction of budget/contact runs independently of the outcome.
//! Classification is pure: no I/O, no hidden state, never panics.

pub mod extract;
pub mod rules;
pub mod types;

use std::collections::HashMap;
use std::sync::LazyLock;

use tracing::trace;

use rules::{IntentRule, Specificity};
pub use types::{ExtractedInfo, ParsedResponse, ResponseAction};

static DEFAULT_CLASSIFIER: LazyLock<IntentClassifier> =
    LazyLock::new(IntentClassifier::default_rules);

/// Classify with the built-in rule table.
pub fn classify(text: &str) -> ParsedResponse {
    DEFAULT_CLASSIFIER.classify(text)
}

/// A rule match that survived span resolution.
#[derive(Debug, Clone, Copy)]
struct Hit {
    rule: usize,
    start: usize,
    end: usize,
    chars: usize,
}

impl Hit {
    fn overlaps(&self, other: &Hit) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Rule-table reply classifier.
#[derive(Debug, Clone)]
pub struct IntentClassifier {
    rules: Vec<IntentRule>,
}

impl IntentClassifier {
    /// Classifier with the built-in English + emoji rules.
    pub fn default_rules() -> Self {
        Self {
            rules: rules::default_rules(),
        }
    }

    /// Classifier with no rules (everything is `Unknown`).
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Add a custom rule. The pattern runs against lower-cased text.
    ///
    /// A rule with `ResponseAction::Unknown` acts as a mask: it claims its
    /// span without voting for any class.
    pub fn add_rule(
        &mut self,
        label: &str,
        pattern: &str,
        action: ResponseAction,
        specificity: Specificity,
    ) -> Result<(), regex::Error> {
        self.rules
            .push(IntentRule::new(label, pattern, action, specificity)?);
        Ok(())
    }

    /// Classify a reply.
    pub fn classify(&self, text: &str) -> ParsedResponse {
        let normalized = text.trim().to_lowercase();
        if normalized.is_empty() {
            return ParsedResponse::unknown(None);
        }

        let extracted_info = extract::extract(&normalized);

        // Best specificity per class among surviving hits.
        let mut best: HashMap<ResponseAction, Specificity> = HashMap::new();
        for hit in self.resolve_hits(&normalized) {
            let rule = &self.rules[hit.rule];
            if rule.action == ResponseAction::Unknown {
                continue;
            }
            trace!(rule = %rule.label, action = %rule.action, "reply signal");
            best.entry(rule.action)
                .and_modify(|s| {
                    if rule.specificity == Specificity::Exact {
                        *s = Specificity::Exact;
                    }
                })
                .or_insert(rule.specificity);
        }

        let winner = ResponseAction::PRECEDENCE
            .iter()
            .find_map(|action| best.get(action).map(|s| (*action, *s)));

        match winner {
            Some((action, specificity)) => ParsedResponse {
                action,
                confidence: specificity.confidence(),
                extracted_info,
            },
            None => ParsedResponse::unknown(extracted_info),
        }
    }

    /// All rule matches, with overlaps resolved in favour of the longer match
    /// (then the earlier one, then the earlier rule).
    fn resolve_hits(&self, normalized: &str) -> Vec<Hit> {
        let mut candidates: Vec<Hit> = self
            .rules
            .iter()
            .enumerate()
            .flat_map(|(idx, rule)| {
                rule.regex.find_iter(normalized).map(move |m| Hit {
                    rule: idx,
                    start: m.start(),
                    end: m.end(),
                    chars: m.as_str().chars().count(),
                })
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.chars
                .cmp(&a.chars)
                .then(a.start.cmp(&b.start))
                .then(a.rule.cmp(&b.rule))
        });

        let mut kept: Vec<Hit> = Vec::with_capacity(candidates.len());
        for hit in candidates {
            if kept.iter().all(|k| !k.overlaps(&hit)) {
                kept.push(hit);
            }
        }
        kept
    }
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::default_rules()
    }
}
