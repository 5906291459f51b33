//! Classifier output types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Intent of an employee reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseAction {
    Accept,
    Decline,
    Progress,
    Complete,
    Delay,
    Unknown,
}

impl ResponseAction {
    /// Actionable intents in precedence order: when a reply carries signals
    /// for several classes, the first one listed here wins.
    pub const PRECEDENCE: [ResponseAction; 5] = [
        Self::Decline,
        Self::Accept,
        Self::Complete,
        Self::Delay,
        Self::Progress,
    ];

    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::Decline => "decline",
            Self::Progress => "progress",
            Self::Complete => "complete",
            Self::Delay => "delay",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ResponseAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Structured fields pulled out of a reply, independent of its intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedInfo {
    /// Positive monetary amount the employee mentioned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<Decimal>,
    /// Phone-like token with formatting stripped (digits, optional leading '+').
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
}

/// Result of classifying one inbound reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedResponse {
    pub action: ResponseAction,
    /// In `[0, 1]`; 0 for `Unknown`.
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_info: Option<ExtractedInfo>,
}

impl ParsedResponse {
    /// A reply nothing matched. Extraction may still have found something.
    pub fn unknown(extracted_info: Option<ExtractedInfo>) -> Self {
        Self {
            action: ResponseAction::Unknown,
            confidence: 0.0,
            extracted_info,
        }
    }

    pub fn budget(&self) -> Option<Decimal> {
        self.extracted_info.as_ref().and_then(|i| i.budget)
    }

    pub fn contact(&self) -> Option<&str> {
        self.extracted_info
            .as_ref()
            .and_then(|i| i.contact.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&ResponseAction::Accept).unwrap();
        assert_eq!(json, "\"ACCEPT\"");
        let parsed: ResponseAction = serde_json::from_str("\"DELAY\"").unwrap();
        assert_eq!(parsed, ResponseAction::Delay);
    }

    #[test]
    fn unknown_has_zero_confidence() {
        let parsed = ParsedResponse::unknown(None);
        assert_eq!(parsed.action, ResponseAction::Unknown);
        assert_eq!(parsed.confidence, 0.0);
        assert!(parsed.budget().is_none());
    }

    #[test]
    fn missing_extraction_is_omitted_from_json() {
        let json = serde_json::to_value(ParsedResponse::unknown(None)).unwrap();
        assert!(json.get("extracted_info").is_none());
        assert_eq!(json["action"], "UNKNOWN");
    }

    #[test]
    fn precedence_puts_decline_first_and_progress_last() {
        assert_eq!(ResponseAction::PRECEDENCE[0], ResponseAction::Decline);
        assert_eq!(ResponseAction::PRECEDENCE[4], ResponseAction::Progress);
        assert!(!ResponseAction::PRECEDENCE.contains(&ResponseAction::Unknown));
    }
}
