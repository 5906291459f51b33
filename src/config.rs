//! Configuration types.

use std::time::Duration;

use crate::error::ConfigError;

const ENV_CONFIDENCE_THRESHOLD: &str = "FIELD_DISPATCH_CONFIDENCE_THRESHOLD";
const ENV_ESCALATION_THRESHOLD: &str = "FIELD_DISPATCH_ESCALATION_THRESHOLD";
const ENV_REMINDER_WINDOW_MIN: &str = "FIELD_DISPATCH_REMINDER_WINDOW_MIN";

/// Lifecycle policy configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchConfig {
    /// Classifier results must score strictly above this to auto-apply.
    pub confidence_threshold: f32,
    /// Escalation count at which a manager is notified.
    pub escalation_threshold: u32,
    /// How long a reminder may go unanswered before it counts as an anomaly.
    pub reminder_window: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.8,
            escalation_threshold: 3,
            reminder_window: Duration::from_secs(30 * 60), // 30 minutes
        }
    }
}

impl DispatchConfig {
    /// Build from `FIELD_DISPATCH_*` environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_CONFIDENCE_THRESHOLD) {
            let value: f32 = parse(ENV_CONFIDENCE_THRESHOLD, &raw)?;
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidValue {
                    key: ENV_CONFIDENCE_THRESHOLD.into(),
                    message: format!("{value} is outside [0, 1]"),
                });
            }
            config.confidence_threshold = value;
        }

        if let Some(raw) = lookup(ENV_ESCALATION_THRESHOLD) {
            let value: u32 = parse(ENV_ESCALATION_THRESHOLD, &raw)?;
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    key: ENV_ESCALATION_THRESHOLD.into(),
                    message: "must be at least 1".into(),
                });
            }
            config.escalation_threshold = value;
        }

        if let Some(raw) = lookup(ENV_REMINDER_WINDOW_MIN) {
            let minutes: u64 = parse(ENV_REMINDER_WINDOW_MIN, &raw)?;
            config.reminder_window = Duration::from_secs(minutes * 60);
        }

        Ok(config)
    }
}

fn parse<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.into(),
        message: format!("{raw:?}: {e}"),
    })
}
