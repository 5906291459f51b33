//! Error types for field dispatch.
//!
//! The classifier and the lifecycle machine never fail; these cover the
//! fallible surroundings (configuration, persistence, reply processing).

use uuid::Uuid;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Task store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Task {id} not found")]
    NotFound { id: Uuid },

    #[error("Task {id} already exists")]
    AlreadyExists { id: Uuid },

    #[error("Task {id} was modified concurrently: expected revision {expected}, found {actual}")]
    Conflict { id: Uuid, expected: u64, actual: u64 },
}

/// Reply-processing errors.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("No open task for sender {sender}")]
    NoOpenTask { sender: String },

    #[error("Task {id} kept changing underneath us after {attempts} attempts")]
    RetriesExhausted { id: Uuid, attempts: u32 },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_message_names_revisions() {
        let id = Uuid::new_v4();
        let err = StoreError::Conflict {
            id,
            expected: 3,
            actual: 4,
        };
        let msg = err.to_string();
        assert!(msg.contains("expected revision 3"));
        assert!(msg.contains("found 4"));
    }

    #[test]
    fn store_error_converts_into_pipeline_and_top_level() {
        let id = Uuid::new_v4();
        let pipeline: PipelineError = StoreError::NotFound { id }.into();
        assert!(matches!(pipeline, PipelineError::Store(StoreError::NotFound { .. })));

        let top: Error = pipeline.into();
        assert!(top.to_string().starts_with("Pipeline error"));
    }
}
