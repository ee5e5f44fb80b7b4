//! Error types for the deckflow engine.
//!
//! Three layers: [`StageError`] is the domain error carried through stage
//! results and the run context's error log; [`RecoveryError`] covers faults
//! internal to a recovery strategy (caught and logged by the coordinator,
//! never propagated); [`PipelineBuildError`] covers wiring-time validation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An error reported by a pipeline stage.
///
/// Stages may report a `StageError` through either channel: embedded in a
/// [`StageResult`](crate::core::StageResult) with `Failed` status, or
/// returned as the `Err` of [`Stage::process`](crate::stages::Stage::process).
/// The engine handles both, with different error-recording behavior.
///
/// `PartialEq` is load-bearing: the recovery coordinator removes the
/// triggering error from the context's error log exactly once on successful
/// recovery, which requires comparing recorded errors against the trigger.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum StageError {
    /// A network or upstream-service connection failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// An operation exceeded its deadline.
    #[error("timed out: {0}")]
    Timeout(String),

    /// The stage input did not satisfy the stage's requirements.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Content generation failed.
    #[error("content generation failed: {0}")]
    ContentGeneration(String),

    /// Slide creation or theming failed.
    #[error("slide creation failed: {0}")]
    SlideCreation(String),

    /// Final document assembly or export failed.
    #[error("assembly failed: {0}")]
    Assembly(String),

    /// A stage violated the result contract (e.g. a `Failed` result with no
    /// error, or a `Completed` result with no data).
    #[error("stage contract violation in '{stage}': {message}")]
    ContractViolation {
        /// The offending stage's name.
        stage: String,
        /// What the stage got wrong.
        message: String,
    },

    /// Any other stage failure.
    #[error("{0}")]
    Other(String),
}

impl StageError {
    /// Creates a contract-violation error.
    #[must_use]
    pub fn contract_violation(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ContractViolation {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Returns true for the connectivity/timeout class of errors.
    ///
    /// Transient errors are the only class the fallback-content strategy
    /// will substitute for.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout(_))
    }
}

/// A fault internal to a recovery strategy.
///
/// These never escape the coordinator: a strategy that fails is logged and
/// treated as unable to help, and evaluation moves on to the next strategy.
#[derive(Debug, Error)]
pub enum RecoveryError {
    /// Reading or writing a checkpoint or fallback file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing a checkpoint or parsing a fallback document failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A context key the strategy depends on was missing.
    #[error("missing context key: {0}")]
    MissingContext(&'static str),
}

/// An error raised while wiring a pipeline together.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineBuildError {
    /// The pipeline has no stages.
    #[error("pipeline has no stages")]
    Empty,

    /// Two stages share a name.
    ///
    /// Names key retry counters and handler wiring, so they must be unique
    /// within one pipeline.
    #[error("duplicate stage name: '{0}'")]
    DuplicateStage(String),

    /// A handler or configuration entry referenced a stage that is not in
    /// the pipeline.
    #[error("unknown stage: '{0}'")]
    UnknownStage(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(StageError::Connection("refused".into()).is_transient());
        assert!(StageError::Timeout("30s".into()).is_transient());
        assert!(!StageError::InvalidInput("no topic".into()).is_transient());
        assert!(!StageError::Other("boom".into()).is_transient());
    }

    #[test]
    fn test_stage_error_equality() {
        let a = StageError::Connection("refused".into());
        let b = StageError::Connection("refused".into());
        let c = StageError::Connection("reset".into());
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_contract_violation_display() {
        let err = StageError::contract_violation("Content Generation", "completed without data");
        let text = err.to_string();
        assert!(text.contains("Content Generation"));
        assert!(text.contains("completed without data"));
    }

    #[test]
    fn test_recovery_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = RecoveryError::from(io);
        assert!(matches!(err, RecoveryError::Io(_)));
    }

    #[test]
    fn test_build_error_display() {
        let err = PipelineBuildError::DuplicateStage("Slide Creation".into());
        assert!(err.to_string().contains("Slide Creation"));
    }
}
