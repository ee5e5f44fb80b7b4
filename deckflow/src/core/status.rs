//! Stage execution status.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The execution status of a pipeline stage.
///
/// The engine's reference stages only ever produce `Completed` and `Failed`;
/// the remaining states are representable for collaborators that track
/// richer lifecycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// The stage has not run yet.
    NotStarted,
    /// The stage is currently running.
    InProgress,
    /// The stage completed successfully.
    Completed,
    /// The stage failed.
    Failed,
    /// The stage was skipped.
    Skipped,
}

impl Default for StageStatus {
    fn default() -> Self {
        Self::NotStarted
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not_started"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

impl StageStatus {
    /// Returns true if the status is a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Skipped)
    }

    /// Returns true if the status indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed | Self::Skipped)
    }

    /// Returns true if the status indicates failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed)
    }
}
