//! Tagged stage outcome.

use super::StageStatus;
use crate::errors::StageError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The result of one stage attempt.
///
/// Invariants, enforced by the engine rather than the constructors: a
/// `Failed` result must carry an error, and a `Completed` result must carry
/// data. A stage that breaks either reports a defect in itself, which the
/// engine surfaces as [`StageError::ContractViolation`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    /// The outcome status.
    pub status: StageStatus,

    /// The output payload (for successful attempts).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    /// The error (for failed attempts).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<StageError>,

    /// Additional metadata. Defaults to empty, never absent.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl StageResult {
    /// Creates a completed result with the given payload.
    #[must_use]
    pub fn completed(data: serde_json::Value) -> Self {
        Self {
            status: StageStatus::Completed,
            data: Some(data),
            error: None,
            metadata: HashMap::new(),
        }
    }

    /// Creates a failed result carrying the given error.
    #[must_use]
    pub fn failed(error: StageError) -> Self {
        Self {
            status: StageStatus::Failed,
            data: None,
            error: Some(error),
            metadata: HashMap::new(),
        }
    }

    /// Creates a skipped result.
    #[must_use]
    pub fn skipped() -> Self {
        Self {
            status: StageStatus::Skipped,
            data: None,
            error: None,
            metadata: HashMap::new(),
        }
    }

    /// Replaces the metadata map.
    #[must_use]
    pub fn with_metadata(mut self, metadata: HashMap<String, serde_json::Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Adds a single metadata entry.
    #[must_use]
    pub fn add_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Returns true if the result indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns true if the result indicates failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.status.is_failure()
    }

    /// Gets a value from the metadata map.
    #[must_use]
    pub fn metadata_value(&self, key: &str) -> Option<&serde_json::Value> {
        self.metadata.get(key)
    }
}

impl From<StageError> for StageResult {
    fn from(error: StageError) -> Self {
        Self::failed(error)
    }
}
