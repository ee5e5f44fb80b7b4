//! Checkpoint persistence.

use super::RecoveryStrategy;
use crate::context::{keys, PipelineContext};
use crate::errors::{RecoveryError, StageError};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// A persisted snapshot of a failing stage.
///
/// Written for manual inspection or resume; the engine never reads
/// checkpoints back itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// The stage that was executing when the failure occurred.
    pub stage_name: String,
    /// The input the stage was processing.
    pub input_data: serde_json::Value,
    /// Partial results accumulated before the failure.
    pub partial_results: serde_json::Value,
    /// The error message.
    pub error: String,
    /// ISO 8601 timestamp of the failure.
    pub timestamp: String,
}

impl Checkpoint {
    /// Captures a checkpoint from the current context state.
    #[must_use]
    pub fn capture(error: &StageError, ctx: &PipelineContext) -> Self {
        Self {
            stage_name: ctx.get_str(keys::CURRENT_STAGE_NAME).unwrap_or_default(),
            input_data: ctx.get_or(keys::STAGE_INPUT_DATA, serde_json::Value::Null),
            partial_results: ctx.get_or(keys::PARTIAL_RESULTS, serde_json::json!({})),
            error: error.to_string(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Strategy that saves progress to a checkpoint file and hands back the
/// original input.
///
/// `can_recover` is unconditionally true: this strategy always "succeeds"
/// by returning the stage's input unchanged, so attaching it alone to a
/// permanently failing stage retries forever. Compose it with a bounded
/// strategy such as [`RetryStrategy`](super::RetryStrategy) to guarantee
/// termination.
#[derive(Debug)]
pub struct AutoSaveStrategy {
    checkpoints_dir: PathBuf,
}

impl AutoSaveStrategy {
    /// Creates a strategy writing checkpoints under `checkpoints_dir`.
    ///
    /// The directory is created on first write.
    #[must_use]
    pub fn new(checkpoints_dir: impl Into<PathBuf>) -> Self {
        Self {
            checkpoints_dir: checkpoints_dir.into(),
        }
    }

    /// Returns the configured checkpoint directory.
    #[must_use]
    pub fn checkpoints_dir(&self) -> &Path {
        &self.checkpoints_dir
    }

    fn checkpoint_path(&self) -> PathBuf {
        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        self.checkpoints_dir.join(format!("checkpoint_{stamp}.json"))
    }
}

#[async_trait]
impl RecoveryStrategy for AutoSaveStrategy {
    fn name(&self) -> &str {
        "AutoSaveStrategy"
    }

    async fn can_recover(&self, _error: &StageError, _ctx: &PipelineContext) -> bool {
        // Saving progress is always possible.
        true
    }

    async fn recover(
        &self,
        error: &StageError,
        ctx: &PipelineContext,
    ) -> Result<Option<serde_json::Value>, RecoveryError> {
        let checkpoint = Checkpoint::capture(error, ctx);

        tokio::fs::create_dir_all(&self.checkpoints_dir).await?;
        let path = self.checkpoint_path();
        let payload = serde_json::to_string_pretty(&checkpoint)?;
        tokio::fs::write(&path, payload).await?;

        info!(
            stage = %checkpoint.stage_name,
            path = %path.display(),
            "saved checkpoint"
        );

        // Hand back the original input so the pipeline can continue; if a
        // retry already recovered, the coordinator keeps that result
        // instead.
        Ok(ctx.get(keys::STAGE_INPUT_DATA))
    }
}
