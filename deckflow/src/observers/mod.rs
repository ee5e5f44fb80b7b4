//! Pipeline observers.
//!
//! Observers are notified after every stage attempt that produced a
//! [`StageResult`]. An observer that fails is logged and skipped; it never
//! aborts the run.

use crate::context::PipelineContext;
use crate::core::StageResult;
use async_trait::async_trait;
use tracing::info;

/// Callback invoked after each stage attempt.
#[async_trait]
pub trait PipelineObserver: Send + Sync {
    /// Receives the stage name, its result, and the run context.
    async fn on_stage(
        &self,
        stage_name: &str,
        result: &StageResult,
        ctx: &PipelineContext,
    ) -> anyhow::Result<()>;
}

/// An observer that discards all notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

#[async_trait]
impl PipelineObserver for NoOpObserver {
    async fn on_stage(
        &self,
        _stage_name: &str,
        _result: &StageResult,
        _ctx: &PipelineContext,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

/// An observer that logs stage progress via `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingObserver;

#[async_trait]
impl PipelineObserver for LoggingObserver {
    async fn on_stage(
        &self,
        stage_name: &str,
        result: &StageResult,
        ctx: &PipelineContext,
    ) -> anyhow::Result<()> {
        info!(
            run_id = %ctx.run_id(),
            stage = stage_name,
            status = %result.status,
            "stage attempt finished"
        );
        Ok(())
    }
}

/// An observer that records every notification, for tests.
#[derive(Debug, Default)]
pub struct CollectingObserver {
    records: parking_lot::RwLock<Vec<(String, StageResult)>>,
}

impl CollectingObserver {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all recorded `(stage_name, result)` pairs.
    #[must_use]
    pub fn records(&self) -> Vec<(String, StageResult)> {
        self.records.read().clone()
    }

    /// Returns the number of recorded notifications.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Clears all recorded notifications.
    pub fn clear(&self) {
        self.records.write().clear();
    }

    /// Returns the recorded results for one stage name.
    #[must_use]
    pub fn records_for(&self, stage_name: &str) -> Vec<StageResult> {
        self.records
            .read()
            .iter()
            .filter(|(name, _)| name == stage_name)
            .map(|(_, result)| result.clone())
            .collect()
    }
}

#[async_trait]
impl PipelineObserver for CollectingObserver {
    async fn on_stage(
        &self,
        stage_name: &str,
        result: &StageResult,
        _ctx: &PipelineContext,
    ) -> anyhow::Result<()> {
        self.records
            .write()
            .push((stage_name.to_string(), result.clone()));
        Ok(())
    }
}
