//! Mock stages, strategies, and observers.

use crate::context::PipelineContext;
use crate::core::{StageResult, StageStatus};
use crate::errors::{RecoveryError, StageError};
use crate::observers::PipelineObserver;
use crate::recovery::RecoveryStrategy;
use crate::stages::Stage;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone)]
enum StaticBehavior {
    Completing(serde_json::Value),
    Echoing,
    Failing(StageError),
    ContractBreaking,
}

/// A stage with a fixed behavior on every attempt.
#[derive(Debug)]
pub struct StaticStage {
    name: String,
    behavior: StaticBehavior,
}

impl StaticStage {
    /// Always completes with the given payload.
    #[must_use]
    pub fn completing(name: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            behavior: StaticBehavior::Completing(data),
        }
    }

    /// Always completes, echoing its input as output.
    #[must_use]
    pub fn echoing(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            behavior: StaticBehavior::Echoing,
        }
    }

    /// Always returns a `Failed` result carrying the given error.
    #[must_use]
    pub fn failing(name: impl Into<String>, error: StageError) -> Self {
        Self {
            name: name.into(),
            behavior: StaticBehavior::Failing(error),
        }
    }

    /// Always returns a `Completed` result with no data, violating the
    /// result contract.
    #[must_use]
    pub fn contract_breaking(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            behavior: StaticBehavior::ContractBreaking,
        }
    }
}

#[async_trait]
impl Stage for StaticStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(
        &self,
        input: serde_json::Value,
        _ctx: &PipelineContext,
    ) -> Result<StageResult, StageError> {
        match &self.behavior {
            StaticBehavior::Completing(data) => Ok(StageResult::completed(data.clone())),
            StaticBehavior::Echoing => Ok(StageResult::completed(input)),
            StaticBehavior::Failing(error) => Ok(StageResult::failed(error.clone())),
            StaticBehavior::ContractBreaking => Ok(StageResult {
                status: StageStatus::Completed,
                data: None,
                error: None,
                metadata: HashMap::new(),
            }),
        }
    }
}

/// A stage that always returns `Err` from `process`.
#[derive(Debug)]
pub struct ThrowingStage {
    name: String,
    error: StageError,
}

impl ThrowingStage {
    /// Creates a stage raising the given error on every attempt.
    #[must_use]
    pub fn new(name: impl Into<String>, error: StageError) -> Self {
        Self {
            name: name.into(),
            error,
        }
    }
}

#[async_trait]
impl Stage for ThrowingStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(
        &self,
        _input: serde_json::Value,
        _ctx: &PipelineContext,
    ) -> Result<StageResult, StageError> {
        Err(self.error.clone())
    }
}

/// A stage that fails a configured number of times, then echoes its input.
///
/// Failures are reported through the throwing channel or the status channel
/// depending on the constructor. Attempts are counted across retries.
#[derive(Debug)]
pub struct FlakyStage {
    name: String,
    fail_times: u32,
    error: StageError,
    via_status: bool,
    attempts: Arc<AtomicUsize>,
}

impl FlakyStage {
    /// Fails by returning `Err` the first `fail_times` attempts.
    #[must_use]
    pub fn throwing(name: impl Into<String>, fail_times: u32, error: StageError) -> Self {
        Self {
            name: name.into(),
            fail_times,
            error,
            via_status: false,
            attempts: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fails by returning a `Failed` result the first `fail_times` attempts.
    #[must_use]
    pub fn status_failing(name: impl Into<String>, fail_times: u32, error: StageError) -> Self {
        Self {
            name: name.into(),
            fail_times,
            error,
            via_status: true,
            attempts: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Returns a handle to the attempt counter.
    #[must_use]
    pub fn attempt_counter(&self) -> Arc<AtomicUsize> {
        self.attempts.clone()
    }
}

#[async_trait]
impl Stage for FlakyStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(
        &self,
        input: serde_json::Value,
        _ctx: &PipelineContext,
    ) -> Result<StageResult, StageError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.fail_times as usize {
            if self.via_status {
                return Ok(StageResult::failed(self.error.clone()));
            }
            return Err(self.error.clone());
        }
        Ok(StageResult::completed(input))
    }
}

/// A recovery strategy with scripted applicability and result.
#[derive(Debug)]
pub struct ScriptedStrategy {
    applicable: bool,
    result: Option<serde_json::Value>,
    recover_calls: AtomicUsize,
}

impl ScriptedStrategy {
    /// Creates a strategy that reports `applicable` and recovers with
    /// `result`.
    #[must_use]
    pub fn new(applicable: bool, result: Option<serde_json::Value>) -> Self {
        Self {
            applicable,
            result,
            recover_calls: AtomicUsize::new(0),
        }
    }

    /// Returns how many times `recover` was called.
    #[must_use]
    pub fn recover_calls(&self) -> usize {
        self.recover_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecoveryStrategy for ScriptedStrategy {
    fn name(&self) -> &str {
        "ScriptedStrategy"
    }

    async fn can_recover(&self, _error: &StageError, _ctx: &PipelineContext) -> bool {
        self.applicable
    }

    async fn recover(
        &self,
        _error: &StageError,
        _ctx: &PipelineContext,
    ) -> Result<Option<serde_json::Value>, RecoveryError> {
        self.recover_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.result.clone())
    }
}

/// An observer that always fails, for isolation tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingObserver;

#[async_trait]
impl PipelineObserver for FailingObserver {
    async fn on_stage(
        &self,
        _stage_name: &str,
        _result: &StageResult,
        _ctx: &PipelineContext,
    ) -> anyhow::Result<()> {
        anyhow::bail!("observer failed")
    }
}
