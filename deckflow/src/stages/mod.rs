//! Stage trait and the engine-side stage chain.
//!
//! Stages are the units of work in a deckflow pipeline. Collaborators
//! implement [`Stage`]; the engine wraps each implementation in a
//! [`StageNode`] that carries the chain link, the attached error handlers,
//! and the most recent result.

use crate::context::PipelineContext;
use crate::core::StageResult;
use crate::errors::StageError;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::fmt::Debug;
use std::sync::Arc;

/// Trait for pipeline stages.
///
/// `process` has two legal ways to report failure, and the engine handles
/// them through different paths:
///
/// 1. Return `Ok` with a [`StageResult`] whose status is `Failed` — the
///    stage-local channel. The error is NOT recorded in the context before
///    recovery is attempted.
/// 2. Return `Err` — the throwing channel. The engine records the error in
///    the context first, then attempts recovery.
///
/// Implementations must not panic as a substitute for either channel.
#[async_trait]
pub trait Stage: Send + Sync + Debug {
    /// Returns the name of the stage.
    ///
    /// Names key retry counters and handler wiring, so they must be unique
    /// within one pipeline.
    fn name(&self) -> &str;

    /// Processes the input and returns a result.
    async fn process(
        &self,
        input: serde_json::Value,
        ctx: &PipelineContext,
    ) -> Result<StageResult, StageError>;
}

/// A recovery hook attached to a stage.
///
/// Returns replacement input data if recovery succeeded, `None` otherwise.
#[async_trait]
pub trait StageErrorHandler: Send + Sync {
    /// Attempts to recover from `error`.
    async fn handle(&self, error: &StageError, ctx: &PipelineContext) -> Option<serde_json::Value>;
}

/// A closure-based error handler.
pub struct FnErrorHandler<F>
where
    F: Fn(&StageError, &PipelineContext) -> Option<serde_json::Value> + Send + Sync,
{
    func: F,
}

impl<F> FnErrorHandler<F>
where
    F: Fn(&StageError, &PipelineContext) -> Option<serde_json::Value> + Send + Sync,
{
    /// Creates a new closure-based handler.
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F> StageErrorHandler for FnErrorHandler<F>
where
    F: Fn(&StageError, &PipelineContext) -> Option<serde_json::Value> + Send + Sync,
{
    async fn handle(&self, error: &StageError, ctx: &PipelineContext) -> Option<serde_json::Value> {
        (self.func)(error, ctx)
    }
}

/// A stage wired into a pipeline.
///
/// Holds the stage implementation, a single successor (the engine follows
/// exactly one path), an ordered list of error handlers, and the most
/// recent result for inspection.
pub struct StageNode {
    stage: Arc<dyn Stage>,
    successor: RwLock<Option<Arc<StageNode>>>,
    handlers: RwLock<Vec<Arc<dyn StageErrorHandler>>>,
    last_result: RwLock<Option<StageResult>>,
}

impl Debug for StageNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageNode")
            .field("stage", &self.stage.name())
            .field("has_successor", &self.successor.read().is_some())
            .field("handlers", &self.handlers.read().len())
            .finish()
    }
}

impl StageNode {
    /// Wraps a stage implementation into an unlinked node.
    #[must_use]
    pub fn new(stage: Arc<dyn Stage>) -> Self {
        Self {
            stage,
            successor: RwLock::new(None),
            handlers: RwLock::new(Vec::new()),
            last_result: RwLock::new(None),
        }
    }

    /// Returns the stage name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.stage.name()
    }

    /// Returns the wrapped stage implementation.
    #[must_use]
    pub fn stage(&self) -> &Arc<dyn Stage> {
        &self.stage
    }

    /// Sets the stage executed after this one.
    pub fn set_successor(&self, successor: Arc<StageNode>) {
        *self.successor.write() = Some(successor);
    }

    /// Returns the successor, if any.
    #[must_use]
    pub fn successor(&self) -> Option<Arc<StageNode>> {
        self.successor.read().clone()
    }

    /// Appends an error handler to the ordered handler list.
    pub fn add_error_handler(&self, handler: Arc<dyn StageErrorHandler>) {
        self.handlers.write().push(handler);
    }

    /// Returns the number of attached handlers.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.handlers.read().len()
    }

    /// Runs the handler chain for `error`.
    ///
    /// Handlers are tried in order and the FIRST one returning recovery data
    /// wins; the rest are not invoked. This first-match rule is distinct
    /// from the coordinator's try-all semantics — a coordinator attached as
    /// one handler still evaluates all of its own strategies internally.
    pub async fn handle_error(
        &self,
        error: &StageError,
        ctx: &PipelineContext,
    ) -> Option<serde_json::Value> {
        let handlers: Vec<Arc<dyn StageErrorHandler>> = self.handlers.read().clone();
        for handler in handlers {
            if let Some(recovery_data) = handler.handle(error, ctx).await {
                return Some(recovery_data);
            }
        }
        None
    }

    /// Records the most recent result.
    pub(crate) fn record_result(&self, result: StageResult) {
        *self.last_result.write() = Some(result);
    }

    /// Returns the most recent result, if the stage has run.
    #[must_use]
    pub fn last_result(&self) -> Option<StageResult> {
        self.last_result.read().clone()
    }
}
