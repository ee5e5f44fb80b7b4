//! The recovery coordinator.

use super::RecoveryStrategy;
use crate::context::{keys, PipelineContext};
use crate::errors::StageError;
use crate::stages::StageErrorHandler;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Coordinates an ordered list of recovery strategies.
///
/// Unlike the stage-level handler chain, which stops at the first handler
/// producing data, the coordinator evaluates EVERY applicable strategy and
/// keeps the first non-null result. Strategies after the winner still run
/// for their side effects (a checkpoint is still written after a retry has
/// already produced recovery data).
#[derive(Debug, Default)]
pub struct ErrorHandler {
    strategies: Vec<Arc<dyn RecoveryStrategy>>,
}

impl ErrorHandler {
    /// Creates a coordinator with no strategies.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a recovery strategy to the evaluation order.
    pub fn add_strategy(&mut self, strategy: Arc<dyn RecoveryStrategy>) {
        self.strategies.push(strategy);
    }

    /// Appends a strategy, builder-style.
    #[must_use]
    pub fn with_strategy(mut self, strategy: Arc<dyn RecoveryStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    /// Returns the number of attached strategies.
    #[must_use]
    pub fn strategy_count(&self) -> usize {
        self.strategies.len()
    }

    /// Runs the strategy list against `error`.
    ///
    /// Every strategy whose `can_recover` is true gets its `recover` called,
    /// in list order. The first non-null recovery payload is retained and
    /// eventually returned; later strategies still run. On the first
    /// success, the triggering error is removed from the context's error
    /// log exactly once. A strategy that fails internally is logged and
    /// treated as unable to help.
    pub async fn handle_error(
        &self,
        error: &StageError,
        ctx: &PipelineContext,
    ) -> Option<serde_json::Value> {
        error!(
            stage = ctx.get_str(keys::CURRENT_STAGE_NAME).as_deref().unwrap_or("<unknown>"),
            %error,
            "attempting recovery"
        );

        let mut recovery_result: Option<serde_json::Value> = None;

        for strategy in &self.strategies {
            if !strategy.can_recover(error, ctx).await {
                continue;
            }

            info!(strategy = strategy.name(), "evaluating recovery strategy");
            match strategy.recover(error, ctx).await {
                Ok(Some(data)) => {
                    if recovery_result.is_none() {
                        info!(strategy = strategy.name(), "recovery successful");
                        recovery_result = Some(data);
                        if ctx.remove_error(error) {
                            info!(%error, "removed recovered error from context");
                        }
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(strategy = strategy.name(), error = %e, "recovery strategy failed");
                }
            }
        }

        if recovery_result.is_none() {
            error!("all recovery strategies failed");
        }

        recovery_result
    }
}

/// A coordinator attaches to a stage directly as one handler in the
/// stage-level chain; its result is propagated as the handler's return
/// value.
#[async_trait]
impl StageErrorHandler for ErrorHandler {
    async fn handle(&self, error: &StageError, ctx: &PipelineContext) -> Option<serde_json::Value> {
        self.handle_error(error, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RecoveryError;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// A strategy with scripted behavior and call counting.
    #[derive(Debug)]
    struct ScriptedStrategy {
        applicable: bool,
        result: Option<serde_json::Value>,
        fail: bool,
        recover_calls: AtomicUsize,
    }

    impl ScriptedStrategy {
        fn new(applicable: bool, result: Option<serde_json::Value>) -> Arc<Self> {
            Arc::new(Self {
                applicable,
                result,
                fail: false,
                recover_calls: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                applicable: true,
                result: None,
                fail: true,
                recover_calls: AtomicUsize::new(0),
            })
        }

        fn recover_calls(&self) -> usize {
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
            if self.fail {
                return Err(RecoveryError::MissingContext("scripted"));
            }
            Ok(self.result.clone())
        }
    }

    #[tokio::test]
    async fn test_first_result_wins_but_all_strategies_run() {
        let s1 = ScriptedStrategy::new(false, None);
        let s2 = ScriptedStrategy::new(true, Some(serde_json::json!("A")));
        let s3 = ScriptedStrategy::new(true, Some(serde_json::json!("B")));

        let handler = ErrorHandler::new()
            .with_strategy(s1.clone())
            .with_strategy(s2.clone())
            .with_strategy(s3.clone());

        let ctx = PipelineContext::new();
        let result = handler
            .handle_error(&StageError::Other("boom".into()), &ctx)
            .await;

        assert_eq!(result, Some(serde_json::json!("A")));
        // s1 was inapplicable, so its recover was never called; s3 ran even
        // though s2 had already supplied the result.
        assert_eq!(s1.recover_calls(), 0);
        assert_eq!(s2.recover_calls(), 1);
        assert_eq!(s3.recover_calls(), 1);
    }

    #[tokio::test]
    async fn test_no_applicable_strategy() {
        let handler = ErrorHandler::new().with_strategy(ScriptedStrategy::new(false, None));

        let ctx = PipelineContext::new();
        let result = handler
            .handle_error(&StageError::Other("boom".into()), &ctx)
            .await;
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_error_removed_exactly_once_on_success() {
        let err = StageError::Connection("refused".into());
        let ctx = PipelineContext::new();
        ctx.add_error(err.clone());

        let handler = ErrorHandler::new()
            .with_strategy(ScriptedStrategy::new(true, Some(serde_json::json!(1))))
            .with_strategy(ScriptedStrategy::new(true, Some(serde_json::json!(2))));

        let result = handler.handle_error(&err, &ctx).await;
        assert_eq!(result, Some(serde_json::json!(1)));
        assert!(!ctx.has_errors());
    }

    #[tokio::test]
    async fn test_error_retained_when_no_recovery() {
        let err = StageError::Connection("refused".into());
        let ctx = PipelineContext::new();
        ctx.add_error(err.clone());

        let handler = ErrorHandler::new().with_strategy(ScriptedStrategy::new(true, None));

        let result = handler.handle_error(&err, &ctx).await;
        assert_eq!(result, None);
        assert_eq!(ctx.error_count(), 1);
    }

    #[tokio::test]
    async fn test_strategy_failure_does_not_abort_evaluation() {
        let failing = ScriptedStrategy::failing();
        let succeeding = ScriptedStrategy::new(true, Some(serde_json::json!("rescued")));

        let handler = ErrorHandler::new()
            .with_strategy(failing.clone())
            .with_strategy(succeeding.clone());

        let ctx = PipelineContext::new();
        let result = handler
            .handle_error(&StageError::Other("boom".into()), &ctx)
            .await;

        assert_eq!(result, Some(serde_json::json!("rescued")));
        assert_eq!(failing.recover_calls(), 1);
    }
}
