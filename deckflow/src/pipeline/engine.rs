//! The sequential execution engine.

use crate::context::{keys, PipelineContext};
use crate::core::{StageResult, StageStatus};
use crate::errors::StageError;
use crate::observers::PipelineObserver;
use crate::stages::StageNode;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};

/// A wired pipeline: the stage chain, its observers, and the configuration
/// seed echoed into every run context.
///
/// `execute` never fails; callers inspect the returned context's error log
/// to distinguish a completed run from a halted one.
pub struct Pipeline {
    initial_stage: Arc<StageNode>,
    observers: Vec<Arc<dyn PipelineObserver>>,
    seed: HashMap<String, serde_json::Value>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("initial_stage", &self.initial_stage.name())
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl Pipeline {
    /// Creates a pipeline starting at `initial_stage`.
    #[must_use]
    pub fn new(initial_stage: Arc<StageNode>) -> Self {
        Self {
            initial_stage,
            observers: Vec::new(),
            seed: HashMap::new(),
        }
    }

    /// Appends an observer.
    pub fn add_observer(&mut self, observer: Arc<dyn PipelineObserver>) {
        self.observers.push(observer);
    }

    /// Sets the configuration entries seeded into every run context.
    pub fn set_seed(&mut self, seed: HashMap<String, serde_json::Value>) {
        self.seed = seed;
    }

    /// Returns the first stage of the chain.
    #[must_use]
    pub fn initial_stage(&self) -> &Arc<StageNode> {
        &self.initial_stage
    }

    /// Walks the chain from the initial stage, in execution order.
    #[must_use]
    pub fn stages(&self) -> Vec<Arc<StageNode>> {
        let mut stages = Vec::new();
        let mut current = Some(self.initial_stage.clone());
        while let Some(node) = current {
            current = node.successor();
            stages.push(node);
        }
        stages
    }

    /// Finds a stage node by name.
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<Arc<StageNode>> {
        self.stages().into_iter().find(|node| node.name() == name)
    }

    /// Executes the pipeline against `initial_data`.
    ///
    /// Returns the run context in every case. Any engine-internal fault is
    /// recorded there instead of being propagated.
    pub async fn execute(&self, initial_data: serde_json::Value) -> PipelineContext {
        let ctx = PipelineContext::with_seed(self.seed.clone());
        info!(run_id = %ctx.run_id(), "pipeline run started");

        if let Err(err) = self.run_loop(&ctx, initial_data).await {
            error!(run_id = %ctx.run_id(), error = %err, "critical pipeline error");
            ctx.add_error(err);
        }

        ctx
    }

    async fn run_loop(
        &self,
        ctx: &PipelineContext,
        initial_data: serde_json::Value,
    ) -> Result<(), StageError> {
        let mut current: Option<Arc<StageNode>> = Some(self.initial_stage.clone());
        let mut current_data = initial_data;

        while let Some(node) = current.clone() {
            // The contract the recovery strategies rely on: the input and
            // stage name are in the context before every attempt.
            ctx.set(keys::STAGE_INPUT_DATA, current_data.clone());
            ctx.set(keys::CURRENT_STAGE_NAME, serde_json::json!(node.name()));

            info!(stage = node.name(), "executing pipeline stage");

            match node.stage().process(current_data.clone(), ctx).await {
                Ok(result) => {
                    node.record_result(result.clone());
                    self.notify_observers(node.name(), &result, ctx).await;

                    if result.status == StageStatus::Failed {
                        let stage_error = result.error.clone().ok_or_else(|| {
                            StageError::contract_violation(
                                node.name(),
                                "failed result carries no error",
                            )
                        })?;

                        // Status-reported failures are not recorded in the
                        // error log before recovery; only the Err channel
                        // below is.
                        if let Some(recovered) = node.handle_error(&stage_error, ctx).await {
                            info!(stage = node.name(), "retrying stage with recovered data");
                            current_data = recovered;
                            continue;
                        }

                        error!(stage = node.name(), error = %stage_error, "stage failed, no recovery");
                        break;
                    }

                    current_data = match result.status {
                        StageStatus::Completed => result.data.clone().ok_or_else(|| {
                            StageError::contract_violation(
                                node.name(),
                                "completed result carries no data",
                            )
                        })?,
                        _ => result.data.clone().unwrap_or(serde_json::Value::Null),
                    };
                    current = node.successor();
                }
                Err(stage_error) => {
                    error!(stage = node.name(), error = %stage_error, "stage raised an error");
                    ctx.add_error(stage_error.clone());

                    if let Some(recovered) = node.handle_error(&stage_error, ctx).await {
                        info!(stage = node.name(), "stage recovered, retrying with recovered data");
                        current_data = recovered;
                        continue;
                    }

                    error!(stage = node.name(), "failed to recover from stage error");
                    break;
                }
            }
        }

        Ok(())
    }

    async fn notify_observers(
        &self,
        stage_name: &str,
        result: &StageResult,
        ctx: &PipelineContext,
    ) {
        for observer in &self.observers {
            if let Err(err) = observer.on_stage(stage_name, result, ctx).await {
                error!(stage = stage_name, error = %err, "pipeline observer failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observers::CollectingObserver;
    use crate::recovery::{AutoSaveStrategy, ErrorHandler, RetryStrategy};
    use crate::testing::mocks::{FailingObserver, FlakyStage, StaticStage, ThrowingStage};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn chain(nodes: Vec<Arc<StageNode>>) -> Pipeline {
        for pair in nodes.windows(2) {
            pair[0].set_successor(pair[1].clone());
        }
        Pipeline::new(nodes[0].clone())
    }

    #[tokio::test]
    async fn test_single_stage_success() {
        let node = Arc::new(StageNode::new(Arc::new(StaticStage::completing(
            "only",
            serde_json::json!("out"),
        ))));
        let pipeline = Pipeline::new(node.clone());

        let ctx = pipeline.execute(serde_json::json!("in")).await;

        assert!(!ctx.has_errors());
        assert_eq!(ctx.get(keys::STAGE_INPUT_DATA), Some(serde_json::json!("in")));
        assert_eq!(node.last_result().unwrap().status, StageStatus::Completed);
    }

    #[tokio::test]
    async fn test_data_flows_between_stages() {
        let first = Arc::new(StageNode::new(Arc::new(StaticStage::completing(
            "first",
            serde_json::json!({"stage": 1}),
        ))));
        let second = Arc::new(StageNode::new(Arc::new(StaticStage::echoing("second"))));
        let pipeline = chain(vec![first, second.clone()]);

        let ctx = pipeline.execute(serde_json::json!("seed")).await;

        assert!(!ctx.has_errors());
        // The second stage received and echoed the first stage's output.
        assert_eq!(
            second.last_result().unwrap().data,
            Some(serde_json::json!({"stage": 1}))
        );
        assert_eq!(
            ctx.get(keys::STAGE_INPUT_DATA),
            Some(serde_json::json!({"stage": 1}))
        );
    }

    #[tokio::test]
    async fn test_thrown_error_without_handlers_is_terminal() {
        let throwing = Arc::new(StageNode::new(Arc::new(ThrowingStage::new(
            "broken",
            StageError::Connection("refused".into()),
        ))));
        let unreachable = Arc::new(StageNode::new(Arc::new(StaticStage::echoing("after"))));
        let pipeline = chain(vec![throwing, unreachable.clone()]);

        let ctx = pipeline.execute(serde_json::json!("in")).await;

        let errors = ctx.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0], StageError::Connection("refused".into()));
        assert!(unreachable.last_result().is_none());
    }

    #[tokio::test]
    async fn test_status_failure_without_handlers_stops_without_recording() {
        let failing = Arc::new(StageNode::new(Arc::new(StaticStage::failing(
            "broken",
            StageError::Assembly("export".into()),
        ))));
        let unreachable = Arc::new(StageNode::new(Arc::new(StaticStage::echoing("after"))));
        let pipeline = chain(vec![failing.clone(), unreachable.clone()]);

        let ctx = pipeline.execute(serde_json::json!("in")).await;

        // Status-reported failures are not appended to the error log.
        assert!(!ctx.has_errors());
        assert_eq!(failing.last_result().unwrap().status, StageStatus::Failed);
        assert!(unreachable.last_result().is_none());
    }

    #[tokio::test]
    async fn test_flaky_stage_recovers_via_retry() {
        let flaky = FlakyStage::throwing("flaky", 1, StageError::Timeout("api".into()));
        let attempts = flaky.attempt_counter();

        let node = Arc::new(StageNode::new(Arc::new(flaky)));
        let handler =
            ErrorHandler::new().with_strategy(Arc::new(RetryStrategy::new(2, Duration::from_millis(1))));
        node.add_error_handler(Arc::new(handler));

        let pipeline = Pipeline::new(node.clone());
        let ctx = pipeline.execute(serde_json::json!({"topic": "Testing"})).await;

        assert!(!ctx.has_errors());
        assert_eq!(attempts.load(std::sync::atomic::Ordering::SeqCst), 2);
        assert_eq!(node.last_result().unwrap().status, StageStatus::Completed);
        assert_eq!(
            ctx.get(keys::STAGE_INPUT_DATA),
            Some(serde_json::json!({"topic": "Testing"}))
        );
    }

    #[tokio::test]
    async fn test_retry_budget_bounds_attempts() {
        // Fails forever; Retry(2) gives up after the initial attempt plus
        // two retries.
        let flaky = FlakyStage::throwing("doomed", u32::MAX, StageError::Timeout("api".into()));
        let attempts = flaky.attempt_counter();

        let node = Arc::new(StageNode::new(Arc::new(flaky)));
        let handler =
            ErrorHandler::new().with_strategy(Arc::new(RetryStrategy::new(2, Duration::from_millis(1))));
        node.add_error_handler(Arc::new(handler));

        let pipeline = Pipeline::new(node);
        let ctx = pipeline.execute(serde_json::json!("in")).await;

        assert_eq!(attempts.load(std::sync::atomic::Ordering::SeqCst), 3);
        assert_eq!(ctx.error_count(), 1);
    }

    #[tokio::test]
    async fn test_observers_see_results_but_not_thrown_attempts() {
        let observer = Arc::new(CollectingObserver::new());

        let throwing = Arc::new(StageNode::new(Arc::new(ThrowingStage::new(
            "broken",
            StageError::Other("boom".into()),
        ))));
        let mut pipeline = Pipeline::new(throwing);
        pipeline.add_observer(observer.clone());

        pipeline.execute(serde_json::json!("in")).await;

        // The throwing channel produces no StageResult, so observers are
        // not notified.
        assert!(observer.is_empty());
    }

    #[tokio::test]
    async fn test_observer_failure_does_not_abort_run() {
        let node = Arc::new(StageNode::new(Arc::new(StaticStage::completing(
            "only",
            serde_json::json!(1),
        ))));
        let collecting = Arc::new(CollectingObserver::new());

        let mut pipeline = Pipeline::new(node);
        pipeline.add_observer(Arc::new(FailingObserver));
        pipeline.add_observer(collecting.clone());

        let ctx = pipeline.execute(serde_json::json!("in")).await;

        assert!(!ctx.has_errors());
        // The observer after the failing one still ran.
        assert_eq!(collecting.len(), 1);
    }

    #[tokio::test]
    async fn test_completed_without_data_is_contract_violation() {
        let node = Arc::new(StageNode::new(Arc::new(StaticStage::contract_breaking(
            "broken",
        ))));
        let pipeline = Pipeline::new(node);

        let ctx = pipeline.execute(serde_json::json!("in")).await;

        let errors = ctx.errors();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], StageError::ContractViolation { .. }));
    }

    #[tokio::test]
    async fn test_seed_echoed_into_fresh_context() {
        let node = Arc::new(StageNode::new(Arc::new(StaticStage::echoing("only"))));
        let mut pipeline = Pipeline::new(node);

        let mut seed = HashMap::new();
        seed.insert(keys::THEME_NAME.to_string(), serde_json::json!("modern"));
        pipeline.set_seed(seed);

        let first = pipeline.execute(serde_json::json!(1)).await;
        let second = pipeline.execute(serde_json::json!(2)).await;

        assert_eq!(first.get(keys::THEME_NAME), Some(serde_json::json!("modern")));
        assert_eq!(second.get(keys::THEME_NAME), Some(serde_json::json!("modern")));
        assert_ne!(first.run_id(), second.run_id());
    }

    #[tokio::test]
    async fn test_checkpoint_written_alongside_retry() {
        let dir = tempfile::tempdir().unwrap();

        let flaky = FlakyStage::throwing("flaky", 1, StageError::Timeout("api".into()));
        let attempts = flaky.attempt_counter();

        let node = Arc::new(StageNode::new(Arc::new(flaky)));
        let handler = ErrorHandler::new()
            .with_strategy(Arc::new(RetryStrategy::new(2, Duration::from_millis(1))))
            .with_strategy(Arc::new(AutoSaveStrategy::new(dir.path())));
        node.add_error_handler(Arc::new(handler));

        let pipeline = Pipeline::new(node);
        let ctx = pipeline.execute(serde_json::json!({"topic": "Testing"})).await;

        assert!(!ctx.has_errors());
        assert_eq!(attempts.load(std::sync::atomic::Ordering::SeqCst), 2);
        // The checkpoint strategy still ran even though retry had already
        // supplied the recovery data.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_stage_walker() {
        let a = Arc::new(StageNode::new(Arc::new(StaticStage::echoing("a"))));
        let b = Arc::new(StageNode::new(Arc::new(StaticStage::echoing("b"))));
        let c = Arc::new(StageNode::new(Arc::new(StaticStage::echoing("c"))));
        let pipeline = chain(vec![a, b, c]);

        let names: Vec<_> = pipeline.stages().iter().map(|n| n.name().to_string()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert!(pipeline.stage("b").is_some());
        assert!(pipeline.stage("missing").is_none());
    }
}
