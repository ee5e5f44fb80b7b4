//! Fluent pipeline construction.

use super::Pipeline;
use crate::config::PipelineConfig;
use crate::errors::PipelineBuildError;
use crate::observers::PipelineObserver;
use crate::stages::{Stage, StageErrorHandler, StageNode};
use std::collections::HashSet;
use std::sync::Arc;

/// Builds a [`Pipeline`] from stages, handlers, observers, and
/// configuration.
///
/// Stages run in the order they are added; each stage's successor is the
/// next one added. Validation happens at [`build`](Self::build): the chain
/// must be non-empty, stage names must be unique, and handlers must
/// reference stages that exist.
#[derive(Default)]
pub struct PipelineBuilder {
    stages: Vec<Arc<StageNode>>,
    handlers: Vec<(String, Arc<dyn StageErrorHandler>)>,
    observers: Vec<Arc<dyn PipelineObserver>>,
    config: Option<PipelineConfig>,
}

impl PipelineBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage to the chain.
    #[must_use]
    pub fn stage(mut self, stage: Arc<dyn Stage>) -> Self {
        self.stages.push(Arc::new(StageNode::new(stage)));
        self
    }

    /// Attaches an error handler to the named stage.
    #[must_use]
    pub fn handler(
        mut self,
        stage_name: impl Into<String>,
        handler: Arc<dyn StageErrorHandler>,
    ) -> Self {
        self.handlers.push((stage_name.into(), handler));
        self
    }

    /// Appends a pipeline observer.
    #[must_use]
    pub fn observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Sets the configuration echoed into every run context.
    #[must_use]
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Returns the number of stages added so far.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Validates the wiring and produces the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineBuildError`] if the chain is empty, a stage name
    /// repeats, or a handler references an unknown stage.
    pub fn build(self) -> Result<Pipeline, PipelineBuildError> {
        let Some(initial) = self.stages.first().cloned() else {
            return Err(PipelineBuildError::Empty);
        };

        let mut seen = HashSet::new();
        for node in &self.stages {
            if !seen.insert(node.name().to_string()) {
                return Err(PipelineBuildError::DuplicateStage(node.name().to_string()));
            }
        }

        for pair in self.stages.windows(2) {
            pair[0].set_successor(pair[1].clone());
        }

        for (stage_name, handler) in self.handlers {
            let node = self
                .stages
                .iter()
                .find(|node| node.name() == stage_name)
                .ok_or(PipelineBuildError::UnknownStage(stage_name))?;
            node.add_error_handler(handler);
        }

        let mut pipeline = Pipeline::new(initial);
        for observer in self.observers {
            pipeline.add_observer(observer);
        }
        if let Some(config) = self.config {
            pipeline.set_seed(config.seed());
        }

        Ok(pipeline)
    }
}
