//! Canonical wiring for the presentation-generation pipeline.
//!
//! The factory attaches one recovery coordinator per stage name and
//! constructs the strategy lists. This is configuration around the engine,
//! not engine behavior: the stage implementations themselves are
//! collaborators supplied by the caller.

use super::{Pipeline, PipelineBuilder};
use crate::config::PipelineConfig;
use crate::errors::PipelineBuildError;
use crate::observers::LoggingObserver;
use crate::recovery::{AutoSaveStrategy, ErrorHandler, FallbackContentStrategy, RetryStrategy};
use crate::stages::Stage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// The canonical stage names of the presentation pipeline.
///
/// Recovery wiring is keyed by these names; the fallback-content strategy
/// gates on [`CONTENT_GENERATION`](stage_names::CONTENT_GENERATION).
pub mod stage_names {
    /// Validates and normalizes the initial user input.
    pub const INPUT_VALIDATION: &str = "Input Validation";
    /// Generates slide content, typically over network I/O.
    pub const CONTENT_GENERATION: &str = "Content Generation";
    /// Renders individual slides and applies the theme.
    pub const SLIDE_CREATION: &str = "Slide Creation";
    /// Assembles and exports the final document.
    pub const PRESENTATION_ASSEMBLY: &str = "Presentation Assembly";
}

/// Builds the recovery coordinator for the input-validation stage.
#[must_use]
pub fn input_validation_handler(checkpoints_dir: &Path) -> ErrorHandler {
    ErrorHandler::new()
        .with_strategy(Arc::new(RetryStrategy::new(2, Duration::from_secs(1))))
        .with_strategy(Arc::new(AutoSaveStrategy::new(checkpoints_dir)))
}

/// Builds the recovery coordinator for the content-generation stage.
///
/// The only handler that carries fallback content: generation is the one
/// stage talking to an unreliable upstream.
#[must_use]
pub fn content_generation_handler(
    checkpoints_dir: &Path,
    fallback_templates_dir: &Path,
) -> ErrorHandler {
    ErrorHandler::new()
        .with_strategy(Arc::new(RetryStrategy::new(3, Duration::from_secs(2))))
        .with_strategy(Arc::new(FallbackContentStrategy::new(fallback_templates_dir)))
        .with_strategy(Arc::new(AutoSaveStrategy::new(checkpoints_dir)))
}

/// Builds the recovery coordinator for the slide-creation stage.
#[must_use]
pub fn slide_creation_handler(checkpoints_dir: &Path) -> ErrorHandler {
    ErrorHandler::new()
        .with_strategy(Arc::new(RetryStrategy::new(2, Duration::from_secs(1))))
        .with_strategy(Arc::new(AutoSaveStrategy::new(checkpoints_dir)))
}

/// Builds the recovery coordinator for the presentation-assembly stage.
#[must_use]
pub fn presentation_assembly_handler(checkpoints_dir: &Path) -> ErrorHandler {
    ErrorHandler::new()
        .with_strategy(Arc::new(RetryStrategy::new(2, Duration::from_secs(1))))
        .with_strategy(Arc::new(AutoSaveStrategy::new(checkpoints_dir)))
}

/// Factory for fully wired presentation pipelines.
///
/// Derives the checkpoint and fallback-template directories from a base
/// directory, chains the collaborator stages in order, and attaches the
/// canonical per-stage recovery coordinators plus a progress observer.
#[derive(Debug)]
pub struct PipelineFactory {
    checkpoints_dir: PathBuf,
    fallback_templates_dir: PathBuf,
}

impl PipelineFactory {
    /// Creates a factory rooted at `base_dir`.
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        Self {
            checkpoints_dir: base_dir.join("checkpoints"),
            fallback_templates_dir: base_dir.join("templates").join("fallback"),
        }
    }

    /// Returns the checkpoint directory.
    #[must_use]
    pub fn checkpoints_dir(&self) -> &Path {
        &self.checkpoints_dir
    }

    /// Returns the fallback-template directory.
    #[must_use]
    pub fn fallback_templates_dir(&self) -> &Path {
        &self.fallback_templates_dir
    }

    /// Wires the collaborator stages into a pipeline.
    ///
    /// Stages run in the given order. Stages whose names match the
    /// canonical [`stage_names`] get the matching recovery coordinator;
    /// other stages run without recovery. Fresh strategy instances are
    /// constructed per pipeline, so retry budgets are per-pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineBuildError`] if the stage list is empty or names
    /// repeat.
    pub fn create_pipeline(
        &self,
        stages: Vec<Arc<dyn Stage>>,
        config: Option<PipelineConfig>,
    ) -> Result<Pipeline, PipelineBuildError> {
        let mut builder = PipelineBuilder::new();

        for stage in stages {
            let handler = self.handler_for(stage.name());
            let name = stage.name().to_string();
            builder = builder.stage(stage);
            if let Some(handler) = handler {
                builder = builder.handler(name, Arc::new(handler));
            }
        }

        builder = builder.observer(Arc::new(LoggingObserver));
        if let Some(config) = config {
            builder = builder.config(config);
        }

        builder.build()
    }

    fn handler_for(&self, stage_name: &str) -> Option<ErrorHandler> {
        match stage_name {
            stage_names::INPUT_VALIDATION => {
                Some(input_validation_handler(&self.checkpoints_dir))
            }
            stage_names::CONTENT_GENERATION => Some(content_generation_handler(
                &self.checkpoints_dir,
                &self.fallback_templates_dir,
            )),
            stage_names::SLIDE_CREATION => Some(slide_creation_handler(&self.checkpoints_dir)),
            stage_names::PRESENTATION_ASSEMBLY => {
                Some(presentation_assembly_handler(&self.checkpoints_dir))
            }
            _ => None,
        }
    }
}
