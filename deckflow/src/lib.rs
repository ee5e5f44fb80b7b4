//! # Deckflow
//!
//! A resumable pipeline engine for staged content generation.
//!
//! Deckflow runs a sequential chain of stages, each transforming the data
//! produced by its predecessor, and routes failures through a pluggable
//! chain of recovery strategies before the pipeline either continues or
//! halts:
//!
//! - **Stage-based execution**: discrete units of work linked into a
//!   single-path chain
//! - **Shared run context**: a keyed bag of values plus an ordered error
//!   log, created fresh per run
//! - **Pluggable recovery**: retry with backoff, fallback content
//!   substitution, and checkpoint persistence, coordinated per stage
//! - **Observer notification**: progress callbacks after every stage
//!   attempt, isolated from the run
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use deckflow::prelude::*;
//!
//! // Wire a pipeline from collaborator stages
//! let factory = PipelineFactory::new("./work");
//! let pipeline = factory.create_pipeline(
//!     vec![validation, generation, slides, assembly],
//!     Some(PipelineConfig::new().with_theme("modern")),
//! )?;
//!
//! // Execute; inspect the context to distinguish success from failure
//! let ctx = pipeline.execute(input).await;
//! if ctx.has_errors() {
//!     eprintln!("run halted: {:?}", ctx.errors());
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod context;
pub mod core;
pub mod errors;
pub mod observability;
pub mod observers;
pub mod pipeline;
pub mod recovery;
pub mod stages;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::PipelineConfig;
    pub use crate::context::{keys, PipelineContext};
    pub use crate::core::{StageResult, StageStatus};
    pub use crate::errors::{PipelineBuildError, RecoveryError, StageError};
    pub use crate::observers::{
        CollectingObserver, LoggingObserver, NoOpObserver, PipelineObserver,
    };
    pub use crate::pipeline::{stage_names, Pipeline, PipelineBuilder, PipelineFactory};
    pub use crate::recovery::{
        AutoSaveStrategy, BackoffStrategy, Checkpoint, ErrorHandler, FallbackContentStrategy,
        JitterStrategy, RecoveryStrategy, RetryStrategy,
    };
    pub use crate::stages::{FnErrorHandler, Stage, StageErrorHandler, StageNode};
}
