//! Error-recovery strategies and their coordinator.
//!
//! A stage failure is handed to an ordered chain of [`RecoveryStrategy`]
//! implementations through an [`ErrorHandler`] coordinator. Each strategy
//! decides whether it applies and, if so, produces replacement input data
//! for the failed stage or signals that it cannot help.

mod checkpoint;
mod fallback;
mod handler;
mod retry;

pub use checkpoint::{AutoSaveStrategy, Checkpoint};
pub use fallback::FallbackContentStrategy;
pub use handler::ErrorHandler;
pub use retry::{BackoffStrategy, JitterStrategy, RetryStrategy};

use crate::context::PipelineContext;
use crate::errors::{RecoveryError, StageError};
use async_trait::async_trait;
use std::fmt::Debug;

/// A policy that may supply replacement input data when a stage fails.
///
/// `recover` returning `Ok(None)` means the strategy ran but could not
/// produce recovery data; returning `Err` means the strategy itself failed,
/// which the coordinator logs and treats the same way. Neither aborts
/// evaluation of the remaining strategies.
#[async_trait]
pub trait RecoveryStrategy: Send + Sync + Debug {
    /// Returns the strategy name, recorded into the context for
    /// observability.
    fn name(&self) -> &str;

    /// Decides whether this strategy applies to the given error and context.
    async fn can_recover(&self, error: &StageError, ctx: &PipelineContext) -> bool;

    /// Attempts recovery, returning replacement input data on success.
    async fn recover(
        &self,
        error: &StageError,
        ctx: &PipelineContext,
    ) -> Result<Option<serde_json::Value>, RecoveryError>;
}
