//! Retry with backoff.

use super::RecoveryStrategy;
use crate::context::{keys, PipelineContext};
use crate::errors::{RecoveryError, StageError};
use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, warn};

/// Backoff strategy for retry delays.
#[derive(Debug, Clone, Copy)]
pub enum BackoffStrategy {
    /// Constant delay between retries.
    Constant(Duration),
    /// Linear increase: delay * attempt.
    Linear(Duration),
    /// Exponential: delay * 2^(attempt - 1).
    Exponential(Duration),
}

impl BackoffStrategy {
    /// Calculates the delay for a given attempt (1-indexed).
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        match self {
            Self::Constant(d) => *d,
            Self::Linear(d) => *d * attempt,
            Self::Exponential(d) => *d * 2u32.pow(attempt.saturating_sub(1)),
        }
    }
}

/// Jitter strategy for spreading out retry delays.
#[derive(Debug, Clone, Copy)]
pub enum JitterStrategy {
    /// No jitter.
    None,
    /// Full jitter: [0, delay].
    Full,
    /// Equal jitter: [delay/2, delay].
    Equal,
}

impl JitterStrategy {
    /// Applies jitter to a delay.
    #[must_use]
    pub fn apply(&self, delay: Duration) -> Duration {
        let mut rng = rand::thread_rng();

        match self {
            Self::None => delay,
            Self::Full => {
                let millis = delay.as_millis() as u64;
                Duration::from_millis(rng.gen_range(0..=millis))
            }
            Self::Equal => {
                let millis = delay.as_millis() as u64;
                let half = millis / 2;
                Duration::from_millis(half + rng.gen_range(0..=half))
            }
        }
    }
}

/// Strategy that retries the failed stage with backoff.
///
/// Attempt counters are keyed by stage name and persist for the lifetime of
/// the strategy instance, NOT per pipeline run. A strategy shared across
/// runs therefore shares its retry budget across them; construct a fresh
/// instance per pipeline unless cross-run budgeting is wanted.
#[derive(Debug)]
pub struct RetryStrategy {
    max_retries: u32,
    initial_delay: Duration,
    backoff: BackoffStrategy,
    jitter: JitterStrategy,
    retry_counts: Mutex<HashMap<String, u32>>,
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

impl RetryStrategy {
    /// Creates a retry strategy with exponential backoff and no jitter.
    #[must_use]
    pub fn new(max_retries: u32, initial_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
            backoff: BackoffStrategy::Exponential(initial_delay),
            jitter: JitterStrategy::None,
            retry_counts: Mutex::new(HashMap::new()),
        }
    }

    /// Sets the backoff strategy.
    #[must_use]
    pub fn with_backoff(mut self, backoff: BackoffStrategy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Sets the jitter strategy.
    #[must_use]
    pub fn with_jitter(mut self, jitter: JitterStrategy) -> Self {
        self.jitter = jitter;
        self
    }

    /// Returns the configured retry budget.
    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Returns the attempts consumed so far for a stage name.
    #[must_use]
    pub fn attempts_for(&self, stage_name: &str) -> u32 {
        self.retry_counts
            .lock()
            .get(stage_name)
            .copied()
            .unwrap_or(0)
    }

    fn calculate_delay(&self, attempt: u32) -> Duration {
        self.jitter.apply(self.backoff.delay(attempt))
    }
}

#[async_trait]
impl RecoveryStrategy for RetryStrategy {
    fn name(&self) -> &str {
        "RetryStrategy"
    }

    async fn can_recover(&self, _error: &StageError, ctx: &PipelineContext) -> bool {
        let stage_name = ctx.get_str(keys::CURRENT_STAGE_NAME).unwrap_or_default();
        self.attempts_for(&stage_name) < self.max_retries
    }

    async fn recover(
        &self,
        _error: &StageError,
        ctx: &PipelineContext,
    ) -> Result<Option<serde_json::Value>, RecoveryError> {
        let stage_name = ctx
            .get_str(keys::CURRENT_STAGE_NAME)
            .ok_or(RecoveryError::MissingContext(keys::CURRENT_STAGE_NAME))?;

        let attempt = {
            let mut counts = self.retry_counts.lock();
            let count = counts.entry(stage_name.clone()).or_insert(0);
            *count += 1;
            *count
        };

        let delay = self.calculate_delay(attempt);
        info!(
            stage = %stage_name,
            attempt,
            max_retries = self.max_retries,
            delay_ms = delay.as_millis() as u64,
            "retrying stage after backoff"
        );
        tokio::time::sleep(delay).await;

        // Without the original input there is nothing to retry with.
        let Some(input_data) = ctx.get(keys::STAGE_INPUT_DATA) else {
            warn!(stage = %stage_name, "no stage input data available for retry");
            return Ok(None);
        };

        ctx.set(keys::RETRY_ATTEMPT, serde_json::json!(attempt));
        ctx.set(keys::RECOVERY_STRATEGY, serde_json::json!(self.name()));

        Ok(Some(input_data))
    }
}
