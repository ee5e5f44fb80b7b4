//! Well-known context keys.
//!
//! The engine and the recovery strategies communicate through these keys;
//! stages may read the configuration keys echoed in by the wiring layer.

/// The input data of the stage currently being dispatched.
///
/// Written by the engine before every stage attempt; read by recovery
/// strategies to know what to retry.
pub const STAGE_INPUT_DATA: &str = "stage_input_data";

/// The name of the stage currently being dispatched.
///
/// Written by the engine before every stage attempt; keys retry counters
/// and the fallback strategy's stage gate.
pub const CURRENT_STAGE_NAME: &str = "current_stage_name";

/// The presentation topic, used to locate fallback content.
pub const TOPIC: &str = "topic";

/// The most recent retry attempt number, recorded by the retry strategy.
pub const RETRY_ATTEMPT: &str = "retry_attempt";

/// The name of the strategy that last attempted recovery.
pub const RECOVERY_STRATEGY: &str = "recovery_strategy";

/// Partial results accumulated before a failure, persisted into checkpoints.
pub const PARTIAL_RESULTS: &str = "partial_results";

/// Configured theme name, echoed in by the wiring layer.
pub const THEME_NAME: &str = "theme_name";

/// Configured output format, echoed in by the wiring layer.
pub const OUTPUT_FORMAT: &str = "output_format";

/// Configured retry budget, echoed in by the wiring layer.
pub const MAX_RETRIES: &str = "max_retries";

/// Whether checkpointing is enabled, echoed in by the wiring layer.
pub const CHECKPOINTS_ENABLED: &str = "checkpoints_enabled";

/// Whether fallback templates are enabled, echoed in by the wiring layer.
pub const FALLBACK_TEMPLATES_ENABLED: &str = "fallback_templates_enabled";
