//! The mutable per-run context.

use crate::errors::StageError;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

/// The shared state of one pipeline run.
///
/// A context is created fresh at the start of every
/// [`Pipeline::execute`](crate::pipeline::Pipeline::execute) call and lives
/// for exactly that run. It holds a keyed bag of values (overwrite on set,
/// last write wins) and an ordered log of errors. Stages, observers, and
/// recovery strategies all mutate it through a shared reference.
///
/// The engine drives exactly one stage at a time, so there is no concurrent
/// contention; the locks exist so the context can be shared immutably and
/// are never held across an await point.
#[derive(Debug)]
pub struct PipelineContext {
    run_id: Uuid,
    data: RwLock<HashMap<String, serde_json::Value>>,
    errors: RwLock<Vec<StageError>>,
}

impl Default for PipelineContext {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineContext {
    /// Creates an empty context with a generated run ID.
    #[must_use]
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            data: RwLock::new(HashMap::new()),
            errors: RwLock::new(Vec::new()),
        }
    }

    /// Creates a context pre-seeded with the given entries.
    ///
    /// The wiring layer uses this to echo configuration into every run.
    #[must_use]
    pub fn with_seed(seed: HashMap<String, serde_json::Value>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            data: RwLock::new(seed),
            errors: RwLock::new(Vec::new()),
        }
    }

    /// Returns the unique ID of this run.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Stores a value, overwriting any previous value under the key.
    pub fn set(&self, key: impl Into<String>, value: serde_json::Value) {
        self.data.write().insert(key.into(), value);
    }

    /// Retrieves a value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.data.read().get(key).cloned()
    }

    /// Retrieves a value by key, or the default on a miss. Never fails.
    #[must_use]
    pub fn get_or(&self, key: &str, default: serde_json::Value) -> serde_json::Value {
        self.data.read().get(key).cloned().unwrap_or(default)
    }

    /// Retrieves a string value by key.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.data
            .read()
            .get(key)
            .and_then(|v| v.as_str().map(ToOwned::to_owned))
    }

    /// Checks whether a key is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.read().contains_key(key)
    }

    /// Appends an error to the run's error log.
    pub fn add_error(&self, error: StageError) {
        self.errors.write().push(error);
    }

    /// Removes the first recorded error equal to `error`.
    ///
    /// Returns true if an entry was removed. Used only by the recovery
    /// coordinator, which removes the triggering error exactly once after a
    /// successful recovery.
    pub fn remove_error(&self, error: &StageError) -> bool {
        let mut errors = self.errors.write();
        if let Some(pos) = errors.iter().position(|e| e == error) {
            errors.remove(pos);
            true
        } else {
            false
        }
    }

    /// Returns a snapshot of the recorded errors, in order.
    #[must_use]
    pub fn errors(&self) -> Vec<StageError> {
        self.errors.read().clone()
    }

    /// Returns the number of recorded errors.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.errors.read().len()
    }

    /// Returns true if any error has been recorded.
    ///
    /// `execute` never fails, so this is how callers distinguish a run that
    /// completed from one that halted.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.read().is_empty()
    }

    /// Returns a copy of all stored data.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        self.data.read().clone()
    }
}
