//! Pipeline configuration echoed into run contexts.

use crate::context::keys;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configuration the wiring layer echoes into every run context.
///
/// Stages read these through the well-known keys in
/// [`context::keys`](crate::context::keys); only the fields that are set
/// appear in the context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Theme applied during slide creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme_name: Option<String>,

    /// Export format of the final document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_format: Option<String>,

    /// Retry budget hint for stages that do their own retrying.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,

    /// Whether checkpoint persistence is enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoints_enabled: Option<bool>,

    /// Whether fallback templates are enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_templates_enabled: Option<bool>,
}

impl PipelineConfig {
    /// Creates an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the theme name.
    #[must_use]
    pub fn with_theme(mut self, theme: impl Into<String>) -> Self {
        self.theme_name = Some(theme.into());
        self
    }

    /// Sets the output format.
    #[must_use]
    pub fn with_output_format(mut self, format: impl Into<String>) -> Self {
        self.output_format = Some(format.into());
        self
    }

    /// Sets the retry budget hint.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Enables or disables checkpoint persistence.
    #[must_use]
    pub fn with_checkpoints_enabled(mut self, enabled: bool) -> Self {
        self.checkpoints_enabled = Some(enabled);
        self
    }

    /// Enables or disables fallback templates.
    #[must_use]
    pub fn with_fallback_templates_enabled(mut self, enabled: bool) -> Self {
        self.fallback_templates_enabled = Some(enabled);
        self
    }

    /// Produces the context entries for the set fields.
    #[must_use]
    pub fn seed(&self) -> HashMap<String, serde_json::Value> {
        let mut seed = HashMap::new();
        if let Some(ref theme) = self.theme_name {
            seed.insert(keys::THEME_NAME.to_string(), serde_json::json!(theme));
        }
        if let Some(ref format) = self.output_format {
            seed.insert(keys::OUTPUT_FORMAT.to_string(), serde_json::json!(format));
        }
        if let Some(max_retries) = self.max_retries {
            seed.insert(keys::MAX_RETRIES.to_string(), serde_json::json!(max_retries));
        }
        if let Some(enabled) = self.checkpoints_enabled {
            seed.insert(
                keys::CHECKPOINTS_ENABLED.to_string(),
                serde_json::json!(enabled),
            );
        }
        if let Some(enabled) = self.fallback_templates_enabled {
            seed.insert(
                keys::FALLBACK_TEMPLATES_ENABLED.to_string(),
                serde_json::json!(enabled),
            );
        }
        seed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_config_seeds_nothing() {
        assert!(PipelineConfig::new().seed().is_empty());
    }

    #[test]
    fn test_seed_contains_set_fields_only() {
        let config = PipelineConfig::new()
            .with_theme("modern")
            .with_max_retries(3)
            .with_checkpoints_enabled(true);

        let seed = config.seed();
        assert_eq!(seed.len(), 3);
        assert_eq!(seed.get(keys::THEME_NAME), Some(&serde_json::json!("modern")));
        assert_eq!(seed.get(keys::MAX_RETRIES), Some(&serde_json::json!(3)));
        assert_eq!(
            seed.get(keys::CHECKPOINTS_ENABLED),
            Some(&serde_json::json!(true))
        );
        assert!(!seed.contains_key(keys::OUTPUT_FORMAT));
    }

    #[test]
    fn test_deserialize_from_json() {
        let config: PipelineConfig = serde_json::from_str(
            r#"{"theme_name": "classic", "output_format": "pptx", "fallback_templates_enabled": false}"#,
        )
        .unwrap();

        assert_eq!(config.theme_name.as_deref(), Some("classic"));
        assert_eq!(config.output_format.as_deref(), Some("pptx"));
        assert_eq!(config.fallback_templates_enabled, Some(false));
        assert_eq!(config.max_retries, None);
    }
}
