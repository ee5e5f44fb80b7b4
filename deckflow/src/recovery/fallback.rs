//! Fallback content substitution.

use super::RecoveryStrategy;
use crate::context::{keys, PipelineContext};
use crate::errors::{RecoveryError, StageError};
use crate::pipeline::stage_names;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::info;

/// Strategy that substitutes pre-authored content when live content
/// generation is unavailable.
///
/// Applies only to the connectivity/timeout class of errors, and only while
/// the Content Generation stage is the one failing. The fallback document
/// is looked up by sanitized topic name under a configured directory; its
/// schema is owned by the content-generation collaborator.
#[derive(Debug)]
pub struct FallbackContentStrategy {
    templates_dir: PathBuf,
}

impl FallbackContentStrategy {
    /// Creates a strategy reading fallback documents from `templates_dir`.
    #[must_use]
    pub fn new(templates_dir: impl Into<PathBuf>) -> Self {
        Self {
            templates_dir: templates_dir.into(),
        }
    }

    /// Returns the configured template directory.
    #[must_use]
    pub fn templates_dir(&self) -> &Path {
        &self.templates_dir
    }

    /// Maps a topic to its fallback file name: lowercased, spaces replaced
    /// with underscores.
    #[must_use]
    pub fn sanitize_topic(topic: &str) -> String {
        format!("{}.json", topic.to_lowercase().replace(' ', "_"))
    }
}

#[async_trait]
impl RecoveryStrategy for FallbackContentStrategy {
    fn name(&self) -> &str {
        "FallbackContentStrategy"
    }

    async fn can_recover(&self, error: &StageError, ctx: &PipelineContext) -> bool {
        error.is_transient()
            && ctx.get_str(keys::CURRENT_STAGE_NAME).as_deref()
                == Some(stage_names::CONTENT_GENERATION)
    }

    async fn recover(
        &self,
        _error: &StageError,
        ctx: &PipelineContext,
    ) -> Result<Option<serde_json::Value>, RecoveryError> {
        let topic = ctx
            .get_str(keys::TOPIC)
            .ok_or(RecoveryError::MissingContext(keys::TOPIC))?;

        let template_path = self.templates_dir.join(Self::sanitize_topic(&topic));
        if !template_path.exists() {
            return Ok(None);
        }

        let raw = tokio::fs::read_to_string(&template_path).await?;
        let content: serde_json::Value = serde_json::from_str(&raw)?;

        info!(topic = %topic, path = %template_path.display(), "using fallback template");
        Ok(Some(content))
    }
}
