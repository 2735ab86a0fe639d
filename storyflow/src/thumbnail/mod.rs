//! Thumbnail provisioning.
//!
//! A thumbnail is generated once per story from a scene prompt, scaled to the
//! stored size and kept as PNG. Existing thumbnails are never regenerated.

#[cfg(feature = "providers")]
mod openai;

#[cfg(feature = "providers")]
pub use openai::OpenAiImages;

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::ThumbnailConfig;
use crate::core::{ArtifactKind, ArtifactStore};
use crate::errors::{Result, ServiceError, StoryflowError};
use crate::media::MediaToolkit;
use crate::pipeline::{with_retry, RetryConfig, ScratchSpace};

/// A remote image-generation collaborator.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generates an image for `prompt` and returns the encoded bytes.
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>, ServiceError>;
}

/// Default scene prompt for a story title.
#[must_use]
pub fn default_scene(title: &str) -> String {
    format!("A fairy tale scene depicting {title}.")
}

/// Reads per-story scene prompts from a JSON object. A missing file yields no
/// overrides.
pub fn load_prompt_overrides(path: &Path) -> Result<HashMap<String, String>> {
    if !path.is_file() {
        return Ok(HashMap::new());
    }
    let text = std::fs::read_to_string(path).map_err(|e| {
        StoryflowError::configuration(format!("cannot read prompts file {}: {e}", path.display()))
    })?;
    serde_json::from_str(&text).map_err(|e| {
        StoryflowError::configuration(format!("invalid prompts file {}: {e}", path.display()))
    })
}

/// Generates and stores thumbnails.
pub struct ThumbnailProvisioner {
    generator: Arc<dyn ImageGenerator>,
    toolkit: Arc<dyn MediaToolkit>,
    store: ArtifactStore,
    config: ThumbnailConfig,
    prompts: HashMap<String, String>,
    retry: RetryConfig,
}

impl ThumbnailProvisioner {
    /// Creates a provisioner writing into `store`.
    #[must_use]
    pub fn new(
        generator: Arc<dyn ImageGenerator>,
        toolkit: Arc<dyn MediaToolkit>,
        store: ArtifactStore,
        config: ThumbnailConfig,
    ) -> Self {
        Self {
            generator,
            toolkit,
            store,
            config,
            prompts: HashMap::new(),
            retry: RetryConfig::default(),
        }
    }

    /// Sets the retry policy for image generation.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets per-story scene prompts.
    #[must_use]
    pub fn with_prompts(mut self, prompts: HashMap<String, String>) -> Self {
        self.prompts = prompts;
        self
    }

    /// Scene prompt for a story: the configured override, else one built from
    /// the title.
    #[must_use]
    pub fn scene_for(&self, story: &str, title: &str) -> String {
        self.prompts
            .get(story)
            .cloned()
            .unwrap_or_else(|| default_scene(title))
    }

    /// The scene wrapped in the configured style.
    #[must_use]
    pub fn styled_prompt(&self, scene: &str) -> String {
        format!("{}{scene}{}", self.config.style_prefix, self.config.style_suffix)
    }

    /// Returns the thumbnail for `story`, generating it from `scene` if absent.
    pub async fn ensure_image(&self, story: &str, scene: &str) -> Result<PathBuf> {
        if let Some(existing) = self.store.find(story, ArtifactKind::Image) {
            debug!(story, path = %existing.display(), "Thumbnail exists, skipping");
            return Ok(existing);
        }

        info!(story, scene, "Generating thumbnail");
        let prompt = self.styled_prompt(scene);
        let key = format!("{story} thumbnail");
        let image = with_retry(&self.retry, &key, || self.generator.generate(&prompt)).await?;
        if image.is_empty() {
            return Err(ServiceError::invalid_response("images", "empty image payload").into());
        }

        let scratch = ScratchSpace::create(&self.store.temp_dir(), story)?;
        let raw = scratch.path("generated.png");
        let scaled = scratch.path("thumbnail.png");
        tokio::fs::write(&raw, &image).await?;
        self.toolkit
            .scale_image(&raw, &scaled, self.config.width, self.config.height)
            .await?;

        Ok(self.store.publish(&scaled, story, ArtifactKind::Image).await?)
    }
}

impl std::fmt::Debug for ThumbnailProvisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThumbnailProvisioner")
            .field("config", &self.config)
            .field("prompts", &self.prompts.len())
            .finish_non_exhaustive()
    }
}
