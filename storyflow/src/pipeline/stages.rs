//! Stage descriptors.
//!
//! Each stage exposes a precondition check over the artifact store and an
//! execute function that produces and publishes its artifact. The
//! orchestrator drives them without knowing what they do.

use async_trait::async_trait;
use std::path::PathBuf;

use super::ScratchSpace;
use crate::core::{ArtifactKind, ArtifactStore, StageKind, Story};
use crate::errors::{MissingInputError, Result};
use crate::mixer::AudioMixer;
use crate::narration::NarrationSynthesizer;
use crate::thumbnail::ThumbnailProvisioner;
use crate::video::VideoComposer;

/// What a stage sees when it runs for one story.
#[derive(Debug, Clone, Copy)]
pub struct StageContext<'a> {
    /// Story name.
    pub story: &'a str,
    /// The artifact store.
    pub store: &'a ArtifactStore,
}

impl<'a> StageContext<'a> {
    /// Creates a context.
    #[must_use]
    pub fn new(story: &'a str, store: &'a ArtifactStore) -> Self {
        Self { story, store }
    }

    fn require(&self, stage: StageKind, kind: ArtifactKind) -> std::result::Result<PathBuf, MissingInputError> {
        self.store
            .find(self.story, kind)
            .ok_or_else(|| MissingInputError::new(stage, kind, self.store.locate(self.story, kind)))
    }

    fn scratch(&self) -> Result<ScratchSpace> {
        Ok(ScratchSpace::create(&self.store.temp_dir(), self.story)?)
    }
}

/// One step of the pipeline.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Which stage this is.
    fn kind(&self) -> StageKind;

    /// Verifies that every input exists.
    fn check_inputs(&self, ctx: &StageContext<'_>) -> std::result::Result<(), MissingInputError>;

    /// Produces the artifact and returns its published path.
    async fn execute(&self, ctx: &StageContext<'_>) -> Result<PathBuf>;
}

/// Story script to narration.
#[derive(Debug)]
pub struct NarrationStage {
    synthesizer: NarrationSynthesizer,
}

impl NarrationStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(synthesizer: NarrationSynthesizer) -> Self {
        Self { synthesizer }
    }
}

#[async_trait]
impl Stage for NarrationStage {
    fn kind(&self) -> StageKind {
        StageKind::Narration
    }

    fn check_inputs(&self, ctx: &StageContext<'_>) -> std::result::Result<(), MissingInputError> {
        let path = ctx.store.story_path(ctx.story);
        if path.is_file() {
            Ok(())
        } else {
            Err(MissingInputError::story(StageKind::Narration, path))
        }
    }

    async fn execute(&self, ctx: &StageContext<'_>) -> Result<PathBuf> {
        let story = Story::new(ctx.story, ctx.store.story_path(ctx.story))?;
        let script = story.read().await?;
        let scratch = ctx.scratch()?;
        let produced = self.synthesizer.synthesize(ctx.story, &script, &scratch).await?;
        Ok(ctx.store.publish(&produced, ctx.story, ArtifactKind::Narration).await?)
    }
}

/// Narration to mixed audio.
#[derive(Debug)]
pub struct MixStage {
    mixer: AudioMixer,
}

impl MixStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(mixer: AudioMixer) -> Self {
        Self { mixer }
    }
}

#[async_trait]
impl Stage for MixStage {
    fn kind(&self) -> StageKind {
        StageKind::Mix
    }

    fn check_inputs(&self, ctx: &StageContext<'_>) -> std::result::Result<(), MissingInputError> {
        ctx.require(StageKind::Mix, ArtifactKind::Narration).map(|_| ())
    }

    async fn execute(&self, ctx: &StageContext<'_>) -> Result<PathBuf> {
        let narration = ctx.require(StageKind::Mix, ArtifactKind::Narration)?;
        let music = ctx.store.background_music();
        let scratch = ctx.scratch()?;
        let produced = self.mixer.mix(&narration, music.as_deref(), &scratch).await?;
        Ok(ctx.store.publish(&produced, ctx.story, ArtifactKind::MixedAudio).await?)
    }
}

/// Story title to thumbnail.
#[derive(Debug)]
pub struct ThumbnailStage {
    provisioner: ThumbnailProvisioner,
}

impl ThumbnailStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(provisioner: ThumbnailProvisioner) -> Self {
        Self { provisioner }
    }
}

#[async_trait]
impl Stage for ThumbnailStage {
    fn kind(&self) -> StageKind {
        StageKind::Thumbnail
    }

    fn check_inputs(&self, _ctx: &StageContext<'_>) -> std::result::Result<(), MissingInputError> {
        Ok(())
    }

    async fn execute(&self, ctx: &StageContext<'_>) -> Result<PathBuf> {
        let title = Story::new(ctx.story, ctx.store.story_path(ctx.story))?
            .title()
            .await;
        let scene = self.provisioner.scene_for(ctx.story, &title);
        self.provisioner.ensure_image(ctx.story, &scene).await
    }
}

/// Thumbnail plus mixed audio to video.
#[derive(Debug)]
pub struct VideoStage {
    composer: VideoComposer,
}

impl VideoStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(composer: VideoComposer) -> Self {
        Self { composer }
    }
}

#[async_trait]
impl Stage for VideoStage {
    fn kind(&self) -> StageKind {
        StageKind::Video
    }

    fn check_inputs(&self, ctx: &StageContext<'_>) -> std::result::Result<(), MissingInputError> {
        ctx.require(StageKind::Video, ArtifactKind::Image)?;
        ctx.require(StageKind::Video, ArtifactKind::MixedAudio)?;
        Ok(())
    }

    async fn execute(&self, ctx: &StageContext<'_>) -> Result<PathBuf> {
        let image = ctx.require(StageKind::Video, ArtifactKind::Image)?;
        let audio = ctx.require(StageKind::Video, ArtifactKind::MixedAudio)?;
        let scratch = ctx.scratch()?;
        let produced = self.composer.compose(&image, &audio, &scratch).await?;
        Ok(ctx.store.publish(&produced, ctx.story, ArtifactKind::Video).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MixConfig, NarrationConfig, VideoConfig};
    use crate::pipeline::RetryConfig;
    use crate::testing::{FakeToolkit, ProjectFixture, ScriptedSpeech};
    use std::sync::Arc;

    #[test]
    fn test_video_requires_image_then_mixed_audio() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = ProjectFixture::new(dir.path()).unwrap();
        let store = fixture.store();
        let stage = VideoStage::new(VideoComposer::new(Arc::new(FakeToolkit::new()), VideoConfig::default()));
        let ctx = StageContext::new("fox", &store);

        let err = stage.check_inputs(&ctx).unwrap_err();
        assert_eq!(err.input, "image");

        fixture.write_artifact("fox", ArtifactKind::Image, b"png").unwrap();
        let err = stage.check_inputs(&ctx).unwrap_err();
        assert_eq!(err.input, "mixed audio");

        fixture.write_artifact("fox", ArtifactKind::MixedAudio, b"mp3").unwrap();
        assert!(stage.check_inputs(&ctx).is_ok());
    }

    #[tokio::test]
    async fn test_mix_stage_publishes_and_cleans_scratch() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = ProjectFixture::new(dir.path()).unwrap();
        fixture.write_artifact("fox", ArtifactKind::Narration, b"narration").unwrap();
        let store = fixture.store();
        let stage = MixStage::new(AudioMixer::new(Arc::new(FakeToolkit::new()), MixConfig::default()));

        let path = stage.execute(&StageContext::new("fox", &store)).await.unwrap();

        assert_eq!(path, store.locate("fox", ArtifactKind::MixedAudio));
        assert_eq!(std::fs::read(path).unwrap(), b"narration");
        assert!(!store.temp_dir().join("fox").exists());
    }

    #[tokio::test]
    async fn test_narration_stage_reads_story() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = ProjectFixture::new(dir.path()).unwrap();
        fixture.write_story("fox", "# The Fox\n\nThe fox ran.").unwrap();
        let store = fixture.store();
        let speech = Arc::new(ScriptedSpeech::new());
        let synthesizer = NarrationSynthesizer::new(
            speech.clone(),
            Arc::new(FakeToolkit::new()),
            &NarrationConfig::default(),
        )
        .with_retry(RetryConfig::immediate());
        let stage = NarrationStage::new(synthesizer);
        let ctx = StageContext::new("fox", &store);

        assert!(stage.check_inputs(&StageContext::new("wolf", &store)).is_err());
        stage.check_inputs(&ctx).unwrap();
        let path = stage.execute(&ctx).await.unwrap();

        assert_eq!(speech.requests(), vec!["The fox ran."]);
        assert_eq!(std::fs::read(path).unwrap(), b"[alloy]The fox ran.");
    }
}
