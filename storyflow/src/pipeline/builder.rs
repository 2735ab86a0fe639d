//! Pipeline builder with validation.
//!
//! Collects the collaborators a run needs and assembles an [`Orchestrator`]
//! holding exactly the stages of the requested selection. A selection whose
//! collaborators are missing is rejected before any story is touched.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use super::{MixStage, NarrationStage, Orchestrator, Stage, ThumbnailStage, VideoStage};
use crate::config::PipelineConfig;
use crate::core::{ArtifactStore, StageKind, StageSelection};
use crate::errors::{Result, StoryflowError};
use crate::events::{EventSink, NoOpEventSink};
use crate::media::MediaToolkit;
use crate::mixer::AudioMixer;
use crate::narration::{NarrationSynthesizer, SpeechSynthesizer};
use crate::thumbnail::{load_prompt_overrides, ImageGenerator, ThumbnailProvisioner};
use crate::video::VideoComposer;

/// Builder for validated orchestrators.
pub struct PipelineBuilder {
    root: PathBuf,
    config: PipelineConfig,
    toolkit: Arc<dyn MediaToolkit>,
    speech: Option<Arc<dyn SpeechSynthesizer>>,
    images: Option<Arc<dyn ImageGenerator>>,
    sink: Arc<dyn EventSink>,
}

impl PipelineBuilder {
    /// Creates a builder for the project at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, config: PipelineConfig, toolkit: Arc<dyn MediaToolkit>) -> Self {
        Self {
            root: root.into(),
            config,
            toolkit,
            speech: None,
            images: None,
            sink: Arc::new(NoOpEventSink),
        }
    }

    /// Sets the speech collaborator.
    #[must_use]
    pub fn with_speech(mut self, speech: Arc<dyn SpeechSynthesizer>) -> Self {
        self.speech = Some(speech);
        self
    }

    /// Sets the image collaborator.
    #[must_use]
    pub fn with_images(mut self, images: Arc<dyn ImageGenerator>) -> Self {
        self.images = Some(images);
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Creates the remote clients needed by `selection` from `credentials`.
    ///
    /// Only credentials of selected stages are required, so `--step2` runs
    /// without any key.
    #[cfg(feature = "providers")]
    pub fn with_remote_clients(
        mut self,
        credentials: &crate::config::Credentials,
        selection: StageSelection,
    ) -> Result<Self> {
        if selection.includes(StageKind::Narration) {
            self.speech = Some(crate::narration::speech_client(&self.config.narration, credentials)?);
        }
        if selection.includes(StageKind::Thumbnail) {
            let key = credentials.require_images()?;
            self.images = Some(Arc::new(crate::thumbnail::OpenAiImages::new(
                key,
                &self.config.thumbnail,
            )?));
        }
        Ok(self)
    }

    /// The configuration the builder was created with.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The artifact store for the project.
    #[must_use]
    pub fn store(&self) -> ArtifactStore {
        ArtifactStore::new(&self.root, self.config.layout.clone())
    }

    /// Builds an orchestrator for `selection`.
    ///
    /// # Errors
    ///
    /// Returns a fatal configuration error if a selected stage lacks its
    /// collaborator or the prompts file is unreadable.
    pub fn build(self, selection: StageSelection) -> Result<Orchestrator> {
        let store = self.store();
        let mut orchestrator = Orchestrator::new(store.clone()).with_sink(self.sink.clone());

        for kind in selection.stages() {
            let stage = self.stage_for(kind, &store)?;
            orchestrator = orchestrator.with_stage(stage);
        }
        tracing::debug!(stages = ?orchestrator.registered(), "Pipeline built");
        Ok(orchestrator)
    }

    fn stage_for(&self, kind: StageKind, store: &ArtifactStore) -> Result<Arc<dyn Stage>> {
        let stage: Arc<dyn Stage> = match kind {
            StageKind::Narration => {
                let speech = self.speech.clone().ok_or_else(|| missing(kind, "speech synthesizer"))?;
                let synthesizer =
                    NarrationSynthesizer::new(speech, self.toolkit.clone(), &self.config.narration)
                        .with_retry(self.config.retry.clone());
                Arc::new(NarrationStage::new(synthesizer))
            }
            StageKind::Mix => Arc::new(MixStage::new(AudioMixer::new(
                self.toolkit.clone(),
                self.config.mix.clone(),
            ))),
            StageKind::Thumbnail => {
                let images = self.images.clone().ok_or_else(|| missing(kind, "image generator"))?;
                let provisioner = ThumbnailProvisioner::new(
                    images,
                    self.toolkit.clone(),
                    store.clone(),
                    self.config.thumbnail.clone(),
                )
                .with_prompts(self.prompt_overrides()?)
                .with_retry(self.config.retry.clone());
                Arc::new(ThumbnailStage::new(provisioner))
            }
            StageKind::Video => Arc::new(VideoStage::new(VideoComposer::new(
                self.toolkit.clone(),
                self.config.video.clone(),
            ))),
        };
        Ok(stage)
    }

    fn prompt_overrides(&self) -> Result<HashMap<String, String>> {
        match &self.config.thumbnail.prompts_file {
            Some(file) => load_prompt_overrides(&self.root.join(file)),
            None => Ok(HashMap::new()),
        }
    }
}

fn missing(kind: StageKind, what: &str) -> StoryflowError {
    StoryflowError::configuration(format!("{} stage selected but no {what} configured", kind.label()))
}

impl std::fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("root", &self.root)
            .field("speech", &self.speech.is_some())
            .field("images", &self.images.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeImageGenerator, FakeToolkit, ScriptedSpeech};
    use pretty_assertions::assert_eq;

    fn builder(root: &std::path::Path) -> PipelineBuilder {
        PipelineBuilder::new(root, PipelineConfig::new(), Arc::new(FakeToolkit::new()))
    }

    #[test]
    fn test_mix_only_needs_no_collaborators() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = builder(dir.path())
            .build(StageSelection::Only(StageKind::Mix))
            .unwrap();
        assert_eq!(orchestrator.registered(), vec![StageKind::Mix]);
    }

    #[test]
    fn test_missing_speech_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = builder(dir.path()).build(StageSelection::All).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("speech synthesizer"));
    }

    #[test]
    fn test_full_pipeline_registers_every_stage() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = builder(dir.path())
            .with_speech(Arc::new(ScriptedSpeech::new()))
            .with_images(Arc::new(FakeImageGenerator::new()))
            .build(StageSelection::All)
            .unwrap();
        assert_eq!(orchestrator.registered(), StageKind::ORDER.to_vec());
    }

    #[test]
    fn test_invalid_prompts_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("prompts.json"), "not json").unwrap();
        let err = builder(dir.path())
            .with_images(Arc::new(FakeImageGenerator::new()))
            .build(StageSelection::Only(StageKind::Thumbnail))
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[cfg(feature = "providers")]
    #[test]
    fn test_remote_clients_only_for_selected_stages() {
        use crate::config::Credentials;

        let dir = tempfile::tempdir().unwrap();
        let none = Credentials::default();
        assert!(builder(dir.path())
            .with_remote_clients(&none, StageSelection::Only(StageKind::Video))
            .is_ok());
        let err = builder(dir.path())
            .with_remote_clients(&none, StageSelection::Only(StageKind::Thumbnail))
            .unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }
}
