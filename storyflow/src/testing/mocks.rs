//! In-memory doubles for the pipeline's collaborators.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};

use crate::errors::{Result, ServiceError, StoryflowError, ToolError};
use crate::media::{concat_manifest, MediaToolkit, MixPlan, VideoPlan};
use crate::narration::SpeechSynthesizer;
use crate::thumbnail::ImageGenerator;

/// Duration reported for files the fake has not been told about.
pub const DEFAULT_FAKE_DURATION: f64 = 30.0;

/// A media toolkit that records calls and writes deterministic outputs.
///
/// Outputs carry their inputs' bytes so tests can check what went where:
/// concatenation appends inputs, mixing and rendering prefix the input audio,
/// and scaling copies the image. Durations are tracked per path.
#[derive(Debug, Default)]
pub struct FakeToolkit {
    calls: Mutex<Vec<String>>,
    durations: Mutex<HashMap<PathBuf, f64>>,
    failures: Mutex<Vec<(String, String)>>,
    mix_plans: Mutex<Vec<MixPlan>>,
    video_plans: Mutex<Vec<VideoPlan>>,
    unavailable: bool,
}

impl FakeToolkit {
    /// Creates a working fake.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports `seconds` when `path` is probed.
    #[must_use]
    pub fn with_duration(self, path: &Path, seconds: f64) -> Self {
        self.durations.lock().insert(path.to_path_buf(), seconds);
        self
    }

    /// Fails `operation` whenever one of its paths contains `fragment`.
    #[must_use]
    pub fn fail_on(self, operation: &str, fragment: &str) -> Self {
        self.failures
            .lock()
            .push((operation.to_string(), fragment.to_string()));
        self
    }

    /// Makes `validate` report the tools as missing.
    #[must_use]
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    /// Names of the operations invoked, in order. `validate` is not recorded.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Number of times `operation` was invoked.
    #[must_use]
    pub fn call_count(&self, operation: &str) -> usize {
        self.calls.lock().iter().filter(|c| *c == operation).count()
    }

    /// Plans passed to `mix`.
    #[must_use]
    pub fn mix_plans(&self) -> Vec<MixPlan> {
        self.mix_plans.lock().clone()
    }

    /// Plans passed to `compose_video`.
    #[must_use]
    pub fn video_plans(&self) -> Vec<VideoPlan> {
        self.video_plans.lock().clone()
    }

    fn enter(&self, operation: &str, paths: &[&Path]) -> Result<()> {
        self.calls.lock().push(operation.to_string());
        let failures = self.failures.lock();
        let injected = failures.iter().any(|(op, fragment)| {
            op == operation
                && paths
                    .iter()
                    .any(|p| p.to_string_lossy().contains(fragment.as_str()))
        });
        if injected {
            return Err(ToolError::failed("ffmpeg", Some(1), &format!("injected {operation} failure")).into());
        }
        Ok(())
    }

    fn duration_of(&self, path: &Path) -> f64 {
        self.durations
            .lock()
            .get(path)
            .copied()
            .unwrap_or(DEFAULT_FAKE_DURATION)
    }

    async fn write_prefixed(prefix: &[u8], source: &Path, output: &Path) -> Result<()> {
        let mut bytes = prefix.to_vec();
        bytes.extend(tokio::fs::read(source).await?);
        tokio::fs::write(output, bytes).await?;
        Ok(())
    }
}

#[async_trait]
impl MediaToolkit for FakeToolkit {
    async fn validate(&self) -> Result<()> {
        if self.unavailable {
            return Err(StoryflowError::configuration("ffmpeg is required but not usable"));
        }
        Ok(())
    }

    async fn probe_duration(&self, path: &Path) -> Result<f64> {
        self.enter("probe", &[path])?;
        Ok(self.duration_of(path))
    }

    async fn concat(&self, inputs: &[PathBuf], manifest: &Path, output: &Path) -> Result<()> {
        let paths: Vec<&Path> = inputs.iter().map(PathBuf::as_path).chain([output]).collect();
        self.enter("concat", &paths)?;
        tokio::fs::write(manifest, concat_manifest(inputs)).await?;

        let mut bytes = Vec::new();
        let mut total = 0.0;
        for input in inputs {
            bytes.extend(tokio::fs::read(input).await?);
            total += self.duration_of(input);
        }
        tokio::fs::write(output, bytes).await?;
        self.durations.lock().insert(output.to_path_buf(), total);
        Ok(())
    }

    async fn mix(&self, narration: &Path, music: &Path, output: &Path, plan: &MixPlan) -> Result<()> {
        self.enter("mix", &[narration, music, output])?;
        self.mix_plans.lock().push(plan.clone());
        Self::write_prefixed(b"mixed:", narration, output).await?;
        self.durations
            .lock()
            .insert(output.to_path_buf(), plan.duration_seconds);
        Ok(())
    }

    async fn compose_video(&self, image: &Path, audio: &Path, output: &Path, plan: &VideoPlan) -> Result<()> {
        self.enter("compose_video", &[image, audio, output])?;
        self.video_plans.lock().push(plan.clone());
        Self::write_prefixed(b"video:", audio, output).await?;
        self.durations
            .lock()
            .insert(output.to_path_buf(), plan.duration_seconds);
        Ok(())
    }

    async fn scale_image(&self, input: &Path, output: &Path, _width: u32, _height: u32) -> Result<()> {
        self.enter("scale_image", &[input, output])?;
        tokio::fs::copy(input, output).await?;
        Ok(())
    }
}

/// A speech collaborator that echoes its input as audio bytes.
#[derive(Debug, Default)]
pub struct ScriptedSpeech {
    requests: Mutex<Vec<String>>,
    queued_failures: Mutex<VecDeque<ServiceError>>,
    failing_texts: Mutex<Vec<(String, ServiceError)>>,
}

impl ScriptedSpeech {
    /// Creates a collaborator that always succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the next call with `error` before succeeding again.
    #[must_use]
    pub fn then_fail(self, error: ServiceError) -> Self {
        self.queued_failures.lock().push_back(error);
        self
    }

    /// Fails every call whose text contains `fragment`.
    #[must_use]
    pub fn fail_when_text_contains(self, fragment: &str, error: ServiceError) -> Self {
        self.failing_texts.lock().push((fragment.to_string(), error));
        self
    }

    /// Texts received, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    /// Number of synthesis calls.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl SpeechSynthesizer for ScriptedSpeech {
    async fn synthesize(&self, text: &str, voice: &str) -> std::result::Result<Vec<u8>, ServiceError> {
        self.requests.lock().push(text.to_string());
        if let Some(error) = self.queued_failures.lock().pop_front() {
            return Err(error);
        }
        if let Some((_, error)) = self
            .failing_texts
            .lock()
            .iter()
            .find(|(fragment, _)| text.contains(fragment.as_str()))
        {
            return Err(error.clone());
        }
        Ok(format!("[{voice}]{text}").into_bytes())
    }
}

/// An image collaborator that returns a fixed payload.
#[derive(Debug)]
pub struct FakeImageGenerator {
    payload: Vec<u8>,
    prompts: Mutex<Vec<String>>,
    failure: Option<ServiceError>,
}

impl Default for FakeImageGenerator {
    fn default() -> Self {
        Self {
            payload: b"\x89PNG\r\n\x1a\nfake".to_vec(),
            prompts: Mutex::new(Vec::new()),
            failure: None,
        }
    }
}

impl FakeImageGenerator {
    /// Creates a generator that always succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails every call with `error`.
    #[must_use]
    pub fn failing(error: ServiceError) -> Self {
        Self {
            failure: Some(error),
            ..Self::default()
        }
    }

    /// Prompts received, in order.
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl ImageGenerator for FakeImageGenerator {
    async fn generate(&self, prompt: &str) -> std::result::Result<Vec<u8>, ServiceError> {
        self.prompts.lock().push(prompt.to_string());
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(self.payload.clone()),
        }
    }
}
