//! Chunked synthesis with retry and concatenation.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::{chunk_text, clean_story_text, SpeechSynthesizer};
use crate::config::NarrationConfig;
use crate::errors::{Result, ServiceError, StoryflowError};
use crate::media::MediaToolkit;
use crate::pipeline::{with_retry, RetryConfig, ScratchSpace};

const OUTPUT_FILE: &str = "narration.mp3";
const MANIFEST_FILE: &str = "concat.txt";

/// Produces one narration file from a story script.
pub struct NarrationSynthesizer {
    speech: Arc<dyn SpeechSynthesizer>,
    toolkit: Arc<dyn MediaToolkit>,
    retry: RetryConfig,
    voice: String,
    max_chunk_chars: usize,
    chunk_delay: Duration,
}

impl NarrationSynthesizer {
    /// Creates a synthesizer using the narration settings.
    #[must_use]
    pub fn new(
        speech: Arc<dyn SpeechSynthesizer>,
        toolkit: Arc<dyn MediaToolkit>,
        config: &NarrationConfig,
    ) -> Self {
        Self {
            speech,
            toolkit,
            retry: RetryConfig::default(),
            voice: config.effective_voice(),
            max_chunk_chars: config.max_chunk_chars,
            chunk_delay: config.chunk_delay(),
        }
    }

    /// Sets the retry policy for each chunk.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the pause between chunk submissions.
    #[must_use]
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    /// The voice sent with every request.
    #[must_use]
    pub fn voice(&self) -> &str {
        &self.voice
    }

    /// Synthesizes `script` into a file inside `scratch` and returns its path.
    ///
    /// A single chunk is renamed into place; several are stream-copied
    /// together in order. Intermediate files are removed either way.
    pub async fn synthesize(&self, story: &str, script: &str, scratch: &ScratchSpace) -> Result<PathBuf> {
        let text = clean_story_text(script);
        let chunks = chunk_text(&text, self.max_chunk_chars);
        if chunks.is_empty() {
            return Err(StoryflowError::invalid_input(format!(
                "story '{story}' has no text to narrate"
            )));
        }

        let total = chunks.len();
        info!(story, chunks = total, chars = text.chars().count(), "Synthesizing narration");

        let mut chunk_files = Vec::with_capacity(total);
        for (index, chunk) in chunks.iter().enumerate() {
            if index > 0 && !self.chunk_delay.is_zero() {
                tokio::time::sleep(self.chunk_delay).await;
            }

            debug!(story, chunk = index + 1, total, chars = chunk.chars().count(), "Submitting chunk");
            let key = format!("{story} chunk {}/{total}", index + 1);
            let audio = with_retry(&self.retry, &key, || self.speech.synthesize(chunk, &self.voice)).await?;
            if audio.is_empty() {
                return Err(ServiceError::invalid_response("speech", format!("empty audio for {key}")).into());
            }

            let path = scratch.path(&format!("chunk_{index:03}.mp3"));
            tokio::fs::write(&path, &audio).await?;
            chunk_files.push(path);
        }

        let output = scratch.path(OUTPUT_FILE);
        if let [single] = chunk_files.as_slice() {
            tokio::fs::rename(single, &output).await?;
        } else {
            let manifest = scratch.path(MANIFEST_FILE);
            self.toolkit.concat(&chunk_files, &manifest, &output).await?;
            for file in chunk_files.iter().chain(std::iter::once(&manifest)) {
                if let Err(e) = tokio::fs::remove_file(file).await {
                    debug!(path = %file.display(), error = %e, "Could not remove intermediate file");
                }
            }
        }

        Ok(output)
    }
}

impl std::fmt::Debug for NarrationSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NarrationSynthesizer")
            .field("voice", &self.voice)
            .field("max_chunk_chars", &self.max_chunk_chars)
            .field("chunk_delay", &self.chunk_delay)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}
